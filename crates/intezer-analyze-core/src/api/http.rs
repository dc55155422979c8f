use std::cell::RefCell;
use std::path::Path;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use super::{
    AlertStatus, AnalysisOptions, AnalyzeApi, ApiError, IndexRequest, JobHandle, JobKind,
    JobStatus,
};
use crate::config::Session;
use crate::endpoint_scan::EndpointScan;

const USER_AGENT: &str = concat!("intezer-analyze-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct TokenResponse {
    result: String,
}

#[derive(Deserialize)]
struct ResultUrlResponse {
    result_url: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScanCreated {
    scan_id: String,
    analysis_id: String,
}

#[derive(Deserialize)]
struct ScanCreatedResponse {
    result: ScanCreated,
}

#[derive(Deserialize)]
struct AlertIngested {
    alert_id: String,
}

#[derive(Deserialize)]
struct NotifyResult {
    #[serde(default)]
    notified_channels: Vec<String>,
}

#[derive(Deserialize)]
struct NotifyResponse {
    result: NotifyResult,
}

/// Blocking HTTP client for the `{api_url}{api_version}` REST endpoints.
pub struct HttpApi {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: RefCell<Option<String>>,
}

impl HttpApi {
    pub fn new(session: &Session) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: format!(
                "{}{}",
                session.api_url,
                session.config.api_version.trim_matches('/')
            ),
            api_key: session.api_key.clone(),
            access_token: RefCell::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.access_token.borrow().as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .client
            .post(self.url("get-access-token"))
            .json(&json!({ "api_key": self.api_key }))
            .send()?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST
        ) {
            return Err(ApiError::InvalidApiKey);
        }
        let token = check(response)?.json::<TokenResponse>()?.result;
        debug!("Obtained access token");
        *self.access_token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.token()?;
        Ok(request.bearer_auth(token).send()?)
    }

    fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<Response, ApiError> {
        trace!("POST {}", path);
        self.send(self.client.post(self.url(path)).multipart(form))
    }
}

fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::InvalidApiKey),
        StatusCode::FORBIDDEN => Err(ApiError::InsufficientQuota),
        _ => {
            let message = response.text().unwrap_or_default();
            Err(ApiError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn file_form(path: &Path) -> Result<multipart::Form, ApiError> {
    multipart::Form::new()
        .file("file", path)
        .map_err(|source| ApiError::File {
            path: path.display().to_string(),
            source,
        })
}

/// Job ids are the last segment of the `result_url` the service returns.
fn id_from_result_url(result_url: &str) -> Result<String, ApiError> {
    result_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::UnexpectedResponse(format!("result_url: {}", result_url)))
}

/// 409 on analysis creation carries the existing analysis.
fn analysis_handle(response: Response) -> Result<JobHandle, ApiError> {
    let response = if response.status() == StatusCode::CONFLICT {
        debug!("Analysis already exists, reusing it");
        response
    } else {
        check(response)?
    };
    let body: ResultUrlResponse = response.json()?;
    Ok(JobHandle::new(
        JobKind::Analysis,
        id_from_result_url(&body.result_url)?,
    ))
}

fn index_handle(response: Response) -> Result<JobHandle, ApiError> {
    let body: ResultUrlResponse = check(response)?.json()?;
    Ok(JobHandle::new(
        JobKind::Index,
        id_from_result_url(&body.result_url)?,
    ))
}

fn status_from(response: Response) -> Result<JobStatus, ApiError> {
    if response.status() == StatusCode::ACCEPTED {
        return Ok(JobStatus::InProgress);
    }
    let body: StatusResponse = check(response)?.json()?;
    Ok(match body.status.as_str() {
        "succeeded" | "finished" => JobStatus::Succeeded,
        "failed" => JobStatus::Failed(body.error.unwrap_or_else(|| "unknown error".to_string())),
        _ => JobStatus::InProgress,
    })
}

impl AnalyzeApi for HttpApi {
    fn authenticate(&self) -> Result<(), ApiError> {
        self.token().map(|_| ())
    }

    fn analyze_file(&self, path: &Path, options: &AnalysisOptions) -> Result<JobHandle, ApiError> {
        let mut form = file_form(path)?
            .text(
                "disable_dynamic_unpacking",
                options.disable_dynamic_unpacking.to_string(),
            )
            .text(
                "disable_static_unpacking",
                options.disable_static_unpacking.to_string(),
            );
        if let Some(code_item_type) = options.code_item_type {
            form = form.text("code_item_type", code_item_type.as_str());
        }
        analysis_handle(self.post_multipart("analyze", form)?)
    }

    fn analyze_hash(&self, hash: &str) -> Result<JobHandle, ApiError> {
        let response = self.send(
            self.client
                .post(self.url("analyze-by-hash"))
                .json(&json!({ "hash": hash })),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::HashNotFound(hash.to_string()));
        }
        analysis_handle(response)
    }

    fn index_file(&self, path: &Path, request: &IndexRequest) -> Result<JobHandle, ApiError> {
        let mut form = file_form(path)?.text("index_as", request.index_as.as_str());
        if let Some(family_name) = &request.family_name {
            form = form.text("family_name", family_name.clone());
        }
        index_handle(self.post_multipart("files/index", form)?)
    }

    fn index_hash(&self, sha256: &str, request: &IndexRequest) -> Result<JobHandle, ApiError> {
        let mut body = json!({ "index_as": request.index_as.as_str() });
        if let Some(family_name) = &request.family_name {
            body["family_name"] = json!(family_name);
        }
        let response = self.send(
            self.client
                .post(self.url(&format!("files/{}/index", sha256)))
                .json(&body),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::HashNotFound(sha256.to_string()));
        }
        index_handle(response)
    }

    fn submit_endpoint_scan(&self, scan: &EndpointScan) -> Result<JobHandle, ApiError> {
        let response = self.send(
            self.client
                .post(self.url("scans/offline-endpoint"))
                .json(&scan.scan_info),
        )?;
        let created: ScanCreatedResponse = check(response)?.json()?;
        let scan_id = created.result.scan_id;
        debug!(
            "Created endpoint scan {} (analysis {})",
            scan_id, created.result.analysis_id
        );

        for metadata in &scan.metadata_files {
            let stem = metadata
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let kind = stem.trim_end_matches("_info");
            check(self.post_multipart(
                &format!("scans/{}/metadata/{}", scan_id, kind),
                file_form(metadata)?,
            )?)?;
        }

        for artifact in &scan.artifacts {
            check(self.post_multipart(
                &format!(
                    "scans/{}/artifacts/{}",
                    scan_id,
                    artifact.category.dir_name()
                ),
                file_form(&artifact.path)?,
            )?)?;
        }

        check(self.send(self.client.post(self.url(&format!("scans/{}/end", scan_id))))?)?;

        Ok(JobHandle::new(
            JobKind::EndpointScan,
            created.result.analysis_id,
        ))
    }

    fn submit_phishing_email(&self, path: &Path) -> Result<JobHandle, ApiError> {
        let form = file_form(path)?.text("alert_source", "phishing_emails");
        let body: AlertIngested = check(self.post_multipart("alerts/ingest/binary", form)?)?.json()?;
        Ok(JobHandle::new(JobKind::Alert, body.alert_id))
    }

    fn get_alert_status(&self, alert_id: &str) -> Result<AlertStatus, ApiError> {
        let response = self.send(
            self.client
                .get(self.url("alerts/get-by-id"))
                .query(&[("alert_id", alert_id)]),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::AlertNotFound(alert_id.to_string()));
        }
        let body: StatusResponse = check(response)?.json()?;
        Ok(match body.status.as_str() {
            "in_progress" | "queued" => AlertStatus::InProgress,
            _ => AlertStatus::Complete,
        })
    }

    fn notify_alert(&self, alert_id: &str) -> Result<usize, ApiError> {
        let response = self.send(
            self.client
                .post(self.url(&format!("alerts/{}/notify", alert_id))),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::AlertNotFound(alert_id.to_string()));
        }
        let body: NotifyResponse = check(response)?.json()?;
        Ok(body.result.notified_channels.len())
    }

    fn get_job_status(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        match handle.kind {
            JobKind::Analysis | JobKind::EndpointScan => {
                status_from(self.send(self.client.get(self.url(&format!("analyses/{}", handle.id))))?)
            }
            JobKind::Index => {
                status_from(self.send(self.client.get(self.url(&format!("files/index/{}", handle.id))))?)
            }
            JobKind::Alert => Ok(match self.get_alert_status(&handle.id)? {
                AlertStatus::InProgress => JobStatus::InProgress,
                AlertStatus::Complete => JobStatus::Succeeded,
            }),
        }
    }
}
