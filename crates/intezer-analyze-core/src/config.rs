use config::{Config, ConfigError, Environment, File as ConfigFile};
use glob::Pattern;
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

pub const DEFAULT_API_URL: &str = "https://analyze.intezer.com/api/";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_url: String,
    pub api_version: String,
    pub analyses_url: String,
    pub index_results_url: String,
    pub alerts_url: String,
    /// Files in a single directory level above which the user must confirm.
    pub unusual_amount_in_dir: usize,
    pub key_dir_name: String,
    pub key_file_name: String,
    pub url_file_name: String,
    pub marker_file_name: String,
    pub poll_interval_secs: u64,
    pub ignore_patterns: Vec<String>,
    pub log_file_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_version: "v2-0".to_string(),
            analyses_url: "https://analyze.intezer.com/analyses".to_string(),
            index_results_url: "https://analyze.intezer.com/private-indexed-files".to_string(),
            alerts_url: "https://analyze.intezer.com/alerts".to_string(),
            unusual_amount_in_dir: 1000,
            key_dir_name: ".intezer".to_string(),
            key_file_name: "key".to_string(),
            url_file_name: "url".to_string(),
            marker_file_name: "analysis_id.txt".to_string(),
            poll_interval_secs: 2,
            ignore_patterns: Vec::new(),
            log_file_name: "intezer-analyze-cli.log".to_string(),
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Compiled ignore globs. Invalid patterns are logged and skipped.
    pub fn ignore_globs(&self) -> Vec<Pattern> {
        self.ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect()
    }
}

/// Defaults, then `Config.toml` in the working directory, then `INTEZER_*` variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("api_url", defaults.api_url)?
        .set_default("api_version", defaults.api_version)?
        .set_default("analyses_url", defaults.analyses_url)?
        .set_default("index_results_url", defaults.index_results_url)?
        .set_default("alerts_url", defaults.alerts_url)?
        .set_default("unusual_amount_in_dir", defaults.unusual_amount_in_dir as u64)?
        .set_default("key_dir_name", defaults.key_dir_name)?
        .set_default("key_file_name", defaults.key_file_name)?
        .set_default("url_file_name", defaults.url_file_name)?
        .set_default("marker_file_name", defaults.marker_file_name)?
        .set_default("poll_interval_secs", defaults.poll_interval_secs)?
        .set_default("ignore_patterns", Vec::<String>::new())?
        .set_default("log_file_name", defaults.log_file_name)?
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("INTEZER")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Everything an operation needs to talk to the service. Built once at startup.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: AppConfig,
    pub api_key: String,
    pub api_url: String,
    /// False for on-premise deployments, which have no public result pages.
    pub is_cloud: bool,
}

impl Session {
    pub fn new(config: AppConfig, api_key: String, stored_url: Option<String>) -> Self {
        match stored_url {
            Some(api_url) => Self {
                config,
                api_key,
                api_url,
                is_cloud: false,
            },
            None => {
                let api_url = config.api_url.clone();
                Self {
                    config,
                    api_key,
                    api_url,
                    is_cloud: true,
                }
            }
        }
    }

    pub fn analysis_url(&self, analysis_id: &str) -> String {
        format!("{}/{}", self.config.analyses_url, analysis_id)
    }

    /// Where to look for results: the given page in the cloud, the history page on premise.
    pub fn results_location(&self, url: &str) -> String {
        if self.is_cloud {
            format!("go to: {}", url)
        } else {
            "go to Intezer Analyze history page".to_string()
        }
    }
}

/// Append `/api/` to an on-premise URL unless already present.
pub fn normalize_api_url(url: &str) -> String {
    let mut url = url.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    if !url.ends_with("/api/") {
        url.push_str("api/");
    }
    url
}
