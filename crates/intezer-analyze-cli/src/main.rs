mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use intezer_analyze_core::api::{AnalysisOptions, IndexRequest};
use intezer_analyze_core::config::{self, normalize_api_url};
use intezer_analyze_core::ops::{alerts, analyze, emails, endpoint_scans, index, login};
use intezer_analyze_core::{
    ApiError, AppConfig, Confirm, Error, HttpApi, KeyStore, OpContext, Session, SummaryLine,
};
use progress::CliReporter;
use tracing::{error, info};

const SUPPORT: &str = "please contact us at support@intezer.com";

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let config = config::load_configuration().context("Error loading configuration")?;
    let (guard, log_file_path) = logging::init_logger(&config.log_file_name);

    if let Err(err) = run(command, config) {
        let code = report_error(&err, &log_file_path);
        drop(guard);
        process::exit(code);
    }

    Ok(())
}

fn run(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Login { api_key, api_url } => {
            let key_store = KeyStore::from_config(&config)?;
            let stored_url = api_url.as_deref().map(normalize_api_url);
            let session = Session::new(config, api_key.to_string(), stored_url);
            let api = HttpApi::new(&session).map_err(Error::from)?;
            login::login(&session, &api, &key_store)?;
            println!("{}", "You have successfully logged in".green());
        }
        Commands::Analyze {
            path,
            no_unpacking,
            no_static_extraction,
            code_item_type,
            ignore_directory_count_limit,
            wait,
        } => {
            ensure_exists(&path)?;
            let options = AnalysisOptions {
                disable_dynamic_unpacking: no_unpacking,
                disable_static_unpacking: no_static_extraction,
                code_item_type: code_item_type.map(Into::into),
            };
            with_context(config, |ctx| {
                if path.is_file() {
                    let outcome = analyze::analyze_file(ctx, &path, options, wait)?;
                    print_lines(&[analyze::describe_analysis(&outcome, ctx.session)]);
                } else {
                    let report = analyze::analyze_directory(
                        ctx,
                        &path,
                        options,
                        ignore_directory_count_limit,
                        wait,
                    )?;
                    print_lines(&report.lines());
                }
                Ok(())
            })?;
        }
        Commands::AnalyzeByHashList { path } => {
            ensure_exists(&path)?;
            with_context(config, |ctx| {
                let report = analyze::analyze_hash_list(ctx, &path, false)?;
                print_lines(&report.lines());
                Ok(())
            })?;
        }
        Commands::Index {
            path,
            index_as,
            family_name,
            ignore_directory_count_limit,
        } => {
            ensure_exists(&path)?;
            let request = IndexRequest::new(index_as.into(), family_name).map_err(Error::Other)?;
            with_context(config, |ctx| {
                if path.is_file() {
                    let outcome = index::index_file(ctx, &path, request)?;
                    print_lines(&[index::describe_index(&outcome)]);
                } else {
                    let report =
                        index::index_directory(ctx, &path, request, ignore_directory_count_limit)?;
                    print_lines(&report.lines());
                }
                Ok(())
            })?;
        }
        Commands::IndexByHashList {
            path,
            index_as,
            family_name,
        } => {
            ensure_exists(&path)?;
            let request = IndexRequest::new(index_as.into(), family_name).map_err(Error::Other)?;
            with_context(config, |ctx| {
                let report = index::index_hash_list(ctx, &path, request)?;
                print_lines(&report.lines());
                Ok(())
            })?;
        }
        Commands::UploadEndpointScan {
            offline_scan_directory,
            force,
        } => {
            ensure_exists(&offline_scan_directory)?;
            with_context(config, |ctx| {
                let handle =
                    endpoint_scans::upload_endpoint_scan(ctx, &offline_scan_directory, force)?;
                print_lines(&[endpoint_scans::describe_endpoint_scan(&handle, ctx.session)]);
                Ok(())
            })?;
        }
        Commands::UploadEndpointScansInDirectory {
            offline_scans_root_directory,
            force,
        } => {
            ensure_exists(&offline_scans_root_directory)?;
            with_context(config, |ctx| {
                let report = endpoint_scans::upload_endpoint_scans_in_directory(
                    ctx,
                    &offline_scans_root_directory,
                    force,
                )?;
                print_lines(&report.lines());
                Ok(())
            })?;
        }
        Commands::UploadEmailsInDirectory {
            emails_root_directory,
            ignore_directory_count_limit,
        } => {
            ensure_exists(&emails_root_directory)?;
            with_context(config, |ctx| {
                let report = emails::upload_emails_in_directory(
                    ctx,
                    &emails_root_directory,
                    ignore_directory_count_limit,
                )?;
                print_lines(&report.lines());
                Ok(())
            })?;
        }
        Commands::NotifyAlertsFromCsv { csv_path } => {
            ensure_exists(&csv_path)?;
            with_context(config, |ctx| {
                let report = alerts::notify_alerts_from_csv(ctx, &csv_path)?;
                print_lines(&report.lines());
                Ok(())
            })?;
        }
    }

    Ok(())
}

/// Read the stored login, then run `f` with a live API client.
fn with_context<F>(config: AppConfig, f: F) -> Result<(), Error>
where
    F: FnOnce(&OpContext<'_>) -> Result<(), Error>,
{
    let key_store = KeyStore::from_config(&config)?;
    let session = login::load_session(config, &key_store)?;
    let api = HttpApi::new(&session)?;
    let reporter = CliReporter::new();
    let confirm = TerminalConfirm;

    info!("Using {}", session.api_url);
    let ctx = OpContext {
        session: &session,
        api: &api,
        confirm: &confirm,
        reporter: &reporter,
    };
    f(&ctx)
}

fn ensure_exists(path: &Path) -> Result<(), Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::Other(format!("Path {} does not exist", path.display())))
    }
}

fn print_lines(lines: &[SummaryLine]) {
    println!();
    for line in lines {
        match line {
            SummaryLine::Success(text) => println!("{}", text.green()),
            SummaryLine::Failure(text) => println!("{}", text.red()),
            SummaryLine::Unsupported(text) => println!("{}", text.yellow()),
            SummaryLine::Error(text) => println!("  {}", text.dimmed()),
        }
    }
}

/// Print the user-facing message for `err` and pick the exit code.
///
/// Every message ends with the log file location.
fn report_error(err: &anyhow::Error, log_file_path: &Path) -> i32 {
    eprintln!("{}", error_message(err, log_file_path).red());
    1
}

fn error_message(err: &anyhow::Error, log_file_path: &Path) -> String {
    let log_file = log_file_path.display();
    match err.downcast_ref::<Error>() {
        Some(Error::Aborted) => format!("Aborted! See the log file in {}", log_file),
        Some(e) if e.is_quota_exhausted() => {
            format!("Insufficient quota, {}. See the log file in {}", SUPPORT, log_file)
        }
        Some(Error::Api(ApiError::InvalidApiKey)) => format!(
            "Invalid API key error, {} and attach the log file in {}",
            SUPPORT, log_file
        ),
        Some(Error::MarkerNotWritten {
            path, analysis_id, ..
        }) => format!(
            "Endpoint scan uploaded as analysis {} but {} could not be written; \
             a later upload will not know about it. See the log file in {}",
            analysis_id,
            path.display(),
            log_file
        ),
        Some(Error::Marker { path, source }) => format!(
            "Could not access {}: {}. See the log file in {}",
            path.display(),
            source,
            log_file
        ),
        Some(
            e @ (Error::NotLoggedIn
            | Error::AlreadyUploaded { .. }
            | Error::NotAnEndpointScan { .. }
            | Error::Unreadable { .. }
            | Error::Other(_)),
        ) => format!("{}. See the log file in {}", e, log_file),
        _ => {
            error!("Unexpected error occurred: {:#}", err);
            format!(
                "Unexpected error occurred, {} and attach the log file in {}",
                SUPPORT, log_file
            )
        }
    }
}

struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        prompt_confirm(prompt, Some(false))
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} [Y/n]: ", prompt),
            Some(false) | None => print!("{} [y/N]: ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
