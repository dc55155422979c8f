use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use intezer_analyze_core::api::{CodeItemType, IndexAs};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "intezer-analyze")]
#[command(about = "Send files, hashes, offline scans and emails to Intezer Analyze", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Login to Intezer Analyze
    Login {
        /// API key for Intezer Analyze
        api_key: Uuid,
        /// Intezer Analyze URL, for on premise deployments
        api_url: Option<String>,
    },
    /// Send a file or a directory for analysis
    Analyze {
        path: PathBuf,
        /// Skip unpacking; only PE, ELF, DEX and APK files are sent
        #[arg(long)]
        no_unpacking: bool,
        /// Skip static extraction
        #[arg(long)]
        no_static_extraction: bool,
        #[arg(long, value_enum)]
        code_item_type: Option<CodeItemTypeArg>,
        /// Do not ask before sending a directory with many files
        #[arg(long)]
        ignore_directory_count_limit: bool,
        /// Wait for the analyses to finish
        #[arg(long)]
        wait: bool,
    },
    /// Send a text file with a list of hashes
    #[command(alias = "analyze_by_list")]
    AnalyzeByHashList { path: PathBuf },
    /// Index a file or a directory
    Index {
        path: PathBuf,
        #[arg(long, value_enum)]
        index_as: IndexAsArg,
        /// Required when indexing as malicious
        family_name: Option<String>,
        #[arg(long)]
        ignore_directory_count_limit: bool,
    },
    /// Send a text file with a list of hashes for indexing
    #[command(alias = "index_by_list")]
    IndexByHashList {
        path: PathBuf,
        #[arg(long, value_enum)]
        index_as: IndexAsArg,
        family_name: Option<String>,
    },
    /// Upload a directory with offline endpoint scan results
    #[command(alias = "upload_endpoint_scan")]
    UploadEndpointScan {
        offline_scan_directory: PathBuf,
        /// Upload the scan even if it was already uploaded
        #[arg(long)]
        force: bool,
    },
    /// Upload every offline endpoint scan directory under a root directory
    #[command(alias = "upload_endpoint_scans_in_directory")]
    UploadEndpointScansInDirectory {
        offline_scans_root_directory: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Send every email file in a directory for phishing analysis
    #[command(alias = "upload_emails_in_directory")]
    UploadEmailsInDirectory {
        emails_root_directory: PathBuf,
        #[arg(long)]
        ignore_directory_count_limit: bool,
    },
    /// Notify the alerts listed in a CSV file
    #[command(alias = "notify_alerts_from_csv")]
    NotifyAlertsFromCsv { csv_path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum CodeItemTypeArg {
    File,
    MemoryModule,
    FilelessCode,
}

impl From<CodeItemTypeArg> for CodeItemType {
    fn from(arg: CodeItemTypeArg) -> Self {
        match arg {
            CodeItemTypeArg::File => CodeItemType::File,
            CodeItemTypeArg::MemoryModule => CodeItemType::MemoryModule,
            CodeItemTypeArg::FilelessCode => CodeItemType::FilelessCode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexAsArg {
    Trusted,
    Malicious,
}

impl From<IndexAsArg> for IndexAs {
    fn from(arg: IndexAsArg) -> Self {
        match arg {
            IndexAsArg::Trusted => IndexAs::Trusted,
            IndexAsArg::Malicious => IndexAs::Malicious,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_accepts_simple_uuid() {
        let cli = Cli::try_parse_from([
            "intezer-analyze",
            "login",
            "edb45d954da54e8e980078001d8921cc",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Login { api_key, api_url }) => {
                assert_eq!(api_key.to_string(), "edb45d95-4da5-4e8e-9800-78001d8921cc");
                assert!(api_url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_login_rejects_non_uuid_key() {
        assert!(Cli::try_parse_from(["intezer-analyze", "login", "not-a-key"]).is_err());
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "intezer-analyze",
            "analyze",
            "/tmp/samples",
            "--no-unpacking",
            "--code-item-type",
            "memory_module",
            "--wait",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Analyze {
                no_unpacking,
                no_static_extraction,
                code_item_type,
                wait,
                ..
            }) => {
                assert!(no_unpacking);
                assert!(!no_static_extraction);
                assert_eq!(code_item_type, Some(CodeItemTypeArg::MemoryModule));
                assert!(wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_snake_case_aliases() {
        let cli = Cli::try_parse_from(["intezer-analyze", "analyze_by_list", "hashes.txt"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::AnalyzeByHashList { .. })));

        let cli = Cli::try_parse_from([
            "intezer-analyze",
            "index_by_list",
            "hashes.txt",
            "--index-as",
            "malicious",
            "Emotet",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::IndexByHashList {
                index_as,
                family_name,
                ..
            }) => {
                assert_eq!(index_as, IndexAsArg::Malicious);
                assert_eq!(family_name.as_deref(), Some("Emotet"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_index_requires_index_as() {
        assert!(Cli::try_parse_from(["intezer-analyze", "index", "sample.exe"]).is_err());
        assert!(Cli::try_parse_from([
            "intezer-analyze",
            "index",
            "sample.exe",
            "--index-as",
            "suspicious"
        ])
        .is_err());
    }
}
