use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Error;
use crate::platform;

pub const SCAN_INFO_FILE: &str = "scan_info.json";
const METADATA_SUFFIX: &str = "_info.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCategory {
    Files,
    MemoryModules,
    Fileless,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 3] = [
        ArtifactCategory::Files,
        ArtifactCategory::MemoryModules,
        ArtifactCategory::Fileless,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactCategory::Files => "files",
            ArtifactCategory::MemoryModules => "memory_modules",
            ArtifactCategory::Fileless => "fileless",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanArtifact {
    pub category: ArtifactCategory,
    pub path: PathBuf,
}

/// An offline endpoint scan as collected on disk.
#[derive(Debug, Clone)]
pub struct EndpointScan {
    pub dir: PathBuf,
    pub scan_info: serde_json::Value,
    pub metadata_files: Vec<PathBuf>,
    pub artifacts: Vec<ScanArtifact>,
}

pub fn is_endpoint_scan_dir(dir: &Path) -> bool {
    dir.join(SCAN_INFO_FILE).is_file()
}

impl EndpointScan {
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let scan_info_path = dir.join(SCAN_INFO_FILE);
        if !scan_info_path.is_file() {
            return Err(Error::NotAnEndpointScan {
                dir: dir.to_path_buf(),
                missing: SCAN_INFO_FILE,
            });
        }

        let raw = fs::read_to_string(&scan_info_path)?;
        let scan_info: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            Error::Other(format!("Invalid {}: {}", scan_info_path.display(), e))
        })?;

        let mut metadata_files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_metadata = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .map(|n| n.ends_with(METADATA_SUFFIX) && n != SCAN_INFO_FILE)
                .unwrap_or(false);
            if is_metadata && path.is_file() {
                metadata_files.push(path);
            }
        }
        metadata_files.sort();

        let mut artifacts = Vec::new();
        for category in ArtifactCategory::ALL {
            let category_dir = dir.join(category.dir_name());
            if !category_dir.is_dir() {
                continue;
            }
            let walker = WalkDir::new(&category_dir)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !platform::is_hidden(e.path()));
            for entry in walker {
                let entry = entry.map_err(|e| Error::Other(e.to_string()))?;
                if entry.file_type().is_file() {
                    artifacts.push(ScanArtifact {
                        category,
                        path: entry.into_path(),
                    });
                }
            }
        }

        debug!(
            "Loaded endpoint scan {}: {} metadata files, {} artifacts",
            dir.display(),
            metadata_files.len(),
            artifacts.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            scan_info,
            metadata_files,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_collects_metadata_and_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join(SCAN_INFO_FILE), r#"{"computer_name": "host-1"}"#).unwrap();
        fs::write(dir.join("processes_info.json"), "[]").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        fs::create_dir_all(dir.join("files")).unwrap();
        fs::write(dir.join("files").join("a.exe"), b"MZ").unwrap();
        fs::write(dir.join("files").join(".hidden"), b"MZ").unwrap();
        fs::create_dir_all(dir.join("fileless")).unwrap();
        fs::write(dir.join("fileless").join("script.ps1"), b"Write-Host").unwrap();

        let scan = EndpointScan::load(dir).unwrap();
        assert_eq!(scan.scan_info["computer_name"], "host-1");
        assert_eq!(scan.metadata_files, vec![dir.join("processes_info.json")]);
        assert_eq!(scan.artifacts.len(), 2);
        assert_eq!(scan.artifacts[0].category, ArtifactCategory::Files);
        assert_eq!(scan.artifacts[1].category, ArtifactCategory::Fileless);
    }

    #[test]
    fn test_load_requires_scan_info() {
        let tmp = tempfile::tempdir().unwrap();
        let err = EndpointScan::load(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::NotAnEndpointScan { .. }));
        assert!(!is_endpoint_scan_dir(tmp.path()));
    }
}
