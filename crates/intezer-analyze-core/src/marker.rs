//! Sidecar record that remembers which analysis an offline scan directory became.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::Error;

pub struct ScanMarker {
    path: PathBuf,
}

impl ScanMarker {
    pub fn new(scan_dir: &Path, file_name: &str) -> Self {
        Self {
            path: scan_dir.join(file_name),
        }
    }

    /// The stored analysis id, if the scan was uploaded before.
    pub fn read(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let analysis_id = content.trim();
                if analysis_id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(analysis_id.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.failure(e)),
        }
    }

    pub fn write(&self, analysis_id: &str) -> Result<(), Error> {
        fs::write(&self.path, analysis_id).map_err(|e| self.failure(e))?;
        info!("Stored analysis id {} in {}", analysis_id, self.path.display());
        Ok(())
    }

    /// Fails with [`Error::AlreadyUploaded`] unless forced or never uploaded.
    pub fn ensure_not_uploaded(&self, scan_dir: &Path, force: bool) -> Result<(), Error> {
        if force {
            return Ok(());
        }
        match self.read()? {
            Some(analysis_id) => Err(Error::AlreadyUploaded {
                dir: scan_dir.to_path_buf(),
                analysis_id,
            }),
            None => Ok(()),
        }
    }

    fn failure(&self, source: io::Error) -> Error {
        error!("Marker file {} failed: {}", self.path.display(), source);
        Error::Marker {
            path: self.path.clone(),
            source,
        }
    }
}
