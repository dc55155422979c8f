use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Error;

/// API key and on-premise URL, one small file each.
pub struct KeyStore {
    dir: PathBuf,
    key_file_name: String,
    url_file_name: String,
}

impl KeyStore {
    /// `~/<key_dir_name>` on Unix, `%APPDATA%\<key_dir_name>` on Windows.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let base = if cfg!(windows) {
            dirs::config_dir()
        } else {
            dirs::home_dir()
        }
        .ok_or_else(|| Error::KeyStore("Could not find home directory".to_string()))?;

        Ok(Self::in_dir(base.join(&config.key_dir_name), config))
    }

    pub fn in_dir(dir: PathBuf, config: &AppConfig) -> Self {
        Self {
            dir,
            key_file_name: config.key_file_name.clone(),
            url_file_name: config.url_file_name.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get_api_key(&self) -> Result<Option<String>, Error> {
        self.get(&self.key_file_name)
    }

    pub fn store_api_key(&self, key: &str) -> Result<(), Error> {
        self.store(&self.key_file_name, key)
    }

    pub fn get_default_url(&self) -> Result<Option<String>, Error> {
        self.get(&self.url_file_name)
    }

    pub fn store_default_url(&self, url: &str) -> Result<(), Error> {
        self.store(&self.url_file_name, url)
    }

    pub fn delete_default_url(&self) -> Result<(), Error> {
        self.delete(&self.url_file_name)
    }

    fn get(&self, file_name: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.dir.join(file_name)) {
            Ok(value) => {
                let value = value.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::KeyStore(format!("Failed reading {}: {}", file_name, e))),
        }
    }

    fn store(&self, file_name: &str, value: &str) -> Result<(), Error> {
        let path = self.dir.join(file_name);
        if path.exists() {
            self.delete(file_name)?;
            info!("Old {} deleted", file_name);
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::KeyStore(format!("Failed creating {}: {}", self.dir.display(), e)))?;
        fs::write(&path, value)
            .map_err(|e| Error::KeyStore(format!("Failed writing {}: {}", file_name, e)))?;
        info!("{} stored", file_name);
        Ok(())
    }

    fn delete(&self, file_name: &str) -> Result<(), Error> {
        match fs::remove_file(self.dir.join(file_name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::KeyStore(format!("Failed deleting {}: {}", file_name, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(tmp: &tempfile::TempDir) -> KeyStore {
        KeyStore::in_dir(tmp.path().join(".intezer"), &AppConfig::default())
    }

    #[test]
    fn test_missing_key_reads_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        assert_eq!(store.get_api_key().unwrap(), None);
        assert_eq!(store.get_default_url().unwrap(), None);
    }

    #[test]
    fn test_store_creates_dir_and_replaces_value() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store.store_api_key("first").unwrap();
        store.store_api_key("second").unwrap();
        assert_eq!(store.get_api_key().unwrap().as_deref(), Some("second"));
        assert!(store.dir().join("key").is_file());
    }

    #[test]
    fn test_delete_default_url_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store.store_default_url("http://onprem/api/").unwrap();
        store.delete_default_url().unwrap();
        store.delete_default_url().unwrap();
        assert_eq!(store.get_default_url().unwrap(), None);
    }
}
