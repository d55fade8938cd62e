use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, instrument, warn};

use super::password::{hash_password, verify_password};
use super::{CredentialError, CredentialStore};

/// Append-only `username,hash` records. Writers hold the lock across the duplicate check
/// and the append, so two registrations for one name cannot both succeed; readers hold it
/// shared so they never see a record that is only partly written.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileCredentialStore {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, CredentialError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| io_error(path, source))?;
        info!("file user store ready");
        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    fn lookup(&self, username: &str) -> Result<Option<String>, CredentialError> {
        let _guard = self.lock.read().map_err(|_| CredentialError::Poisoned)?;
        self.lookup_locked(username)
    }

    /// First record for `username` wins if the file was edited by hand. Caller holds `lock`.
    fn lookup_locked(&self, username: &str) -> Result<Option<String>, CredentialError> {
        let file = File::open(&self.path).map_err(|source| io_error(&self.path, source))?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| io_error(&self.path, source))?;
            if line.trim().is_empty() {
                continue;
            }
            let Some((name, hash)) = line.split_once(',') else {
                warn!(path = %self.path.display(), line = index + 1, "skipping malformed user record");
                continue;
            };
            if name == username {
                return Ok(Some(hash.to_string()));
            }
        }
        Ok(None)
    }
}

impl CredentialStore for FileCredentialStore {
    fn exists(&self, username: &str) -> Result<bool, CredentialError> {
        Ok(self.lookup(username)?.is_some())
    }

    #[instrument(skip(self, password), fields(username = %username))]
    fn create(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        if username.contains([',', '\n', '\r']) {
            return Err(CredentialError::InvalidUsername);
        }
        let hash = hash_password(password)?;

        let _guard = self.lock.write().map_err(|_| CredentialError::Poisoned)?;
        if self.lookup_locked(username)?.is_some() {
            return Err(CredentialError::AlreadyExists);
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| io_error(&self.path, source))?;
        let record = format!("{username},{hash}\n");
        file.write_all(record.as_bytes())
            .map_err(|source| io_error(&self.path, source))?;
        file.sync_data()
            .map_err(|source| io_error(&self.path, source))?;
        debug!("user created");
        Ok(())
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        Ok(self
            .lookup(username)?
            .is_some_and(|hash| verify_password(password, &hash)))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CredentialError {
    CredentialError::Io {
        path: path.display().to_string(),
        source,
    }
}
