//! Username → password-hash persistence.
//!
//! Two interchangeable backends implement [`CredentialStore`]:
//!
//! - [`SqliteCredentialStore`]: `users(username PRIMARY KEY, password_hash)` table. Preferred;
//!   the primary key makes duplicate registration impossible even under concurrent inserts.
//! - [`FileCredentialStore`]: append-only text file with one `username,hash` record per line.
//!
//! Passwords are hashed with Argon2id (random salt per hash, PHC string format). Neither the
//! password nor its hash is ever logged.

mod file;
mod password;
mod sqlite;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub use file::FileCredentialStore;
pub use sqlite::SqliteCredentialStore;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username already exists")]
    AlreadyExists,
    #[error("username contains characters the store cannot record")]
    InvalidUsername,
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("credential store lock poisoned")]
    Poisoned,
}

impl CredentialError {
    /// Storage failures are the only class that must surface as a hard error.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CredentialError::Database(_) | CredentialError::Io { .. } | CredentialError::Poisoned
        )
    }
}

pub trait CredentialStore: Send + Sync + fmt::Debug {
    fn exists(&self, username: &str) -> Result<bool, CredentialError>;

    /// Hash `password` and persist it for `username`. Fails with
    /// [`CredentialError::AlreadyExists`] if the username is taken.
    fn create(&self, username: &str, password: &str) -> Result<(), CredentialError>;

    /// `false` for unknown users and wrong passwords alike.
    fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            "file" | "csv" => Ok(StoreBackend::File),
            other => Err(format!("unknown user store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Sqlite => f.write_str("sqlite"),
            StoreBackend::File => f.write_str("file"),
        }
    }
}

pub fn open_store(
    backend: StoreBackend,
    path: &Path,
) -> Result<Box<dyn CredentialStore>, CredentialError> {
    match backend {
        StoreBackend::Sqlite => Ok(Box::new(SqliteCredentialStore::open(path)?)),
        StoreBackend::File => Ok(Box::new(FileCredentialStore::open(path)?)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{open_store, CredentialError, CredentialStore, StoreBackend};

    fn backends() -> Result<Vec<(tempfile::TempDir, Box<dyn CredentialStore>)>> {
        let mut out = Vec::new();
        for (backend, name) in [(StoreBackend::Sqlite, "users.db"), (StoreBackend::File, "users.txt")] {
            let dir = tempdir()?;
            let store = open_store(backend, &dir.path().join(name))?;
            out.push((dir, store));
        }
        Ok(out)
    }

    #[test]
    fn created_user_verifies_with_correct_password_only() -> Result<()> {
        for (_dir, store) in backends()? {
            assert!(!store.exists("alice")?);
            store.create("alice", "s3cret")?;
            assert!(store.exists("alice")?);
            assert!(store.verify("alice", "s3cret")?);
            assert!(!store.verify("alice", "wrong")?);
        }
        Ok(())
    }

    #[test]
    fn duplicate_create_fails_and_keeps_first_password() -> Result<()> {
        for (_dir, store) in backends()? {
            store.create("alice", "first")?;
            let second = store.create("alice", "second");
            assert!(matches!(second, Err(CredentialError::AlreadyExists)));
            assert!(store.verify("alice", "first")?);
            assert!(!store.verify("alice", "second")?);
        }
        Ok(())
    }

    #[test]
    fn unknown_user_does_not_verify() -> Result<()> {
        for (_dir, store) in backends()? {
            assert!(!store.verify("nobody", "anything")?);
        }
        Ok(())
    }

    #[test]
    fn usernames_are_case_sensitive() -> Result<()> {
        for (_dir, store) in backends()? {
            store.create("Alice", "pw")?;
            assert!(!store.exists("alice")?);
            assert!(!store.verify("alice", "pw")?);
            store.create("alice", "other")?;
            assert!(store.verify("alice", "other")?);
        }
        Ok(())
    }

    #[test]
    fn concurrent_creates_register_exactly_once() -> Result<()> {
        for (_dir, store) in backends()? {
            let store: Arc<dyn CredentialStore> = Arc::from(store);
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || store.create("racer", &format!("pw{i}")))
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let created = results.iter().filter(|r| r.is_ok()).count();
            let duplicates = results
                .iter()
                .filter(|r| matches!(r, Err(CredentialError::AlreadyExists)))
                .count();
            assert_eq!(created, 1);
            assert_eq!(duplicates, 7);
        }
        Ok(())
    }

    #[test]
    fn backend_parses_from_config_strings() {
        assert_eq!("sqlite".parse::<StoreBackend>().ok(), Some(StoreBackend::Sqlite));
        assert_eq!(" FILE ".parse::<StoreBackend>().ok(), Some(StoreBackend::File));
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
