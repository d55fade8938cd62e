use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info, instrument};

use super::password::{hash_password, verify_password};
use super::{CredentialError, CredentialStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL
)";

#[derive(Debug)]
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, CredentialError> {
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!("sqlite user store ready");
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CredentialError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CredentialError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn password_hash(&self, username: &str) -> Result<Option<String>, CredentialError> {
        let conn = self.conn.lock().map_err(|_| CredentialError::Poisoned)?;
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn exists(&self, username: &str) -> Result<bool, CredentialError> {
        Ok(self.password_hash(username)?.is_some())
    }

    #[instrument(skip(self, password), fields(username = %username))]
    fn create(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        // Hash before taking the lock so slow hashing does not block readers.
        let hash = hash_password(password)?;
        let conn = self.conn.lock().map_err(|_| CredentialError::Poisoned)?;
        match conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, hash],
        ) {
            Ok(_) => {
                debug!("user created");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(CredentialError::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        Ok(self
            .password_hash(username)?
            .is_some_and(|hash| verify_password(password, &hash)))
    }
}
