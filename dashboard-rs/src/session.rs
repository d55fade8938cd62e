//! Stateless sessions carried in a signed token.
//!
//! A token is an HS256 JWT holding the username (absent for anonymous visitors who only
//! picked a language), the language and an absolute expiry. The server keeps nothing;
//! ending a session means the client drops the cookie.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::locale::Locale;

/// Opaque signed token as stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Decoded contents of a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: Option<String>,
    pub lang: Locale,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    lang: Locale,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        // Expiry is checked against our own clock in `decode_at`, not jsonwebtoken's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn start(&self, username: &str) -> Result<SessionToken, SessionError> {
        self.start_at(username, Locale::default(), now())
    }

    /// Like [`start`](Self::start) but keeps a language chosen before login.
    pub fn start_with_language(
        &self,
        username: &str,
        lang: Locale,
    ) -> Result<SessionToken, SessionError> {
        self.start_at(username, lang, now())
    }

    pub fn start_at(
        &self,
        username: &str,
        lang: Locale,
        now: i64,
    ) -> Result<SessionToken, SessionError> {
        debug!(username = %username, lang = %lang, "session started");
        self.sign(&Claims {
            sub: Some(username.to_string()),
            lang,
            iat: now,
            exp: self.expiry_from(now),
        })
    }

    /// Token for a visitor who is not logged in but picked a language.
    pub fn anonymous(&self, lang: Locale) -> Result<SessionToken, SessionError> {
        self.anonymous_at(lang, now())
    }

    pub fn anonymous_at(&self, lang: Locale, now: i64) -> Result<SessionToken, SessionError> {
        self.sign(&Claims {
            sub: None,
            lang,
            iat: now,
            exp: self.expiry_from(now),
        })
    }

    /// Returns a re-signed token with `lang` replaced, keeping the original expiry.
    /// Unsupported codes and invalid tokens come back unchanged.
    pub fn set_language(&self, token: &SessionToken, lang_code: &str) -> SessionToken {
        self.set_language_at(token, lang_code, now())
    }

    pub fn set_language_at(&self, token: &SessionToken, lang_code: &str, now: i64) -> SessionToken {
        let Some(lang) = Locale::parse(lang_code) else {
            debug!(lang = %lang_code, "unsupported language ignored");
            return token.clone();
        };
        let Some(mut claims) = self.decode_at(token, now) else {
            return token.clone();
        };
        claims.lang = lang;
        match self.sign(&claims) {
            Ok(updated) => updated,
            Err(err) => {
                warn!(error = %err, "failed to re-sign session with new language");
                token.clone()
            }
        }
    }

    pub fn current_user(&self, token: &SessionToken) -> Option<String> {
        self.current_user_at(token, now())
    }

    pub fn current_user_at(&self, token: &SessionToken, now: i64) -> Option<String> {
        self.decode_at(token, now)?.sub
    }

    pub fn session(&self, token: &SessionToken) -> Option<Session> {
        self.session_at(token, now())
    }

    pub fn session_at(&self, token: &SessionToken, now: i64) -> Option<Session> {
        self.decode_at(token, now).map(|claims| Session {
            username: claims.sub,
            lang: claims.lang,
        })
    }

    /// Nothing is stored server side; the caller drops the cookie.
    pub fn end(&self, token: SessionToken) {
        if let Some(username) = self.current_user(&token) {
            debug!(username = %username, "session ended");
        }
    }

    fn expiry_from(&self, now: i64) -> i64 {
        let secs = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        now.saturating_add(secs)
    }

    fn sign(&self, claims: &Claims) -> Result<SessionToken, SessionError> {
        let raw = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?;
        Ok(SessionToken(raw))
    }

    fn decode_at(&self, token: &SessionToken, now: i64) -> Option<Claims> {
        let claims = match decode::<Claims>(token.as_str(), &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!(error = %err, "rejected session token");
                return None;
            }
        };
        if now >= claims.exp {
            debug!("session expired");
            return None;
        }
        Some(claims)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
