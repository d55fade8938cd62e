use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use super::error::ApiError;
use super::state::AppState;
use crate::locale::{self, Locale};
use crate::session::{Session, SessionToken};

pub const SESSION_COOKIE: &str = "session";

/// The caller's session as read from this request's cookie.
#[derive(Debug, Clone, Default)]
pub struct RequestSession {
    pub token: Option<SessionToken>,
    pub session: Option<Session>,
}

impl RequestSession {
    pub fn from_jar(state: &AppState, jar: &CookieJar) -> Self {
        let Some(token) = jar
            .get(SESSION_COOKIE)
            .map(|cookie| SessionToken::from(cookie.value().to_string()))
        else {
            return Self::default();
        };
        let session = state.sessions.session(&token);
        Self {
            token: Some(token),
            session,
        }
    }

    pub fn locale(&self) -> Locale {
        locale::resolve(self.session.as_ref())
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref()?.username.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub locale: Locale,
}

pub fn ensure_logged_in(state: &AppState, jar: &CookieJar) -> Result<CurrentUser, ApiError> {
    let request = RequestSession::from_jar(state, jar);
    match request.username() {
        Some(username) => Ok(CurrentUser {
            username: username.to_string(),
            locale: request.locale(),
        }),
        None => {
            debug!("request without valid session redirected to login");
            Err(ApiError::LoginRequired)
        }
    }
}

pub fn session_cookie(token: SessionToken, lifetime: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token.into_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
