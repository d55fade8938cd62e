use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::credentials::CredentialError;
use crate::gateway::{CurrencyError, WeatherError};
use crate::locale::{Locale, Message};

/// Everything a controller can fail with. Each variant renders a localized message;
/// internal details stay in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login required")]
    LoginRequired,
    #[error("invalid input: {}", .0.key())]
    BadRequest(Message, Locale),
    #[error("authentication failed: {}", .0.key())]
    Unauthorized(Message, Locale),
    #[error("conflict: {}", .0.key())]
    Conflict(Message, Locale),
    #[error("not found: {}", .0.key())]
    NotFound(Message, Locale),
    #[error("upstream failure: {}", .0.key())]
    Upstream(Message, Locale),
    #[error("internal server error")]
    Internal(Locale),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LoginRequired => StatusCode::SEE_OTHER,
            ApiError::BadRequest(..) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(..) => StatusCode::CONFLICT,
            ApiError::NotFound(..) => StatusCode::NOT_FOUND,
            ApiError::Upstream(..) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> (Message, Locale) {
        match self {
            ApiError::LoginRequired => (Message::LoginFirst, Locale::default()),
            ApiError::BadRequest(message, locale)
            | ApiError::Unauthorized(message, locale)
            | ApiError::Conflict(message, locale)
            | ApiError::NotFound(message, locale)
            | ApiError::Upstream(message, locale) => (*message, *locale),
            ApiError::Internal(locale) => (Message::Internal, *locale),
        }
    }

    pub fn credentials(err: CredentialError, locale: Locale) -> Self {
        match err {
            CredentialError::AlreadyExists => ApiError::Conflict(Message::UsernameExists, locale),
            CredentialError::InvalidUsername => {
                ApiError::BadRequest(Message::InvalidUsername, locale)
            }
            other => {
                error!(error = %other, storage = other.is_storage(), "credential store failure");
                ApiError::Internal(locale)
            }
        }
    }

    pub fn weather(err: WeatherError, locale: Locale) -> Self {
        let message = err.message();
        match err {
            WeatherError::EmptyInput => ApiError::BadRequest(message, locale),
            WeatherError::CityNotFound => ApiError::NotFound(message, locale),
            WeatherError::UpstreamUnavailable => ApiError::Upstream(message, locale),
        }
    }

    pub fn currency(err: CurrencyError, locale: Locale) -> Self {
        let message = err.message();
        match err {
            CurrencyError::InvalidCurrency => ApiError::BadRequest(message, locale),
            CurrencyError::UpstreamUnavailable => ApiError::Upstream(message, locale),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::LoginRequired) {
            return Redirect::to("/login").into_response();
        }
        let (message, locale) = self.message();
        let body = Json(serde_json::json!({
            "error": message.key(),
            "message": message.text(locale),
            "lang": locale.code(),
        }));
        (self.status(), body).into_response()
    }
}
