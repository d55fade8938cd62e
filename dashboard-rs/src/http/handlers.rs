use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::REFERER;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::{CookieJar, Form};
use tracing::{debug, error, info, warn};

use crate::credentials::{CredentialError, CredentialStore};
use crate::locale::{Locale, Message};

use super::auth::{ensure_logged_in, removal_cookie, session_cookie, RequestSession};
use super::error::ApiError;
use super::responses::{
    language_options, CityForm, CredentialsForm, CurrencyPageResponse, DashboardResponse,
    FormResponse, HealthResponse, MessageResponse, NewsResponse, RatesResponse, WeatherResponse,
    DASHBOARD_LINKS,
};
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/weather", get(weather_page).post(weather_lookup))
        .route("/news", get(news))
        .route("/currency", get(currency_page))
        .route("/currency/rates/{base}", get(currency_rates))
        .route("/set_language/{code}", get(set_language))
        .route("/check_lang", get(check_lang))
        .layer(
            tower_http::request_id::SetRequestIdLayer::new(
                axum::http::header::HeaderName::from_static("x-request-id"),
                tower_http::request_id::MakeRequestUuid,
            ),
        )
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs a blocking store call off the async workers.
async fn with_store<T, F>(state: &AppState, locale: Locale, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CredentialStore) -> Result<T, CredentialError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || call(store.as_ref())).await {
        Ok(result) => result.map_err(|err| ApiError::credentials(err, locale)),
        Err(err) => {
            error!(error = %err, "credential store task failed");
            Err(ApiError::Internal(locale))
        }
    }
}

async fn home() -> Redirect {
    Redirect::to("/login")
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn register_form(State(state): State<AppState>, jar: CookieJar) -> Json<FormResponse> {
    let locale = RequestSession::from_jar(&state, &jar).locale();
    Json(FormResponse::new("register", "/register", locale))
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let locale = RequestSession::from_jar(&state, &jar).locale();
    let (username, password) = form
        .filled()
        .ok_or(ApiError::BadRequest(Message::FillAllFields, locale))?;

    let name = username.clone();
    let taken = with_store(&state, locale, move |store| store.exists(&name)).await?;
    if taken {
        debug!(username = %username, "registration rejected, username taken");
        return Err(ApiError::Conflict(Message::UsernameExists, locale));
    }

    // `create` stays authoritative: a concurrent registration can still win the race.
    let name = username.clone();
    with_store(&state, locale, move |store| store.create(&name, &password)).await?;
    info!(username = %username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(Message::RegistrationSuccessful, locale)),
    ))
}

async fn login_form(State(state): State<AppState>, jar: CookieJar) -> Json<FormResponse> {
    let locale = RequestSession::from_jar(&state, &jar).locale();
    Json(FormResponse::new("login", "/login", locale))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let request = RequestSession::from_jar(&state, &jar);
    let locale = request.locale();
    let (username, password) = form
        .filled()
        .ok_or(ApiError::BadRequest(Message::FillAllFields, locale))?;

    let name = username.clone();
    let verified = with_store(&state, locale, move |store| store.verify(&name, &password)).await?;
    if !verified {
        warn!(username = %username, "failed login attempt");
        return Err(ApiError::Unauthorized(Message::InvalidCredentials, locale));
    }

    // A language picked before login lives in an anonymous session and carries over.
    let started = match request.session {
        Some(_) => state.sessions.start_with_language(&username, locale),
        None => state.sessions.start(&username),
    };
    let token = started.map_err(|err| {
        error!(error = %err, "failed to sign session");
        ApiError::Internal(locale)
    })?;
    info!(username = %username, "user logged in");

    let jar = jar.add(session_cookie(token, state.sessions.lifetime()));
    Ok((jar, Json(MessageResponse::new(Message::LoggedIn, locale))))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let request = RequestSession::from_jar(&state, &jar);
    let locale = request.locale();
    if let Some(token) = request.token {
        state.sessions.end(token);
    }
    (
        jar.remove(removal_cookie()),
        Json(MessageResponse::new(Message::LoggedOut, locale)),
    )
}

async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    debug!(username = %user.username, "dashboard requested");
    Ok(Json(DashboardResponse {
        username: user.username,
        lang: user.locale,
        links: &DASHBOARD_LINKS,
        languages: language_options(user.locale),
    }))
}

async fn weather_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<WeatherResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    Ok(Json(WeatherResponse {
        lang: user.locale,
        weather: None,
    }))
}

async fn weather_lookup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CityForm>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    let view = state
        .gateway
        .fetch_weather(&form.city, user.locale)
        .await
        .map_err(|err| ApiError::weather(err, user.locale))?;
    Ok(Json(WeatherResponse {
        lang: user.locale,
        weather: Some(view),
    }))
}

async fn news(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<NewsResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    let feed = state.gateway.fetch_news(user.locale).await;
    Ok(Json(NewsResponse {
        lang: user.locale,
        country: state.gateway.news_country(user.locale.code()).to_string(),
        articles: feed.articles,
        notice: feed
            .warning
            .map(|warning| warning.message().text(user.locale)),
    }))
}

async fn currency_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<CurrencyPageResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    Ok(Json(CurrencyPageResponse::new(user.locale)))
}

async fn currency_rates(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(base): Path<String>,
) -> Result<Json<RatesResponse>, ApiError> {
    let user = ensure_logged_in(&state, &jar)?;
    let rates = state
        .gateway
        .get_rates(&base)
        .await
        .map_err(|err| ApiError::currency(err, user.locale))?;
    Ok(Json(RatesResponse {
        base: base.trim().to_ascii_uppercase(),
        rates,
    }))
}

async fn set_language(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let target = referer_target(&headers).unwrap_or_else(|| String::from("/dashboard"));
    let request = RequestSession::from_jar(&state, &jar);

    let updated = match (request.token, request.session) {
        (Some(token), Some(_)) => Some(state.sessions.set_language(&token, &code)),
        _ => match Locale::parse(&code) {
            Some(lang) => match state.sessions.anonymous(lang) {
                Ok(token) => Some(token),
                Err(err) => {
                    warn!(error = %err, "failed to sign language-only session");
                    None
                }
            },
            None => {
                debug!(lang = %code, "unsupported language ignored");
                None
            }
        },
    };

    let jar = match updated {
        Some(token) => jar.add(session_cookie(token, state.sessions.lifetime())),
        None => jar,
    };
    (jar, Redirect::to(&target)).into_response()
}

/// Path and query of the `Referer` header. The host is dropped so the redirect stays local;
/// paths a browser would read as protocol-relative are refused.
fn referer_target(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REFERER)?.to_str().ok()?;
    let url = reqwest::Url::parse(raw).ok()?;
    let path = url.path();
    if !path.starts_with('/') || path.starts_with("//") || path.contains('\\') {
        debug!(referer = %raw, "referer ignored for redirect");
        return None;
    }
    let mut target = path.to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    Some(target)
}

async fn check_lang(State(state): State<AppState>, jar: CookieJar) -> String {
    let locale = RequestSession::from_jar(&state, &jar).locale();
    format!("Current language: {locale}")
}

#[cfg(test)]
mod tests {
    use axum::http::header::REFERER;
    use axum::http::{HeaderMap, HeaderValue};

    use super::referer_target;

    fn with_referer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn referer_keeps_path_and_query_only() {
        assert_eq!(
            referer_target(&with_referer("http://localhost:5000/weather?x=1")).as_deref(),
            Some("/weather?x=1")
        );
        assert_eq!(
            referer_target(&with_referer("https://evil.example/news")).as_deref(),
            Some("/news")
        );
    }

    #[test]
    fn protocol_relative_paths_are_refused() {
        assert_eq!(
            referer_target(&with_referer("http://localhost:5000//evil.example/phish")),
            None
        );
        assert_eq!(
            referer_target(&with_referer("http://localhost:5000/\\evil.example/phish")),
            None
        );
        assert_eq!(
            referer_target(&with_referer("http://localhost:5000/news//archive")).as_deref(),
            Some("/news//archive")
        );
    }

    #[test]
    fn missing_or_relative_referer_is_ignored() {
        assert_eq!(referer_target(&HeaderMap::new()), None);
        assert_eq!(referer_target(&with_referer("/dashboard")), None);
    }
}
