use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::Gateway;
use crate::locale::{Locale, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("city name is empty")]
    EmptyInput,
    #[error("weather service unavailable")]
    UpstreamUnavailable,
    #[error("city not found")]
    CityNotFound,
}

impl WeatherError {
    pub fn message(self) -> Message {
        match self {
            WeatherError::EmptyInput => Message::EnterCity,
            WeatherError::UpstreamUnavailable => Message::WeatherUnavailable,
            WeatherError::CityNotFound => Message::CityNotFound,
        }
    }
}

/// Current conditions for one city. Times are `HH:MM` in the city's own offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub city: String,
    pub temperature: f64,
    pub description: String,
    pub icon: String,
    pub condition_id: i64,
    pub sunrise: String,
    pub sunset: String,
    pub local_time: String,
}

/// Subset of the provider's current-weather payload. Everything is optional so that
/// "not found" bodies, which carry only `cod` and `message`, still decode.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    cod: serde_json::Value,
    name: Option<String>,
    main: Option<MainReading>,
    #[serde(default)]
    weather: Vec<Condition>,
    sys: Option<SunTimes>,
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct MainReading {
    temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct Condition {
    id: i64,
    description: String,
    icon: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SunTimes {
    sunrise: i64,
    sunset: i64,
}

impl WeatherReport {
    /// The provider signals success with `cod` 200, as a number or a numeric string.
    fn is_found(&self) -> bool {
        match &self.cod {
            serde_json::Value::Number(n) => n.as_i64() == Some(200),
            serde_json::Value::String(s) => s.trim() == "200",
            _ => false,
        }
    }
}

impl WeatherView {
    /// Shape a decoded report. `now` is the current epoch in seconds.
    pub fn from_report(report: WeatherReport, now: i64) -> Result<Self, WeatherError> {
        if !report.is_found() {
            return Err(WeatherError::CityNotFound);
        }
        let incomplete = || {
            warn!("weather response is missing required fields");
            WeatherError::UpstreamUnavailable
        };

        let offset = report.timezone;
        let city = report.name.ok_or_else(incomplete)?;
        let temperature = report.main.ok_or_else(incomplete)?.temp;
        let condition = report.weather.into_iter().next().ok_or_else(incomplete)?;
        let sun = report.sys.ok_or_else(incomplete)?;

        Ok(Self {
            city,
            temperature,
            description: condition.description,
            icon: condition.icon,
            condition_id: condition.id,
            sunrise: local_clock(sun.sunrise, offset).ok_or_else(incomplete)?,
            sunset: local_clock(sun.sunset, offset).ok_or_else(incomplete)?,
            local_time: local_clock(now, offset).ok_or_else(incomplete)?,
        })
    }
}

/// `HH:MM` of `epoch + offset_seconds` read as UTC. Never consults the host timezone.
pub fn local_clock(epoch: i64, offset_seconds: i64) -> Option<String> {
    let shifted = epoch.checked_add(offset_seconds)?;
    DateTime::from_timestamp(shifted, 0).map(|at| at.format("%H:%M").to_string())
}

impl Gateway {
    pub async fn fetch_weather(&self, city: &str, locale: Locale) -> Result<WeatherView, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyInput);
        }

        let response = self
            .client
            .get(&self.weather.base_url)
            .query(&[
                ("q", city),
                ("appid", self.weather.api_key.as_str()),
                ("units", "metric"),
                ("lang", locale.code()),
            ])
            .send()
            .await
            .map_err(|err| {
                warn!(city = %city, error = %err.without_url(), "weather request failed");
                WeatherError::UpstreamUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(city = %city, status = %status, "weather service returned error status");
            return Err(WeatherError::UpstreamUnavailable);
        }

        let report: WeatherReport = response.json().await.map_err(|err| {
            warn!(city = %city, error = %err.without_url(), "weather response could not be decoded");
            WeatherError::UpstreamUnavailable
        })?;

        let view = WeatherView::from_report(report, chrono::Utc::now().timestamp())?;
        debug!(city = %view.city, lang = %locale, "weather fetched");
        Ok(view)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::{local_clock, WeatherError, WeatherReport, WeatherView};
    use crate::gateway::testing::{gateway_for, spawn_upstream, unreachable_gateway, Recorded};
    use crate::locale::Locale;

    fn berlin_payload() -> Value {
        json!({
            "cod": 200,
            "name": "Berlin",
            "main": { "temp": 21.5 },
            "weather": [{ "id": 800, "description": "clear sky", "icon": "01d" }],
            "sys": { "sunrise": 1_700_000_000_i64, "sunset": 1_700_030_000_i64 },
            "timezone": 7200
        })
    }

    #[test]
    fn local_clock_adds_offset_in_utc() {
        // 1700000000 is 2023-11-14 22:13:20 UTC; +2h crosses midnight.
        assert_eq!(local_clock(1_700_000_000, 7200).as_deref(), Some("00:13"));
        assert_eq!(local_clock(1_700_000_000, 0).as_deref(), Some("22:13"));
        assert_eq!(local_clock(1_700_000_000, -5 * 3600).as_deref(), Some("17:13"));
        assert_eq!(local_clock(1_700_000_000, 19_800).as_deref(), Some("03:43"));
    }

    #[test]
    fn local_clock_rejects_overflow() {
        assert_eq!(local_clock(i64::MAX, 1), None);
    }

    #[test]
    fn view_is_built_from_report() {
        let report: WeatherReport = serde_json::from_value(berlin_payload()).unwrap();
        let view = WeatherView::from_report(report, 1_700_003_600).unwrap();

        assert_eq!(view.city, "Berlin");
        assert_eq!(view.temperature, 21.5);
        assert_eq!(view.description, "clear sky");
        assert_eq!(view.icon, "01d");
        assert_eq!(view.condition_id, 800);
        assert_eq!(view.sunrise, "00:13");
        assert_eq!(view.sunset, "08:33");
        assert_eq!(view.local_time, "01:13");
    }

    #[test]
    fn string_not_found_code_maps_to_city_not_found() {
        let report: WeatherReport =
            serde_json::from_value(json!({ "cod": "404", "message": "city not found" })).unwrap();
        assert_eq!(
            WeatherView::from_report(report, 0),
            Err(WeatherError::CityNotFound)
        );
    }

    #[test]
    fn string_success_code_is_accepted() {
        let mut payload = berlin_payload();
        payload["cod"] = json!("200");
        let report: WeatherReport = serde_json::from_value(payload).unwrap();
        assert!(WeatherView::from_report(report, 0).is_ok());
    }

    #[test]
    fn incomplete_success_payload_is_unavailable() {
        let report: WeatherReport =
            serde_json::from_value(json!({ "cod": 200, "name": "Nowhere" })).unwrap();
        assert_eq!(
            WeatherView::from_report(report, 0),
            Err(WeatherError::UpstreamUnavailable)
        );
    }

    #[tokio::test]
    async fn blank_city_is_rejected_without_network() {
        let gateway = unreachable_gateway();
        assert_eq!(
            gateway.fetch_weather("   ", Locale::En).await,
            Err(WeatherError::EmptyInput)
        );
        assert_eq!(
            gateway.fetch_weather("", Locale::De).await,
            Err(WeatherError::EmptyInput)
        );
    }

    #[tokio::test]
    async fn fetch_sends_expected_query_and_shapes_result() {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/weather",
                get(
                    |State(rec): State<Recorded>, Query(q): Query<HashMap<String, String>>| async move {
                        rec.lock().unwrap().push(q);
                        Json(berlin_payload())
                    },
                ),
            )
            .with_state(Arc::clone(&recorded));
        let base = spawn_upstream(router).await;

        let view = gateway_for(&base)
            .fetch_weather("  Berlin ", Locale::De)
            .await
            .unwrap();
        assert_eq!(view.city, "Berlin");
        assert_eq!(view.sunrise, "00:13");

        let calls = recorded.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let query = &calls[0];
        assert_eq!(query.get("q").map(String::as_str), Some("Berlin"));
        assert_eq!(query.get("appid").map(String::as_str), Some("weather-key"));
        assert_eq!(query.get("units").map(String::as_str), Some("metric"));
        assert_eq!(query.get("lang").map(String::as_str), Some("de"));
    }

    #[tokio::test]
    async fn error_status_maps_to_unavailable() {
        let router = Router::new().route(
            "/weather",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_upstream(router).await;

        assert_eq!(
            gateway_for(&base).fetch_weather("Berlin", Locale::En).await,
            Err(WeatherError::UpstreamUnavailable)
        );
    }

    #[tokio::test]
    async fn not_found_body_maps_to_city_not_found() {
        let router = Router::new().route(
            "/weather",
            get(|| async { Json(json!({ "cod": "404", "message": "city not found" })) }),
        );
        let base = spawn_upstream(router).await;

        assert_eq!(
            gateway_for(&base).fetch_weather("Atlantis", Locale::En).await,
            Err(WeatherError::CityNotFound)
        );
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_unavailable() {
        assert_eq!(
            unreachable_gateway().fetch_weather("Berlin", Locale::En).await,
            Err(WeatherError::UpstreamUnavailable)
        );
    }
}
