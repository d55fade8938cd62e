use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::Gateway;
use crate::locale::Message;

/// Currency code → rate relative to the requested base.
pub type Rates = BTreeMap<String, f64>;

/// Codes offered by the currency tool's pickers.
pub const COMMON_CURRENCIES: [&str; 10] = [
    "USD", "EUR", "GBP", "CHF", "JPY", "CAD", "AUD", "CNY", "SEK", "EGP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("invalid currency code")]
    InvalidCurrency,
    #[error("currency service unavailable")]
    UpstreamUnavailable,
}

impl CurrencyError {
    pub fn message(self) -> Message {
        match self {
            CurrencyError::InvalidCurrency => Message::InvalidCurrency,
            CurrencyError::UpstreamUnavailable => Message::CurrencyUnavailable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    conversion_rates: Option<Rates>,
    rates: Option<Rates>,
}

fn normalize_code(raw: &str) -> Result<String, CurrencyError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(CurrencyError::InvalidCurrency)
    }
}

impl Gateway {
    /// Latest rates for `base_currency`, passed through from the provider.
    pub async fn get_rates(&self, base_currency: &str) -> Result<Rates, CurrencyError> {
        let base = normalize_code(base_currency)?;
        let url = format!(
            "{}/{}/latest/{}",
            self.currency.base_url.trim_end_matches('/'),
            self.currency.api_key.as_str(),
            base
        );

        let response = self.client.get(url).send().await.map_err(|err| {
            warn!(base = %base, error = %err.without_url(), "currency request failed");
            CurrencyError::UpstreamUnavailable
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(base = %base, status = %status, "currency service returned error status");
            return Err(CurrencyError::UpstreamUnavailable);
        }

        let body: RatesResponse = response.json().await.map_err(|err| {
            warn!(base = %base, error = %err.without_url(), "currency response could not be decoded");
            CurrencyError::UpstreamUnavailable
        })?;

        let rates = body.conversion_rates.or(body.rates).ok_or_else(|| {
            warn!(base = %base, "currency response has no rates");
            CurrencyError::UpstreamUnavailable
        })?;
        debug!(base = %base, currencies = rates.len(), "currency rates fetched");
        Ok(rates)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::{normalize_code, CurrencyError};
    use crate::gateway::testing::{gateway_for, spawn_upstream, unreachable_gateway};

    #[test]
    fn codes_are_normalized_and_validated() {
        assert_eq!(normalize_code(" usd ").unwrap(), "USD");
        assert_eq!(normalize_code("EUR").unwrap(), "EUR");
        assert_eq!(normalize_code(""), Err(CurrencyError::InvalidCurrency));
        assert_eq!(normalize_code("EURO"), Err(CurrencyError::InvalidCurrency));
        assert_eq!(normalize_code("U$D"), Err(CurrencyError::InvalidCurrency));
    }

    #[tokio::test]
    async fn invalid_code_is_rejected_without_network() {
        assert_eq!(
            unreachable_gateway().get_rates("12").await,
            Err(CurrencyError::InvalidCurrency)
        );
    }

    #[tokio::test]
    async fn rates_are_passed_through() {
        let router = Router::new().route(
            "/currency/{key}/latest/{base}",
            get(|Path((key, base)): Path<(String, String)>| async move {
                assert_eq!(key, "currency-key");
                Json(json!({
                    "result": "success",
                    "base_code": base,
                    "conversion_rates": { "USD": 1.0, "EUR": 0.92 }
                }))
            }),
        );
        let base = spawn_upstream(router).await;

        let rates = gateway_for(&base).get_rates("usd").await.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get("EUR"), Some(&0.92));
    }

    #[tokio::test]
    async fn plain_rates_field_is_accepted() {
        let router = Router::new().route(
            "/currency/{key}/latest/{base}",
            get(|| async { Json(json!({ "rates": { "GBP": 0.79 } })) }),
        );
        let base = spawn_upstream(router).await;

        let rates = gateway_for(&base).get_rates("USD").await.unwrap();
        assert_eq!(rates.get("GBP"), Some(&0.79));
    }

    #[tokio::test]
    async fn upstream_errors_map_to_unavailable() {
        let router = Router::new().route(
            "/currency/{key}/latest/{base}",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "result": "error" }))) }),
        );
        let base = spawn_upstream(router).await;

        assert_eq!(
            gateway_for(&base).get_rates("USD").await,
            Err(CurrencyError::UpstreamUnavailable)
        );
        assert_eq!(
            unreachable_gateway().get_rates("USD").await,
            Err(CurrencyError::UpstreamUnavailable)
        );
    }
}
