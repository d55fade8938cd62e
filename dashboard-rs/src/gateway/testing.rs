//! Local stand-ins for the upstream services.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use super::Gateway;
use crate::config::{ApiKey, CurrencyConfig, NewsConfig, WeatherConfig};

pub type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Serves `router` on an ephemeral loopback port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let addr = listener.local_addr().expect("fake upstream address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Gateway whose three services all live under `base`.
pub fn gateway_for(base: &str) -> Gateway {
    Gateway::new(
        WeatherConfig {
            api_key: ApiKey::from("weather-key"),
            base_url: format!("{base}/weather"),
        },
        NewsConfig {
            api_key: ApiKey::from("news-key"),
            base_url: format!("{base}/news"),
            ..NewsConfig::default()
        },
        CurrencyConfig {
            api_key: ApiKey::from("currency-key"),
            base_url: format!("{base}/currency"),
        },
        Duration::from_secs(2),
    )
    .expect("build test gateway")
}

/// Gateway pointed at a port nothing listens on.
pub fn unreachable_gateway() -> Gateway {
    gateway_for("http://127.0.0.1:9")
}
