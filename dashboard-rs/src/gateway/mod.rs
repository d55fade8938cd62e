//! Upstream API gateway: weather, news and currency lookups.
//!
//! One shared `reqwest::Client` with a bounded timeout. No caching, no retries; every
//! failure is translated into an error that maps onto a localized [`Message`](crate::locale::Message).
//! Request URLs carry API keys and are never logged.

mod currency;
mod news;
mod weather;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use tracing::info;

use crate::config::{CurrencyConfig, NewsConfig, WeatherConfig};

pub use currency::{CurrencyError, Rates, COMMON_CURRENCIES};
pub use news::{Article, CountryMap};
pub use weather::{WeatherError, WeatherView};

#[derive(Debug, Clone)]
pub struct Gateway {
    client: reqwest::Client,
    weather: WeatherConfig,
    news: NewsConfig,
    currency: CurrencyConfig,
}

impl Gateway {
    pub fn new(
        weather: WeatherConfig,
        news: NewsConfig,
        currency: CurrencyConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("dashboard-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            timeout = %humantime::format_duration(timeout),
            news_countries = news.countries.len(),
            "upstream gateway initialized"
        );
        Ok(Self {
            client,
            weather,
            news,
            currency,
        })
    }
}
