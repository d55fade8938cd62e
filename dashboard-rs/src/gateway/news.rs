use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Gateway;
use crate::locale::{Locale, Message};

pub const MAX_ARTICLES: usize = 5;

const FALLBACK_COUNTRY: &str = "us";

/// Locale code → provider country code, with a fallback for unmapped locales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryMap {
    entries: BTreeMap<String, String>,
}

impl Default for CountryMap {
    fn default() -> Self {
        let entries = [("en", "us"), ("de", "de")]
            .into_iter()
            .map(|(lang, country)| (lang.to_string(), country.to_string()))
            .collect();
        Self { entries }
    }
}

impl CountryMap {
    /// Adds or replaces entries, e.g. `ar = "eg"` from the config file.
    pub fn extend(&mut self, overrides: BTreeMap<String, String>) {
        self.entries.extend(overrides);
    }

    pub fn country_for(&self, locale_code: &str) -> &str {
        self.entries
            .get(locale_code)
            .map(String::as_str)
            .unwrap_or(FALLBACK_COUNTRY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A headline exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Article(serde_json::Map<String, serde_json::Value>);

impl Article {
    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(serde_json::Value::as_str)
    }
}

/// Non-fatal: the page still renders, with an empty list and a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsUnavailable;

impl NewsUnavailable {
    pub fn message(self) -> Message {
        Message::NewsUnavailable
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsFeed {
    pub articles: Vec<Article>,
    pub warning: Option<NewsUnavailable>,
}

impl NewsFeed {
    fn unavailable() -> Self {
        Self {
            articles: Vec::new(),
            warning: Some(NewsUnavailable),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Headlines {
    #[serde(default)]
    articles: Vec<Article>,
}

impl Gateway {
    pub fn news_country(&self, locale_code: &str) -> &str {
        self.news.countries.country_for(locale_code)
    }

    /// Top headlines for the locale's country. Never fails; problems yield an empty
    /// feed carrying [`NewsUnavailable`].
    pub async fn fetch_news(&self, locale: Locale) -> NewsFeed {
        let country = self.news_country(locale.code());

        let response = match self
            .client
            .get(&self.news.base_url)
            .query(&[
                ("country", country),
                ("apiKey", self.news.api_key.as_str()),
                ("language", locale.code()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(country = %country, error = %err.without_url(), "news request failed");
                return NewsFeed::unavailable();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(country = %country, status = %status, "news service returned error status");
            return NewsFeed::unavailable();
        }

        match response.json::<Headlines>().await {
            Ok(mut headlines) => {
                headlines.articles.truncate(MAX_ARTICLES);
                debug!(
                    country = %country,
                    articles = headlines.articles.len(),
                    top = ?headlines.articles.first().and_then(Article::title),
                    "news fetched"
                );
                NewsFeed {
                    articles: headlines.articles,
                    warning: None,
                }
            }
            Err(err) => {
                warn!(country = %country, error = %err.without_url(), "news response could not be decoded");
                NewsFeed::unavailable()
            }
        }
    }
}
