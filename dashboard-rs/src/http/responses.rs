use serde::{Deserialize, Serialize};

use crate::gateway::{Article, Rates, WeatherView, COMMON_CURRENCIES};
use crate::locale::{Locale, Message};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message_key: &'static str,
    pub message: &'static str,
    pub lang: Locale,
}

impl MessageResponse {
    pub fn new(message: Message, lang: Locale) -> Self {
        Self {
            message_key: message.key(),
            message: message.text(lang),
            lang,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
    pub url: String,
    pub active: bool,
}

pub fn language_options(active: Locale) -> Vec<LanguageOption> {
    Locale::ALL
        .into_iter()
        .map(|locale| LanguageOption {
            code: locale.code(),
            name: locale.display_name(),
            url: format!("/set_language/{}", locale.code()),
            active: locale == active,
        })
        .collect()
}

/// Login and registration pages: which fields to post, and where.
#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub form: &'static str,
    pub action: &'static str,
    pub fields: [&'static str; 2],
    pub lang: Locale,
    pub languages: Vec<LanguageOption>,
}

impl FormResponse {
    pub fn new(form: &'static str, action: &'static str, lang: Locale) -> Self {
        Self {
            form,
            action,
            fields: ["username", "password"],
            lang,
            languages: language_options(lang),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardLink {
    pub id: &'static str,
    pub url: &'static str,
}

pub const DASHBOARD_LINKS: [DashboardLink; 4] = [
    DashboardLink {
        id: "weather",
        url: "/weather",
    },
    DashboardLink {
        id: "news",
        url: "/news",
    },
    DashboardLink {
        id: "currency",
        url: "/currency",
    },
    DashboardLink {
        id: "logout",
        url: "/logout",
    },
];

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub username: String,
    pub lang: Locale,
    pub links: &'static [DashboardLink],
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub lang: Locale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherView>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub lang: Locale,
    pub country: String,
    pub articles: Vec<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyPageResponse {
    pub lang: Locale,
    pub currencies: &'static [&'static str],
    pub rates_url: &'static str,
}

impl CurrencyPageResponse {
    pub fn new(lang: Locale) -> Self {
        Self {
            lang,
            currencies: &COMMON_CURRENCIES,
            rates_url: "/currency/rates/{base}",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub base: String,
    pub rates: Rates,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    /// Trimmed username and password, or `None` when either is blank.
    pub fn filled(&self) -> Option<(String, String)> {
        let username = self.username.trim();
        let password = self.password.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some((username.to_string(), password.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CityForm {
    #[serde(default)]
    pub city: String,
}
