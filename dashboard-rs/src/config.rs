use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::credentials::StoreBackend;
use crate::gateway::CountryMap;

pub const DEFAULT_SECRET_KEY: &str = "change_this_in_production";
const DEFAULT_LIFETIME_MINUTES: u64 = 30;
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_NEWS_URL: &str = "https://newsapi.org/v2/top-headlines";
const DEFAULT_CURRENCY_URL: &str = "https://v6.exchangerate-api.com/v6";

#[derive(Debug, Parser)]
#[command(
    name = "dashboard-rs",
    version,
    about = "Multi-user weather, news and currency dashboard"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, value_name = "FILE")]
    pub users_db: Option<PathBuf>,

    #[arg(long, value_name = "BACKEND")]
    pub store: Option<StoreBackend>,

    #[arg(long, value_name = "MINUTES")]
    pub session_lifetime_minutes: Option<u64>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// API key that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ApiKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: ApiKey,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub countries: CountryMap,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            base_url: String::from(DEFAULT_NEWS_URL),
            countries: CountryMap::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    pub api_key: ApiKey,
    pub base_url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub secret_key: String,
    pub session_lifetime: Duration,
    pub users_db: PathBuf,
    pub store: StoreBackend,
    pub upstream_timeout: Duration,
    pub weather: WeatherConfig,
    pub news: NewsConfig,
    pub currency: CurrencyConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("secret_key", &"<redacted>")
            .field("session_lifetime", &self.session_lifetime)
            .field("users_db", &self.users_db)
            .field("store", &self.store)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("weather", &self.weather)
            .field("news", &self.news)
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("missing API key: set {env} or `{toml_key}` in the config file")]
    MissingKey {
        env: &'static str,
        toml_key: &'static str,
    },
    #[error("invalid number for {key}: {value}")]
    InvalidNumber { key: String, value: String },
    #[error("invalid duration for {key}: {value}")]
    InvalidDuration { key: String, value: String },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    secret_key: Option<String>,
    session_lifetime_minutes: Option<u64>,
    users_db: Option<PathBuf>,
    store: Option<StoreBackend>,
    upstream_timeout: Option<String>,
    #[serde(default)]
    weather: FileService,
    #[serde(default)]
    news: FileNews,
    #[serde(default)]
    currency: FileService,
}

#[derive(Debug, Default, Deserialize)]
struct FileService {
    api_key: Option<ApiKey>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileNews {
    api_key: Option<ApiKey>,
    base_url: Option<String>,
    #[serde(default)]
    countries: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Precedence: CLI flag, then environment, then config file, then default.
    fn resolve<E>(cli: Cli, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = read_file_config(cli.config.as_deref())?;

        let bind = match cli.bind {
            Some(bind) => bind,
            None => match env("DASHBOARD_BIND") {
                Some(raw) => parse_value("DASHBOARD_BIND", &raw)?,
                None => file
                    .bind
                    .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 5000))),
            },
        };

        let secret_key = env("SECRET_KEY")
            .or(file.secret_key)
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_SECRET_KEY));

        let lifetime_minutes = match cli.session_lifetime_minutes {
            Some(minutes) => minutes,
            None => match env("SESSION_LIFETIME_MINUTES") {
                Some(raw) => parse_number("SESSION_LIFETIME_MINUTES", &raw)?,
                None => file
                    .session_lifetime_minutes
                    .unwrap_or(DEFAULT_LIFETIME_MINUTES),
            },
        };
        if lifetime_minutes == 0 {
            return Err(ConfigError::InvalidNumber {
                key: String::from("SESSION_LIFETIME_MINUTES"),
                value: lifetime_minutes.to_string(),
            });
        }

        let users_db = cli
            .users_db
            .or_else(|| env("USERS_DB").map(PathBuf::from))
            .or(file.users_db)
            .unwrap_or_else(|| PathBuf::from("users.db"));

        let store = match cli.store {
            Some(store) => store,
            None => match env("USERS_BACKEND") {
                Some(raw) => parse_value("USERS_BACKEND", &raw)?,
                None => file.store.unwrap_or_default(),
            },
        };

        let upstream_timeout = match env("UPSTREAM_TIMEOUT").or(file.upstream_timeout) {
            Some(raw) => parse_timeout("UPSTREAM_TIMEOUT", &raw)?,
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let weather = WeatherConfig {
            api_key: require_key(
                env("WEATHER_API_KEY").map(|k| ApiKey::from(k.as_str())),
                file.weather.api_key,
                "WEATHER_API_KEY",
                "weather.api_key",
            )?,
            base_url: file
                .weather
                .base_url
                .unwrap_or_else(|| String::from(DEFAULT_WEATHER_URL)),
        };

        let mut countries = CountryMap::default();
        countries.extend(file.news.countries);
        let news = NewsConfig {
            api_key: require_key(
                env("NEWS_API_KEY").map(|k| ApiKey::from(k.as_str())),
                file.news.api_key,
                "NEWS_API_KEY",
                "news.api_key",
            )?,
            base_url: file
                .news
                .base_url
                .unwrap_or_else(|| String::from(DEFAULT_NEWS_URL)),
            countries,
        };

        let currency = CurrencyConfig {
            api_key: require_key(
                env("CURRENCY_API_KEY").map(|k| ApiKey::from(k.as_str())),
                file.currency.api_key,
                "CURRENCY_API_KEY",
                "currency.api_key",
            )?,
            base_url: env("CURRENCY_API_URL")
                .or(file.currency.base_url)
                .unwrap_or_else(|| String::from(DEFAULT_CURRENCY_URL)),
        };

        Ok(Self {
            bind,
            secret_key,
            session_lifetime: Duration::from_secs(lifetime_minutes.saturating_mul(60)),
            users_db,
            store,
            upstream_timeout,
            weather,
            news,
            currency,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn require_key(
    from_env: Option<ApiKey>,
    from_file: Option<ApiKey>,
    env: &'static str,
    toml_key: &'static str,
) -> Result<ApiKey, ConfigError> {
    from_env
        .or(from_file)
        .filter(|key| !key.is_empty())
        .ok_or(ConfigError::MissingKey { env, toml_key })
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: String::from(key),
        value: String::from(raw),
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: String::from(key),
        value: String::from(raw),
    })
}

/// Accepts humantime strings (`10s`, `1m`) or bare seconds, clamped to 1s..=60s.
fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match trimmed.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(trimmed).map_err(|_| ConfigError::InvalidDuration {
            key: String::from(key),
            value: String::from(raw),
        })?,
    };
    Ok(parsed.clamp(MIN_UPSTREAM_TIMEOUT, MAX_UPSTREAM_TIMEOUT))
}
