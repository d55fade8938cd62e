//! Supported UI languages and the fixed catalog of user-facing messages.
//!
//! Only the locales in [`Locale::ALL`] are accepted anywhere in the app. Codes are
//! exact, lowercase two-letter strings; anything else falls back to [`Locale::En`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "de")]
    De,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::De];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::De => "de",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::De => "Deutsch",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|locale| locale.code() == code)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Active language for a request: the session's choice, or English.
pub fn resolve(session: Option<&Session>) -> Locale {
    session.map(|session| session.lang).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    FillAllFields,
    UsernameExists,
    InvalidUsername,
    RegistrationSuccessful,
    InvalidCredentials,
    LoggedIn,
    LoggedOut,
    LoginFirst,
    EnterCity,
    CityNotFound,
    WeatherUnavailable,
    NewsUnavailable,
    InvalidCurrency,
    CurrencyUnavailable,
    Internal,
}

impl Message {
    /// Stable machine-readable key, used as the `error` field of JSON bodies.
    pub fn key(self) -> &'static str {
        match self {
            Message::FillAllFields => "fill_all_fields",
            Message::UsernameExists => "username_exists",
            Message::InvalidUsername => "invalid_username",
            Message::RegistrationSuccessful => "registration_successful",
            Message::InvalidCredentials => "invalid_credentials",
            Message::LoggedIn => "logged_in",
            Message::LoggedOut => "logged_out",
            Message::LoginFirst => "login_first",
            Message::EnterCity => "enter_city",
            Message::CityNotFound => "city_not_found",
            Message::WeatherUnavailable => "weather_unavailable",
            Message::NewsUnavailable => "news_unavailable",
            Message::InvalidCurrency => "invalid_currency",
            Message::CurrencyUnavailable => "currency_unavailable",
            Message::Internal => "internal_error",
        }
    }

    pub fn text(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.english(),
            Locale::De => self.german(),
        }
    }

    fn english(self) -> &'static str {
        match self {
            Message::FillAllFields => "Please fill in all fields.",
            Message::UsernameExists => "Username already exists.",
            Message::InvalidUsername => "Username contains unsupported characters.",
            Message::RegistrationSuccessful => "Registration successful. Please login.",
            Message::InvalidCredentials => "Invalid username or password.",
            Message::LoggedIn => "Logged in successfully.",
            Message::LoggedOut => "You have been logged out.",
            Message::LoginFirst => "Please login first.",
            Message::EnterCity => "Please enter a city name.",
            Message::CityNotFound => "City not found.",
            Message::WeatherUnavailable => "Error fetching data.",
            Message::NewsUnavailable => "Failed to load news.",
            Message::InvalidCurrency => "Please enter a valid currency code.",
            Message::CurrencyUnavailable => "Exchange rates are currently unavailable.",
            Message::Internal => "Something went wrong. Please try again later.",
        }
    }

    fn german(self) -> &'static str {
        match self {
            Message::FillAllFields => "Bitte alle Felder ausfüllen.",
            Message::UsernameExists => "Benutzername existiert bereits.",
            Message::InvalidUsername => "Der Benutzername enthält nicht unterstützte Zeichen.",
            Message::RegistrationSuccessful => "Registrierung erfolgreich. Bitte anmelden.",
            Message::InvalidCredentials => "Ungültiger Benutzername oder Passwort.",
            Message::LoggedIn => "Erfolgreich angemeldet.",
            Message::LoggedOut => "Sie wurden abgemeldet.",
            Message::LoginFirst => "Bitte zuerst anmelden.",
            Message::EnterCity => "Bitte einen Städtenamen eingeben.",
            Message::CityNotFound => "Stadt nicht gefunden.",
            Message::WeatherUnavailable => "Fehler beim Abrufen der Daten.",
            Message::NewsUnavailable => "Nachrichten konnten nicht geladen werden.",
            Message::InvalidCurrency => "Bitte einen gültigen Währungscode eingeben.",
            Message::CurrencyUnavailable => "Wechselkurse sind derzeit nicht verfügbar.",
            Message::Internal => "Etwas ist schiefgelaufen. Bitte später erneut versuchen.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, Locale, Message};
    use crate::session::Session;

    #[test]
    fn parse_accepts_supported_codes_only() {
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("de"), Some(Locale::De));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(Locale::parse("DE"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn resolve_defaults_to_english_without_session() {
        assert_eq!(resolve(None), Locale::En);
    }

    #[test]
    fn resolve_uses_session_language() {
        let session = Session {
            username: Some(String::from("alice")),
            lang: Locale::De,
        };
        assert_eq!(resolve(Some(&session)), Locale::De);
    }

    #[test]
    fn every_message_is_translated() {
        let all = [
            Message::FillAllFields,
            Message::UsernameExists,
            Message::InvalidUsername,
            Message::RegistrationSuccessful,
            Message::InvalidCredentials,
            Message::LoggedIn,
            Message::LoggedOut,
            Message::LoginFirst,
            Message::EnterCity,
            Message::CityNotFound,
            Message::WeatherUnavailable,
            Message::NewsUnavailable,
            Message::InvalidCurrency,
            Message::CurrencyUnavailable,
            Message::Internal,
        ];
        for message in all {
            assert!(!message.text(Locale::En).is_empty());
            assert_ne!(message.text(Locale::En), message.text(Locale::De));
        }
    }
}
