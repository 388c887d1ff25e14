//! Configuration loading and representation.
//!
//! Read from environment variables, falling back to defaults:
//!
//! | variable                    | default  |
//! |-----------------------------|----------|
//! | `GEOPLACES_PROVIDER`        | `memory` |
//! | `GEOPLACES_LOCALE`          | `en`     |
//! | `GEOPLACES_USER`            | unset    |
//! | `GEOPLACES_PASSWORD`        | unset    |
//! | `GEOPLACES_SEED_CATEGORIES` | `true`   |

use serde::Serialize;
use thiserror::Error;

use geoplaces_core::{DomainError, Locale};
use geoplaces_places::Credentials;

use crate::provider::{MEMORY_PROVIDER, ProviderParameters};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("GEOPLACES_LOCALE: {0}")]
    Locale(#[from] DomainError),

    #[error("{key}: expected true or false, got {value:?}")]
    NotABool { key: &'static str, value: String },

    #[error("GEOPLACES_USER and GEOPLACES_PASSWORD must be set together")]
    IncompleteCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacesConfig {
    pub provider: String,
    pub locale: Locale,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
    pub seed_categories: bool,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            provider: MEMORY_PROVIDER.to_string(),
            locale: Locale::english(),
            credentials: None,
            seed_categories: true,
        }
    }
}

impl PlacesConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let provider = get("GEOPLACES_PROVIDER")
            .map(|p| p.trim().to_string())
            .unwrap_or(defaults.provider);

        let locale = match get("GEOPLACES_LOCALE") {
            Some(raw) => raw.parse::<Locale>()?,
            None => defaults.locale,
        };

        let credentials = match (get("GEOPLACES_USER"), get("GEOPLACES_PASSWORD")) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteCredentials),
        };

        let seed_categories = match get("GEOPLACES_SEED_CATEGORIES") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| ConfigError::NotABool {
                key: "GEOPLACES_SEED_CATEGORIES",
                value: raw,
            })?,
            None => defaults.seed_categories,
        };

        Ok(Self {
            provider,
            locale,
            credentials,
            seed_categories,
        })
    }

    /// Parameters for the configured provider's factory.
    pub fn provider_parameters(&self) -> ProviderParameters {
        let mut params = ProviderParameters::new()
            .with("locale", self.locale.name())
            .with("seed_categories", self.seed_categories.to_string());
        if let Some(credentials) = &self.credentials {
            params = params
                .with("user", credentials.user())
                .with("password", credentials.password());
        }
        params
    }
}
