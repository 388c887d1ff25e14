//! Locale hint passed to engines.
//!
//! The locale only tells an engine which language place details should be
//! returned in; it carries no formatting rules.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A language (and optional territory) tag such as `en`, `en-US` or `fi_FI`.
///
/// The special tag `C` denotes "no preference".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    territory: Option<String>,
}

impl Locale {
    /// The neutral locale (`C`).
    pub fn c() -> Self {
        Self {
            language: "C".to_string(),
            territory: None,
        }
    }

    /// Plain English without a territory.
    pub fn english() -> Self {
        Self {
            language: "en".to_string(),
            territory: None,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn territory(&self) -> Option<&str> {
        self.territory.as_deref()
    }

    pub fn is_c(&self) -> bool {
        self.language == "C"
    }

    /// Canonical name, using `_` between language and territory.
    pub fn name(&self) -> String {
        match &self.territory {
            Some(t) => format!("{}_{}", self.language, t),
            None => self.language.clone(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::c()
    }
}

impl core::fmt::Display for Locale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "C" || s == "POSIX" {
            return Ok(Self::c());
        }

        let mut parts = s.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::invalid_locale(format!("bad language in '{s}'")));
        }

        let territory = match parts.next() {
            None => None,
            Some(t)
                if (t.len() == 2 && t.chars().all(|c| c.is_ascii_alphabetic()))
                    || (t.len() == 3 && t.chars().all(|c| c.is_ascii_digit())) =>
            {
                Some(t.to_ascii_uppercase())
            }
            Some(_) => {
                return Err(DomainError::invalid_locale(format!("bad territory in '{s}'")));
            }
        };

        if parts.next().is_some() {
            return Err(DomainError::invalid_locale(format!("unexpected subtags in '{s}'")));
        }

        Ok(Self {
            language: language.to_ascii_lowercase(),
            territory,
        })
    }
}

impl TryFrom<String> for Locale {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.name()
    }
}
