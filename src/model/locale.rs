//! Display languages known to the catalog.
//!
//! The site itself is served in four locales (`en`, `es`, `fr`, `de`). Translation rows
//! may additionally carry content-only locales such as `jp`: they can be listed as
//! variants and shown as labels, but the site has no full support for them.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// A display language.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
    De,
    /// Content-only locale (printings sold under a Japanese title).
    Jp,
}

/// Returned when a string is not a known locale code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown locale: {0}")]
pub struct UnknownLocale(pub String);

impl Locale {
    /// Locales with full site support.
    pub const SUPPORTED: [Locale; 4] = [Locale::En, Locale::Es, Locale::Fr, Locale::De];

    /// Every locale a translation row may carry.
    pub const ALL: [Locale; 5] = [Locale::En, Locale::Es, Locale::Fr, Locale::De, Locale::Jp];

    /// The lowercase code used in slugs and storage (`"en"`, `"jp"`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Jp => "jp",
        }
    }

    /// Human readable label in the locale's own language.
    pub fn label(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Es => "Español",
            Locale::Fr => "Français",
            Locale::De => "Deutsch",
            Locale::Jp => "日本語",
        }
    }

    pub fn is_site_supported(self) -> bool {
        !matches!(self, Locale::Jp)
    }

    /// Parses a locale code, ignoring ASCII case.
    pub fn from_code(code: &str) -> Option<Self> {
        Locale::ALL
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(code))
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s.trim()).ok_or_else(|| UnknownLocale(s.to_string()))
    }
}
