//! Runtime configuration.
//!
//! Every field can be set by flag or environment variable; the defaults are the
//! production cadences.

use crate::live::Visibility;
use crate::model::Locale;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Background poll interval ({background}s) is shorter than the foreground one ({foreground}s)")]
    BackgroundFaster { foreground: u64, background: u64 },

    #[error("Default locale {0} has no site support")]
    UnsupportedLocale(Locale),
}

#[derive(Debug, Clone, Args)]
pub struct CatalogConfig {
    /// Live price/stock poll interval while the storefront is visible.
    #[arg(long, env = "CATALOG_POLL_FOREGROUND_SECS", default_value_t = 15)]
    pub poll_foreground_secs: u64,

    /// Live price/stock poll interval while the storefront is hidden.
    #[arg(long, env = "CATALOG_POLL_BACKGROUND_SECS", default_value_t = 30)]
    pub poll_background_secs: u64,

    /// Quiet period before cart edits are persisted.
    #[arg(long, env = "CATALOG_CART_DEBOUNCE_MS", default_value_t = 1000)]
    pub cart_debounce_ms: u64,

    #[arg(long, env = "CATALOG_DEFAULT_LOCALE", default_value_t = Locale::En)]
    pub default_locale: Locale,

    /// Fixed seed for recommendations. Random when unset.
    #[arg(long, env = "CATALOG_RECOMMENDATION_SEED")]
    pub recommendation_seed: Option<u64>,

    /// Persist carts as JSON files here instead of in memory.
    #[arg(long, env = "CATALOG_CART_DIR")]
    pub cart_dir: Option<PathBuf>,

    /// Mailbox size of the storage actor and the synchronizer.
    #[arg(long, env = "CATALOG_ACTOR_BUFFER", default_value_t = 32)]
    pub actor_buffer: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            poll_foreground_secs: 15,
            poll_background_secs: 30,
            cart_debounce_ms: 1000,
            default_locale: Locale::En,
            recommendation_seed: None,
            cart_dir: None,
            actor_buffer: 32,
        }
    }
}

impl CatalogConfig {
    pub fn poll_interval(&self, visibility: Visibility) -> Duration {
        match visibility {
            Visibility::Foreground => Duration::from_secs(self.poll_foreground_secs),
            Visibility::Background => Duration::from_secs(self.poll_background_secs),
        }
    }

    pub fn cart_debounce(&self) -> Duration {
        Duration::from_millis(self.cart_debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_foreground_secs == 0 {
            return Err(ConfigError::Zero("poll_foreground_secs"));
        }
        if self.poll_background_secs == 0 {
            return Err(ConfigError::Zero("poll_background_secs"));
        }
        if self.actor_buffer == 0 {
            return Err(ConfigError::Zero("actor_buffer"));
        }
        if self.poll_background_secs < self.poll_foreground_secs {
            return Err(ConfigError::BackgroundFaster {
                foreground: self.poll_foreground_secs,
                background: self.poll_background_secs,
            });
        }
        if !self.default_locale.is_site_supported() {
            return Err(ConfigError::UnsupportedLocale(self.default_locale));
        }
        Ok(())
    }
}
