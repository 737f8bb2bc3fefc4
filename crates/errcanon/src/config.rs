//! Runtime configuration.
//!
//! Two sources are understood: a properties text (`key=value` lines, `#`
//! comments) and the process environment. Both are read once, when the
//! stack accessor is probed.

use crate::error::{DISABLE_KEY, Error, Result};
use errcanon_log::Level;

/// Environment variable mirroring `disposer.debug`.
pub const DISABLE_ENV: &str = "ERRCANON_DISPOSER_DEBUG";

/// Environment variable holding the log level.
pub const LOG_ENV: &str = "ERRCANON_LOG";

const LOG_KEY: &str = "log.level";

/// Interner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `true` while the compact stack path is allowed. Setting
    /// `disposer.debug=off` clears it, which turns interning into a no-op.
    pub disposer_debug: bool,
    /// Log level to apply at startup, if any.
    pub log_level: Option<Level>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            disposer_debug: true,
            log_level: None,
        }
    }
}

impl Config {
    /// A configuration with the compact path switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Config {
            disposer_debug: false,
            ..Config::default()
        }
    }

    /// Parses a properties text.
    ///
    /// Unknown keys are ignored so the text can be shared with other
    /// components.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for a recognized key with an
    /// unrecognized value.
    ///
    /// # Example
    ///
    /// ```
    /// use errcanon::Config;
    ///
    /// let config = Config::from_properties("# tuning\ndisposer.debug = off\n").unwrap();
    /// assert!(!config.disposer_debug);
    /// ```
    pub fn from_properties(text: &str) -> Result<Self> {
        let mut config = Config::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            config.apply(key.trim(), value.trim())?;
        }
        Ok(config)
    }

    /// Reads `ERRCANON_DISPOSER_DEBUG` and `ERRCANON_LOG`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if either variable holds an
    /// unrecognized value.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        if let Ok(value) = std::env::var(DISABLE_ENV) {
            config.apply(DISABLE_KEY, value.trim())?;
        }
        if let Ok(value) = std::env::var(LOG_ENV) {
            config.apply(LOG_KEY, value.trim())?;
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || Error::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            DISABLE_KEY => {
                self.disposer_debug = parse_switch(value).ok_or_else(invalid)?;
            }
            LOG_KEY => {
                self.log_level = Some(value.parse().map_err(|_| invalid())?);
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "off" | "false" | "0" | "no" => Some(false),
        "on" | "true" | "1" | "yes" => Some(true),
        _ => None,
    }
}
