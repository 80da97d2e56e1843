//! Router configuration.
//!
//! All fields have defaults, so an empty document is a valid configuration:
//! ```toml
//! # answer every request with 503
//! maintenance = false
//! # turn handler panics into 500 responses
//! catch_panics = true
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Answer every request through the maintenance branch.
    pub maintenance: bool,
    /// Route panics raised by middleware and handlers to the error handler
    /// instead of unwinding out of `dispatch`.
    pub catch_panics: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            maintenance: false,
            catch_panics: true,
        }
    }
}

impl RouterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::from_toml_str("").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert!(!config.maintenance);
        assert!(config.catch_panics);
    }

    #[test]
    fn test_parse() {
        let config = RouterConfig::from_toml_str("maintenance = true\ncatch_panics = false").unwrap();
        assert!(config.maintenance);
        assert!(!config.catch_panics);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = RouterConfig::from_toml_str("maintenence = true").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RouterConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
