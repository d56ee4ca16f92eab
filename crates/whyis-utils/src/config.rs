//! Application settings shared by every binary

use serde::{Deserialize, Serialize};

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "whyis".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Read `WHYIS_APP_NAME` and `WHYIS_ENV`, keeping defaults for unset values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            app_name: non_empty_var("WHYIS_APP_NAME").unwrap_or(defaults.app_name),
            environment: non_empty_var("WHYIS_ENV").unwrap_or(defaults.environment),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app_name, "whyis");
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["app_name"], "whyis");
        assert_eq!(json["environment"], "development");
    }
}
