use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::warn;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Remote service connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            api: ApiConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(anyhow!("API_BASE_URL must start with 'http://' or 'https://'"));
        }

        if self.api.base_url.ends_with('/') {
            return Err(anyhow!("API_BASE_URL must not end with '/'"));
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow!("API timeout must be greater than 0"));
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.logging.level.to_lowercase().as_str())
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        let base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let timeout_str = env::var("API_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let timeout_secs = timeout_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid API_TIMEOUT_SECS value: '{}'. Must be a number", timeout_str))?;

        Ok(ApiConfig { base_url, timeout_secs })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level =
            env::var("RUST_LOG").unwrap_or_else(|_| "info,numeracy_client=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_api_config_defaults() {
        // Clear environment variables to test defaults
        unsafe {
            env::remove_var("API_BASE_URL");
            env::remove_var("API_TIMEOUT_SECS");
        }

        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            api: ApiConfig {
                base_url: "https://api.example.com".to_string(),
                timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        };

        assert!(config.validate().is_ok());

        // Scheme-less URLs are rejected
        let mut invalid_config = config.clone();
        invalid_config.api.base_url = "api.example.com".to_string();
        assert!(invalid_config.validate().is_err());

        // Trailing slash would double up when joining paths
        let mut invalid_config = config.clone();
        invalid_config.api.base_url = "https://api.example.com/".to_string();
        assert!(invalid_config.validate().is_err());

        // Zero timeout is rejected
        let mut invalid_config = config.clone();
        invalid_config.api.timeout_secs = 0;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_invalid_timeout_parsing() {
        unsafe { env::set_var("API_TIMEOUT_SECS", "not-a-number"); }
        let result = ApiConfig::from_env();
        assert!(result.is_err());

        unsafe { env::remove_var("API_TIMEOUT_SECS"); }
    }
}
