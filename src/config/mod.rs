use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::issuance::WorkflowPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub issuance: IssuanceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_generation_attempts = env::var("APP_SSN_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidAttemptCap)?;
        let allow_resubmission = match env::var("APP_ALLOW_RESUBMISSION")
            .unwrap_or_else(|_| "true".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => return Err(ConfigError::InvalidResubmissionFlag),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            issuance: IssuanceConfig {
                max_generation_attempts,
                allow_resubmission_after_rejection: allow_resubmission,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Review-policy settings surfaced through the environment.
#[derive(Debug, Clone, Copy)]
pub struct IssuanceConfig {
    pub max_generation_attempts: u32,
    pub allow_resubmission_after_rejection: bool,
}

impl IssuanceConfig {
    pub fn policy(&self) -> WorkflowPolicy {
        WorkflowPolicy {
            allow_resubmission_after_rejection: self.allow_resubmission_after_rejection,
            max_generation_attempts: self.max_generation_attempts,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAttemptCap,
    InvalidResubmissionFlag,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAttemptCap => {
                write!(f, "APP_SSN_MAX_ATTEMPTS must be a positive integer")
            }
            ConfigError::InvalidResubmissionFlag => {
                write!(f, "APP_ALLOW_RESUBMISSION must be true or false")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_labels_normalize() {
        assert_eq!(AppEnvironment::from_str("PROD"), AppEnvironment::Production);
        assert_eq!(AppEnvironment::from_str("ci"), AppEnvironment::Test);
        assert_eq!(
            AppEnvironment::from_str("anything-else"),
            AppEnvironment::Development
        );
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
        };
        let addr = config.socket_addr().expect("resolves");
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn issuance_config_maps_to_policy() {
        let config = IssuanceConfig {
            max_generation_attempts: 25,
            allow_resubmission_after_rejection: false,
        };
        let policy = config.policy();
        assert_eq!(policy.max_generation_attempts, 25);
        assert!(!policy.allow_resubmission_after_rejection);
    }
}
