use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::rubric::{EvaluationPolicy, IncompletePolicy, UnknownCodePolicy};

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

/// Top-level configuration for the scoring host.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineSettings,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineSettings::from_env()?,
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

/// Default evaluation policy and template source for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub weight_epsilon: f64,
    pub incomplete: IncompletePolicy,
    pub unknown_codes: UnknownCodePolicy,
    pub template_catalog: Option<PathBuf>,
}

impl EngineSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let weight_epsilon = match env::var("SCORING_WEIGHT_EPSILON") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| EvaluationPolicy::accepts_epsilon(*value))
                .ok_or(ConfigError::InvalidEpsilon(raw))?,
            Err(_) => EvaluationPolicy::DEFAULT_WEIGHT_EPSILON,
        };

        let incomplete = match env::var("SCORING_INCOMPLETE_POLICY") {
            Ok(raw) => IncompletePolicy::parse(&raw).ok_or(ConfigError::InvalidPolicy {
                key: "SCORING_INCOMPLETE_POLICY",
                value: raw,
            })?,
            Err(_) => IncompletePolicy::Lenient,
        };

        let unknown_codes = match env::var("SCORING_UNKNOWN_CODES") {
            Ok(raw) => UnknownCodePolicy::parse(&raw).ok_or(ConfigError::InvalidPolicy {
                key: "SCORING_UNKNOWN_CODES",
                value: raw,
            })?,
            Err(_) => UnknownCodePolicy::Reject,
        };

        let template_catalog = env::var("SCORING_TEMPLATES")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            weight_epsilon,
            incomplete,
            unknown_codes,
            template_catalog,
        })
    }

    pub fn policy(&self) -> EvaluationPolicy {
        EvaluationPolicy {
            incomplete: self.incomplete,
            unknown_codes: self.unknown_codes,
            weight_epsilon: self.weight_epsilon,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let policy = EvaluationPolicy::default();
        Self {
            weight_epsilon: policy.weight_epsilon,
            incomplete: policy.incomplete,
            unknown_codes: policy.unknown_codes,
            template_catalog: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidEpsilon(String),
    InvalidPolicy { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEpsilon(value) => write!(
                f,
                "SCORING_WEIGHT_EPSILON must be a non-negative number (found '{}')",
                value
            ),
            ConfigError::InvalidPolicy { key, value } => {
                write!(f, "{} has unsupported value '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidEpsilon(_)
            | ConfigError::InvalidPolicy { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCORING_WEIGHT_EPSILON",
            "SCORING_INCOMPLETE_POLICY",
            "SCORING_UNKNOWN_CODES",
            "SCORING_TEMPLATES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(config.engine.policy(), EvaluationPolicy::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_scoring_policy_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORING_WEIGHT_EPSILON", "0.05");
        env::set_var("SCORING_INCOMPLETE_POLICY", "Strict");
        env::set_var("SCORING_UNKNOWN_CODES", "warn");
        env::set_var("SCORING_TEMPLATES", "demos/templates.json");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        let policy = config.engine.policy();
        assert_eq!(policy.weight_epsilon, 0.05);
        assert_eq!(policy.incomplete, IncompletePolicy::Strict);
        assert_eq!(policy.unknown_codes, UnknownCodePolicy::Warn);
        assert_eq!(
            config.engine.template_catalog,
            Some(PathBuf::from("demos/templates.json"))
        );
    }

    #[test]
    fn rejects_unknown_policy_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORING_INCOMPLETE_POLICY", "sometimes");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::InvalidPolicy { key, value }) => {
                assert_eq!(key, "SCORING_INCOMPLETE_POLICY");
                assert_eq!(value, "sometimes");
            }
            other => panic!("expected policy error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_epsilon() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORING_WEIGHT_EPSILON", "-0.1");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(result, Err(ConfigError::InvalidEpsilon(_))));
    }
}
