use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::analysis::ScoringProfile;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineSettings,
    pub evidence: EvidenceConfig,
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

        let stage_timeout_secs = env::var("APP_STAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidStageTimeout)?;

        let stage_retries = env::var("APP_STAGE_RETRIES")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidStageRetries)?;

        let scoring_profile = match env::var("APP_SCORING_PROFILE") {
            Ok(raw) => raw
                .parse::<ScoringProfile>()
                .map_err(|_| ConfigError::UnknownScoringProfile(raw))?,
            Err(_) => ScoringProfile::Standard,
        };

        let manifest = env::var("APP_EVIDENCE_MANIFEST")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineSettings {
                stage_timeout: Duration::from_secs(stage_timeout_secs),
                stage_retries,
                scoring_profile,
            },
            evidence: EvidenceConfig { manifest },
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the analysis pipeline: external call budget and scoring model.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stage_timeout: Duration,
    pub stage_retries: u32,
    pub scoring_profile: ScoringProfile,
}

/// Where the service's evidence backend reads candidate readings from.
#[derive(Debug, Clone, Default)]
pub struct EvidenceConfig {
    pub manifest: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(30),
            stage_retries: 0,
            scoring_profile: ScoringProfile::Standard,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStageTimeout,
    InvalidStageRetries,
    UnknownScoringProfile(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStageTimeout => {
                write!(f, "APP_STAGE_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidStageRetries => {
                write!(f, "APP_STAGE_RETRIES must be a non-negative integer")
            }
            ConfigError::UnknownScoringProfile(value) => write!(
                f,
                "APP_SCORING_PROFILE '{}' is not one of: standard, legacy",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidStageTimeout
            | ConfigError::InvalidStageRetries
            | ConfigError::UnknownScoringProfile(_) => None,
        }
    }
}
