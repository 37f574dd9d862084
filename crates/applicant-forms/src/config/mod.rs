use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use mime::Mime;

use crate::forms::{
    AttachmentPolicy, FormCatalog, ValidationMode, DEFAULT_MAX_ATTACHMENT_BYTES,
};

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
    pub intake: IntakeConfig,
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
            intake: IntakeConfig::from_env()?,
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

/// Constants consumed by the form engine: attachment rules, validation mode
/// and the closed picklist sets.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub accepted_media_type: Mime,
    pub max_attachment_bytes: u64,
    pub validation_mode: ValidationMode,
    pub catalog: FormCatalog,
    /// Delivered forms whose final view is kept before the oldest is evicted.
    pub delivered_retention: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            accepted_media_type: mime::APPLICATION_PDF,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            validation_mode: ValidationMode::FirstFailure,
            catalog: FormCatalog::default(),
            delivered_retention: 1024,
        }
    }
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let accepted_media_type = match env::var("APP_ATTACHMENT_MEDIA_TYPE") {
            Ok(raw) => raw
                .trim()
                .parse::<Mime>()
                .map_err(|_| ConfigError::InvalidMediaType(raw))?,
            Err(_) => defaults.accepted_media_type,
        };

        let max_attachment_bytes = match env::var("APP_ATTACHMENT_MAX_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidAttachmentLimit)?,
            Err(_) => defaults.max_attachment_bytes,
        };

        let validation_mode = match env::var("APP_VALIDATION_MODE") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "first_failure" | "first" => ValidationMode::FirstFailure,
                "aggregate" | "all" => ValidationMode::Aggregate,
                _ => return Err(ConfigError::InvalidValidationMode(raw)),
            },
            Err(_) => defaults.validation_mode,
        };

        let delivered_retention = match env::var("APP_DELIVERED_RETENTION") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidDeliveredRetention(raw))?,
            Err(_) => defaults.delivered_retention,
        };

        let catalog = FormCatalog {
            companies: option_list("APP_COMPANY_OPTIONS", defaults.catalog.companies)?,
            job_titles: option_list("APP_JOB_TITLES", defaults.catalog.job_titles)?,
            job_tiers: option_list("APP_JOB_TIERS", defaults.catalog.job_tiers)?,
        };

        Ok(Self {
            accepted_media_type,
            max_attachment_bytes,
            validation_mode,
            catalog,
            delivered_retention,
        })
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::new(self.accepted_media_type.clone(), self.max_attachment_bytes)
    }
}

fn option_list(key: &'static str, fallback: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let Ok(raw) = env::var(key) else {
        return Ok(fallback);
    };

    let options: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect();

    if options.is_empty() {
        return Err(ConfigError::EmptyOptionList(key));
    }
    Ok(options)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMediaType(String),
    InvalidAttachmentLimit,
    InvalidValidationMode(String),
    InvalidDeliveredRetention(String),
    EmptyOptionList(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMediaType(value) => {
                write!(f, "APP_ATTACHMENT_MEDIA_TYPE '{value}' is not a media type")
            }
            ConfigError::InvalidAttachmentLimit => {
                write!(f, "APP_ATTACHMENT_MAX_BYTES must be a positive integer")
            }
            ConfigError::InvalidValidationMode(value) => write!(
                f,
                "APP_VALIDATION_MODE '{value}' must be first_failure or aggregate"
            ),
            ConfigError::InvalidDeliveredRetention(value) => write!(
                f,
                "APP_DELIVERED_RETENTION '{value}' must be a non-negative integer"
            ),
            ConfigError::EmptyOptionList(key) => write!(f, "{key} must list at least one option"),
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
