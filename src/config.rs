use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::logger::LoggerConfig;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_CONFIG_PATH: &str = "config/spor.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub http_port: u16,
    pub environment: Environment,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logger: LoggerConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.http_port == 0 {
            return Err("http_port must not be 0".to_string());
        }
        self.logger.validate().map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Loads settings from the TOML file named by `SPOR_CONFIG` (default
/// `config/spor.toml`), falling back to defaults when the file is
/// absent, then applies environment overrides:
///
/// - `HTTP_PORT` overrides `server.http_port`
/// - `APP_ENV` overrides `server.environment`
/// - `LOG_LEVEL` overrides `logger.threshold`
pub fn get_configuration() -> Result<Settings, AppError> {
    let path = std::env::var("SPOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut settings = load_settings(Path::new(&path))?;
    apply_env_overrides(&mut settings)?;
    settings.validate().map_err(AppError::Config)?;
    Ok(settings)
}

fn load_settings(path: &Path) -> Result<Settings, AppError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| AppError::Config(format!("parse {}: {e}", path.display())))
}

fn apply_env_overrides(settings: &mut Settings) -> Result<(), AppError> {
    if let Ok(port) = std::env::var("HTTP_PORT") {
        settings.server.http_port = port
            .parse()
            .map_err(|_| AppError::Config(format!("invalid HTTP_PORT: {port}")))?;
    }
    if let Ok(environment) = std::env::var("APP_ENV") {
        settings.server.environment = environment.parse().map_err(AppError::Config)?;
    }
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        settings.logger.threshold = level
            .parse()
            .map_err(|_| AppError::Config(format!("invalid LOG_LEVEL: {level}")))?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
