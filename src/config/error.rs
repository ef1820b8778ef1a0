use std::path::PathBuf;
use thiserror::Error;

use crate::ErrorCode;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file is not configured (missing 'file' setting)")]
    FileNotConfigured,

    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsupported config file type: {0}")]
    UnsupportedFileType(PathBuf),

    #[error("loader driver not found: {0}")]
    UnsupportedDriver(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON config '{path}': {source}")]
    JsonError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse YAML config '{path}': {source}")]
    YamlError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to parse TOML config '{path}': {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse XML config '{path}': {source}")]
    XmlError {
        path: PathBuf,
        source: roxmltree::Error,
    },

    #[error("config file '{0}' does not contain a key/value mapping")]
    NotAMapping(PathBuf),

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::FileNotConfigured | ConfigError::FileNotFound(_) => ErrorCode::FileNotFound,
            ConfigError::UnsupportedFileType(_) => ErrorCode::FileTypeNotSupported,
            ConfigError::UnsupportedDriver(_) => ErrorCode::DriverNotFound,
            ConfigError::KeyNotFound(_) => ErrorCode::ConfigNotFound,
            ConfigError::ReadError { .. }
            | ConfigError::JsonError { .. }
            | ConfigError::YamlError { .. }
            | ConfigError::TomlError { .. }
            | ConfigError::XmlError { .. }
            | ConfigError::NotAMapping(_) => ErrorCode::FileReadError,
            ConfigError::DeserializeError(_) => ErrorCode::Unknown,
        }
    }
}
