use crate::autoload::AutoloadError;
use crate::config::ConfigError;
use crate::container::ContainerError;
use thiserror::Error;

/// Stable numeric codes shared by every error in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 100,
    DriverNotFound = 101,
    FileNotFound = 102,
    ClassNotFound = 103,
    ClassOrFileNotFound = 104,
    ConfigNotFound = 105,
    FileTypeNotSupported = 106,
    FileReadError = 107,
    ServiceNotFound = 108,
    InvalidState = 109,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Top-level error type for the dragon-loader library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    #[error("autoload error: {0}")]
    Autoload(#[from] AutoloadError),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Config(e) => e.code(),
            Error::Container(e) => e.code(),
            Error::Autoload(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::Unknown.as_u16(), 100);
        assert_eq!(ErrorCode::DriverNotFound.as_u16(), 101);
        assert_eq!(ErrorCode::ConfigNotFound.as_u16(), 105);
        assert_eq!(ErrorCode::InvalidState.as_u16(), 109);
    }

    #[test]
    fn test_wrapped_error_keeps_code() {
        let err: Error = ConfigError::KeyNotFound("port".into()).into();
        assert_eq!(err.code(), ErrorCode::ConfigNotFound);

        let err: Error = ContainerError::ServiceNotFound("mailer".into()).into();
        assert_eq!(err.code(), ErrorCode::ServiceNotFound);
    }
}
