// src/error.rs
//! Error types for the GPS tracker

use std::fmt;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug)]
pub enum GpsError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Config(String),
    Registry(String),
    Other(String),
}

impl fmt::Display for GpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsError::Io(e) => write!(f, "IO error: {}", e),
            GpsError::Serial(e) => write!(f, "Serial error: {}", e),
            GpsError::Json(e) => write!(f, "JSON error: {}", e),
            GpsError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GpsError::Config(msg) => write!(f, "Config error: {}", msg),
            GpsError::Registry(msg) => write!(f, "Custom field error: {}", msg),
            GpsError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpsError::Io(e) => Some(e),
            GpsError::Serial(e) => Some(e),
            GpsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpsError {
    fn from(error: std::io::Error) -> Self {
        GpsError::Io(error)
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(error: tokio_serial::Error) -> Self {
        GpsError::Serial(error)
    }
}

impl From<serde_json::Error> for GpsError {
    fn from(error: serde_json::Error) -> Self {
        GpsError::Json(error)
    }
}

impl From<anyhow::Error> for GpsError {
    fn from(error: anyhow::Error) -> Self {
        GpsError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = GpsError::Registry("registry is full".to_string());
        assert_eq!(err.to_string(), "Custom field error: registry is full");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error;
        let err: GpsError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
