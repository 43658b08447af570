//! Error types for Namespace Gateway

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type NsgResult<T> = Result<T, NsgError>;

/// Main error type
#[derive(Error, Debug)]
pub enum NsgError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Path exists with a different kind: {0}")]
    PathConflict(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Remote I/O error: {0}")]
    RemoteIo(String),

    #[error("Local I/O error: {0}")]
    LocalIo(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error classes reported to callers of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    RemoteIo,
    LocalIo,
}

impl ErrorKind {
    /// Status code for a transport that distinguishes failure classes
    pub fn strict_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RemoteIo => 502,
            ErrorKind::LocalIo => 500,
        }
    }

    /// Status code for a transport that reports every failure as a bad request
    pub fn uniform_status(&self) -> u16 {
        400
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RemoteIo => "remote I/O error",
            ErrorKind::LocalIo => "local I/O error",
        };
        f.write_str(s)
    }
}

impl NsgError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NsgError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            NsgError::NotFound(_) => ErrorKind::NotFound,
            NsgError::NotADirectory(_) | NsgError::PathConflict(_) | NsgError::NotEmpty(_) => {
                ErrorKind::Conflict
            }
            NsgError::RemoteIo(_) => ErrorKind::RemoteIo,
            NsgError::LocalIo(_) | NsgError::Config(_) => ErrorKind::LocalIo,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NsgError::NotFound(_))
    }

    /// Build a `RemoteIo` error from anything printable
    pub fn remote(err: impl fmt::Display) -> Self {
        NsgError::RemoteIo(err.to_string())
    }
}
