//! Stable error-kind enumeration surfaced to wire handlers.
//!
//! `color_eyre::Report` is used for the top-level plumbing (startup,
//! socket bind, database open) where a human just needs the whole
//! chain of causes. Everything a command handler can fail with is a
//! `CoreError` instead, so the dispatcher can match on the kind and
//! pick a response opcode without downcasting.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("cooldown active, wait {0}s")]
    CooldownActive(u64),

    #[error("rate limited, wait {0}s")]
    RateLimited(u64),

    #[error("busy: {0}")]
    Busy(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Fatal(String),

    #[error("operation not supported in filesystem-only mode")]
    Unsupported,
}

impl CoreError {
    /// Short human-readable diagnostic suitable for a chat console,
    /// per spec §7 "Error responses carry a short textual diagnostic".
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Transient(e.to_string())
    }
}

impl From<r2d2::Error> for CoreError {
    fn from(e: r2d2::Error) -> Self {
        CoreError::Transient(e.to_string())
    }
}
