//! Custom error types for the common library
//!
//! This module defines the errors raised by the session layer that the
//! gateway service maps onto HTTP responses.

use thiserror::Error;

/// Custom error type for session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// The operating system random source could not supply bytes
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(#[source] rand::Error),
}

/// Type alias for Result with SessionError
pub type SessionResult<T> = Result<T, SessionError>;
