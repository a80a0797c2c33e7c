//! The error taxonomy shared by both service clients.
//!
//! A request either succeeds, or fails with exactly one of the [`ErrorKind`]s.
//! Nothing in this crate retries, and nothing terminates the host process.

use std::collections::TryReserveError;

use thiserror::Error;

/// A specialized [`Result`](std::result::Result) type for requests made by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error returned by every request of [`crate::nekos`] and [`crate::otaku`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// The response buffer could not grow to hold the next chunk.
    #[error("Failed to allocate memory for the response body: {0}")]
    Memory(#[from] TryReserveError),
    /// Any failure of the HTTP layer: DNS, TLS, connect, redirect or body read.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The body is not valid JSON, or does not have the shape the endpoint promises.
    #[error("Failed to parse the response body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The discriminant of [`Error`], without the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Memory`].
    Memory,
    /// See [`Error::Transport`].
    Transport,
    /// See [`Error::Parse`].
    Parse,
}

impl ErrorKind {
    /// A stable numeric status for this kind, `0` being reserved for success.
    pub const fn code(self) -> u8 {
        match self {
            ErrorKind::Memory => 1,
            ErrorKind::Transport => 2,
            ErrorKind::Parse => 3,
        }
    }
}

impl Error {
    /// Which of the failure kinds this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Memory(_) => ErrorKind::Memory,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Parse(_) => ErrorKind::Parse,
        }
    }
}
