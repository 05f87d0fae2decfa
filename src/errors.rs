//! Client error types.
//!
//! Every failure surfaced by the library is an [`ObjectStorageError`].
//! Nothing is retried internally; callers inspect the variant (or
//! [`ObjectStorageError::status_code`]) and decide what to do.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ObjectStorageError>;

/// Errors raised by the object storage client.
#[derive(Debug, Error)]
pub enum ObjectStorageError {
    /// A container or object name failed client-side validation.
    /// Raised before any request is issued.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The auth endpoint rejected the credentials or omitted an
    /// expected response header.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The request never produced an HTTP response (connect, DNS, TLS).
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote endpoint answered with a non-success status.
    #[error("{method} {url} returned HTTP {status}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// A URL, header name, or header value could not be encoded.
    #[error("cannot encode {value:?}: {message}")]
    Encoding { value: String, message: String },

    /// A local file could not be opened or inspected.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ObjectStorageError {
    /// The remote HTTP status, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ObjectStorageError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 from the remote endpoint.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True for a 401 from a downstream call. The session is not
    /// re-authenticated automatically; see [`crate::session::Session::invalidate`].
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    pub(crate) fn encoding(value: impl Into<String>, message: impl ToString) -> Self {
        ObjectStorageError::Encoding {
            value: value.into(),
            message: message.to_string(),
        }
    }
}
