//! URL path encoding, name validation, search query strings and listing
//! bodies.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::errors::{ObjectStorageError, Result};

/// Longest container or object name accepted, in characters.
pub const MAX_NAME_LENGTH: usize = 256;

/// Characters left literal by form-style URL encoding. Everything else,
/// including space and `+`, is percent-encoded.
const FORM_URL_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

/// Encode a container or object name for use as a URL path segment.
///
/// Spaces become `%20` (never `+`) and a literal `+` becomes `%2B`.
pub fn safer_url_encode(value: &str) -> String {
    utf8_percent_encode(value, &FORM_URL_ENCODE_SET).to_string()
}

/// Check that `name` can stand as a single URL path segment.
///
/// `.` and `..` are rejected: URL parsing treats them (and their
/// percent-encoded forms) as navigation, so the request would target the
/// parent resource instead of the named one.
pub fn validate_path_segment(name: &str) -> Result<()> {
    let reason = match name {
        "" => "must not be empty",
        "." | ".." => "must not be a dot segment",
        _ => return Ok(()),
    };
    Err(ObjectStorageError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Check that `name` is usable as a container or object name.
pub fn validate_name(name: &str) -> Result<()> {
    validate_path_segment(name)?;
    let reason = if name.chars().count() > MAX_NAME_LENGTH {
        "must be at most 256 characters"
    } else if name.contains('/') {
        "must not contain '/'"
    } else {
        return Ok(());
    };
    Err(ObjectStorageError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// `true` when [`validate_name`] accepts `name`.
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// Split a newline-delimited listing body into names, dropping empty lines.
pub fn parse_listing(body: &str) -> Vec<String> {
    body.split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parameters for a storage search request.
///
/// Only `query` is required; unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    /// Maximum number of results.
    pub limit: Option<u64>,
    /// Offset into the result set.
    pub start: Option<u64>,
    /// Restrict matching to one field.
    pub field: Option<String>,
    /// Result type filter, sent as `type`.
    pub kind: Option<String>,
    /// Response format, e.g. `json`.
    pub format: Option<String>,
    pub marker: Option<String>,
    pub recursive: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Render as `?q=..&limit=..`, in fixed parameter order.
    pub fn to_query_string(&self) -> String {
        let mut params = vec![format!("q={}", safer_url_encode(&self.query))];
        if let Some(limit) = self.limit {
            params.push(format!("limit={limit}"));
        }
        if let Some(start) = self.start {
            params.push(format!("start={start}"));
        }
        if let Some(ref field) = self.field {
            params.push(format!("field={}", safer_url_encode(field)));
        }
        if let Some(ref kind) = self.kind {
            params.push(format!("type={}", safer_url_encode(kind)));
        }
        if let Some(ref format) = self.format {
            params.push(format!("format={}", safer_url_encode(format)));
        }
        if let Some(ref marker) = self.marker {
            params.push(format!("marker={}", safer_url_encode(marker)));
        }
        if self.recursive {
            params.push("recursive=true".to_string());
        }
        format!("?{}", params.join("&"))
    }
}
