//! Protocol header names and response header lookup.

use reqwest::header::HeaderMap;

use crate::dispatch::ResponseEnvelope;

/// Username sent to the auth endpoint.
pub const X_AUTH_USER: &str = "x-auth-user";
/// Password or API key sent to the auth endpoint.
pub const X_AUTH_KEY: &str = "x-auth-key";
pub const X_AUTH_TOKEN: &str = "X-Auth-Token";
pub const X_STORAGE_URL: &str = "X-Storage-Url";
pub const X_CDN_MANAGEMENT_URL: &str = "X-CDN-Management-URL";
pub const X_COPY_FROM: &str = "X-Copy-From";
/// Prefix for user metadata tags on objects.
pub const X_OBJECT_META: &str = "X-Object-Meta-";
/// Listing/HEAD selector; `cdn` restricts to CDN-enabled containers.
pub const X_CONTENT: &str = "X-Content";
/// `search` switches a storage GET into a search request.
pub const X_CONTEXT: &str = "X-Context";
pub const X_CDN_URL: &str = "X-cdn-url";
pub const X_CDN_SSL_URL: &str = "X-cdn-ssl-url";
pub const X_CDN_STREAM_HTTP_URL: &str = "X-cdn-stream-http-url";
pub const X_CDN_STREAM_FLASH_URL: &str = "X-cdn-stream-flash-url";
pub const X_CDN_TTL: &str = "X-TTL";
pub const X_CDN_ENABLED: &str = "X-CDN-Enabled";
pub const ETAG: &str = "Etag";

/// Look up `name` in a response, case-insensitively.
///
/// Only the first value is returned when the server repeats a header.
/// Values that are not visible ASCII are reported as missing.
pub fn get_header<'a>(name: &str, envelope: &'a ResponseEnvelope) -> Option<&'a str> {
    first_value(name, envelope.headers())
}

/// [`get_header`] over a bare header map.
pub fn first_value<'a>(name: &str, headers: &'a HeaderMap) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
