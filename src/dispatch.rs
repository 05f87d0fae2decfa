//! Request dispatcher.
//!
//! Turns a method, a set of logical parameters and a target URL into one
//! blocking HTTP exchange. How the parameters travel depends on the method,
//! which is a quirk of the wrapped API rather than a general form/header
//! choice:
//!
//! | Method              | params                          | body                      |
//! |---------------------|---------------------------------|---------------------------|
//! | POST                | `x-www-form-urlencoded` body    | the form                  |
//! | PUT                 | one request header per param    | optional payload          |
//! | GET / HEAD / DELETE | one request header per param    | none                      |
//!
//! This is why the auth call's `x-auth-user`/`x-auth-key` parameters arrive
//! as headers: authentication is a GET.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use reqwest::blocking::{Body, Client, Request};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Url};
use tracing::{debug, warn};

use crate::config::EndpointConfig;
use crate::errors::{ObjectStorageError, Result};
use crate::headers::first_value;
use crate::metrics;

/// Logical request parameters, keyed by the name sent on the wire.
pub type Params = BTreeMap<String, String>;

/// HTTP methods used by the storage API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Head => reqwest::Method::HEAD,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload attached to a PUT.
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No payload; sent as a zero-length body.
    #[default]
    Empty,
    Bytes(Bytes),
    /// Streamed from disk. The handle is closed when the request is dropped.
    File(File),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    fn into_body(self) -> Body {
        match self {
            RequestBody::Empty => Body::from(Vec::new()),
            RequestBody::Bytes(bytes) => Body::from(bytes),
            RequestBody::File(file) => Body::from(file),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

impl From<File> for RequestBody {
    fn from(file: File) -> Self {
        RequestBody::File(file)
    }
}

/// One request, built fresh per call and consumed when issued.
#[derive(Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub params: Params,
    pub body: RequestBody,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Params::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }
}

/// Normalized response: status, headers and the fully read body.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseEnvelope {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First value of `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        first_value(name, &self.headers)
    }

    pub fn into_parts(self) -> (u16, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

/// Blocking HTTP dispatcher shared by every call made through a session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
}

impl Dispatcher {
    /// Dispatcher trusting the platform's default roots.
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Dispatcher whose `https` targets are verified only against the PEM
    /// certificates in `path`.
    pub fn with_ca_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| ObjectStorageError::InvalidConfig {
            message: format!("cannot read CA bundle {}: {e}", path.display()),
        })?;
        let certs =
            Certificate::from_pem_bundle(&pem).map_err(|e| ObjectStorageError::InvalidConfig {
                message: format!("cannot parse CA bundle {}: {e}", path.display()),
            })?;
        if certs.is_empty() {
            return Err(ObjectStorageError::InvalidConfig {
                message: format!("CA bundle {} contains no certificates", path.display()),
            });
        }
        Self::build(Some(certs))
    }

    pub fn from_config(endpoint: &EndpointConfig) -> Result<Self> {
        match endpoint.ca_bundle {
            Some(ref path) => Self::with_ca_bundle(path),
            None => Self::new(),
        }
    }

    fn build(trust: Option<Vec<Certificate>>) -> Result<Self> {
        let mut builder = Client::builder().http1_title_case_headers();
        if let Some(certs) = trust {
            builder = builder.tls_built_in_root_certs(false);
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        let client = builder
            .build()
            .map_err(|e| ObjectStorageError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Build the wire request for `spec` without sending it.
    pub fn build_request(&self, spec: RequestSpec) -> Result<Request> {
        let RequestSpec {
            method,
            url,
            params,
            body,
        } = spec;
        let target = Url::parse(&url).map_err(|e| ObjectStorageError::encoding(url.clone(), e))?;
        let mut builder = self.client.request(method.to_reqwest(), target);

        match method {
            Method::Post => {
                if !body.is_empty() {
                    warn!("{} {}: payload replaced by form parameters", method, url);
                }
                builder = builder.form(&params);
            }
            Method::Put => {
                builder = builder.headers(param_headers(&params)?).body(body.into_body());
            }
            Method::Get | Method::Head | Method::Delete => {
                if !body.is_empty() {
                    warn!("{} {}: payload discarded", method, url);
                }
                builder = builder.headers(param_headers(&params)?);
            }
        }

        builder
            .build()
            .map_err(|source| ObjectStorageError::Transport { url, source })
    }

    /// Send `spec` and wait for the response.
    ///
    /// Non-2xx statuses become [`ObjectStorageError::HttpStatus`]. Nothing
    /// is retried.
    pub fn dispatch(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        let method = spec.method;
        let url = spec.url.clone();
        let request = self.build_request(spec)?;

        debug!("dispatching {} {}", method, url);
        let start = Instant::now();
        let response = match self.client.execute(request) {
            Ok(response) => response,
            Err(source) => {
                metrics::record_request(method.as_str(), None, start.elapsed());
                return Err(ObjectStorageError::Transport { url, source });
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|source| ObjectStorageError::Transport {
                url: url.clone(),
                source,
            })?;
        metrics::record_request(method.as_str(), Some(status), start.elapsed());
        debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());

        if !(200..300).contains(&status) {
            return Err(ObjectStorageError::HttpStatus {
                method: method.as_str(),
                url,
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(ResponseEnvelope::new(status, headers, body))
    }

    pub fn get(&self, url: &str, params: Params) -> Result<ResponseEnvelope> {
        self.dispatch(RequestSpec::new(Method::Get, url).params(params))
    }

    pub fn head(&self, url: &str, params: Params) -> Result<ResponseEnvelope> {
        self.dispatch(RequestSpec::new(Method::Head, url).params(params))
    }

    pub fn delete(&self, url: &str, params: Params) -> Result<ResponseEnvelope> {
        self.dispatch(RequestSpec::new(Method::Delete, url).params(params))
    }

    pub fn put(
        &self,
        url: &str,
        params: Params,
        body: impl Into<RequestBody>,
    ) -> Result<ResponseEnvelope> {
        self.dispatch(RequestSpec::new(Method::Put, url).params(params).body(body))
    }

    pub fn post(&self, url: &str, params: Params) -> Result<ResponseEnvelope> {
        self.dispatch(RequestSpec::new(Method::Post, url).params(params))
    }
}

/// One header per parameter. Errors name the header, never the value,
/// since values include credentials.
fn param_headers(params: &Params) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(params.len());
    for (name, value) in params {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ObjectStorageError::encoding(name.clone(), e))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ObjectStorageError::encoding(name.clone(), format!("invalid header value: {e}"))
        })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
