//! Authenticated session.
//!
//! A [`Session`] holds the account credentials, the bearer token and the two
//! endpoint URLs discovered at authentication time. It authenticates lazily:
//! the first call that needs a token triggers [`Session::authenticate`], and
//! the token is then reused for the lifetime of the session.
//!
//! Token expiry is never detected. A 401 from a downstream call is returned
//! to the caller as-is; call [`Session::invalidate`] and retry to force a
//! fresh token.
//!
//! Mutating methods take `&mut self`. To share one session across threads,
//! wrap it in a `Mutex`, which also serialises re-authentication.

use std::fmt;

use tracing::{debug, info};

use crate::config::Config;
use crate::dispatch::{Dispatcher, Params};
use crate::errors::{ObjectStorageError, Result};
use crate::headers::{
    get_header, X_AUTH_KEY, X_AUTH_TOKEN, X_AUTH_USER, X_CDN_MANAGEMENT_URL, X_STORAGE_URL,
};
use crate::metrics;

/// Path of the auth endpoint, relative to the base URL.
pub const AUTH_PATH: &str = "/auth/v1.0";

/// Values obtained from a successful authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub token: String,
    pub storage_url: String,
    pub cdn_url: String,
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("token", &"<redacted>")
            .field("storage_url", &self.storage_url)
            .field("cdn_url", &self.cdn_url)
            .finish()
    }
}

/// Credentials plus the state obtained from the auth endpoint.
pub struct Session {
    username: String,
    password: String,
    base_url: String,
    auth_url: String,
    auth: Option<AuthInfo>,
    dispatcher: Dispatcher,
}

impl Session {
    /// Create an unauthenticated session using a default dispatcher.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::with_dispatcher(
            base_url,
            username,
            password,
            Dispatcher::new()?,
        ))
    }

    pub fn with_dispatcher(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        dispatcher: Dispatcher,
    ) -> Self {
        let base_url = base_url.into();
        let auth_url = format!("{base_url}{AUTH_PATH}");
        Self {
            username: username.into(),
            password: password.into(),
            base_url,
            auth_url,
            auth: None,
            dispatcher,
        }
    }

    /// Build a session from configuration, honouring the CA bundle.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(&config.endpoint)?;
        Ok(Self::with_dispatcher(
            config.endpoint.base_url.clone(),
            config.auth.username.clone(),
            config.auth.api_key.clone(),
            dispatcher,
        ))
    }

    /// Call the auth endpoint and store the token and endpoint URLs.
    ///
    /// The credentials travel as `x-auth-user`/`x-auth-key` headers on a
    /// GET. On failure the session keeps whatever state it had before.
    pub fn authenticate(&mut self) -> Result<AuthInfo> {
        let mut params = Params::new();
        params.insert(X_AUTH_USER.to_string(), self.username.clone());
        params.insert(X_AUTH_KEY.to_string(), self.password.clone());

        let result = self.request_auth(params);
        metrics::record_authentication(result.is_ok());
        let auth = result?;

        info!(
            "authenticated {} against {}: storage={}",
            self.username, self.auth_url, auth.storage_url
        );
        self.auth = Some(auth.clone());
        Ok(auth)
    }

    fn request_auth(&self, params: Params) -> Result<AuthInfo> {
        let response = self
            .dispatcher
            .get(&self.auth_url, params)
            .map_err(|e| match e {
                ObjectStorageError::HttpStatus { status, .. } => {
                    ObjectStorageError::Authentication {
                        message: format!("{} returned HTTP {status}", self.auth_url),
                    }
                }
                other => other,
            })?;

        let required = |name: &str| -> Result<String> {
            match get_header(name, &response) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(ObjectStorageError::Authentication {
                    message: format!("auth response is missing the {name} header"),
                }),
            }
        };

        Ok(AuthInfo {
            token: required(X_AUTH_TOKEN)?,
            storage_url: required(X_STORAGE_URL)?,
            cdn_url: required(X_CDN_MANAGEMENT_URL)?,
        })
    }

    /// Authenticate only if no token is held.
    pub fn ensure_authenticated(&mut self) -> Result<()> {
        if self.auth.is_none() {
            debug!("no token held for {}, authenticating", self.username);
            self.authenticate()?;
        }
        Ok(())
    }

    /// Fresh parameter map carrying `X-Auth-Token`, authenticating first if
    /// needed. Callers add their own parameters to it.
    pub fn auth_params(&mut self) -> Result<Params> {
        self.ensure_authenticated()?;
        let mut params = Params::new();
        params.insert(X_AUTH_TOKEN.to_string(), self.require_auth()?.token.clone());
        Ok(params)
    }

    /// Drop the token and endpoint URLs; the next call re-authenticates.
    pub fn invalidate(&mut self) {
        self.auth = None;
    }

    fn require_auth(&self) -> Result<&AuthInfo> {
        self.auth
            .as_ref()
            .ok_or_else(|| ObjectStorageError::Authentication {
                message: "session is not authenticated".to_string(),
            })
    }

    /// Storage URL, or an error when the session is not authenticated.
    pub(crate) fn storage_endpoint(&self) -> Result<&str> {
        Ok(self.require_auth()?.storage_url.as_str())
    }

    /// CDN management URL, or an error when the session is not authenticated.
    pub(crate) fn cdn_endpoint(&self) -> Result<&str> {
        Ok(self.require_auth()?.cdn_url.as_str())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.token.as_str())
    }

    pub fn storage_url(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.storage_url.as_str())
    }

    pub fn cdn_url(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.cdn_url.as_str())
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish()
    }
}
