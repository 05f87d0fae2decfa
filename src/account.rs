//! Account-level operations: container listings, CDN URLs and search.

use crate::container::Container;
use crate::encoding::{parse_listing, SearchQuery};
use crate::errors::Result;
use crate::headers::{
    X_CDN_SSL_URL, X_CDN_STREAM_FLASH_URL, X_CDN_STREAM_HTTP_URL, X_CDN_URL, X_CONTENT, X_CONTEXT,
};
use crate::session::Session;

/// CDN base URLs published for the account. A URL the server did not send
/// is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnUrls {
    pub http: Option<String>,
    pub ssl: Option<String>,
    pub stream_http: Option<String>,
    pub stream_flash: Option<String>,
}

/// An authenticated account. Owns its [`Session`].
#[derive(Debug)]
pub struct Account {
    session: Session,
}

impl Account {
    /// Wrap `session`, authenticating immediately if it holds no token.
    pub fn new(mut session: Session) -> Result<Self> {
        session.ensure_authenticated()?;
        Ok(Self { session })
    }

    /// Connect with explicit credentials and a default dispatcher.
    pub fn connect(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::new(Session::new(base_url, username, password)?)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Handle for a container. No request is made.
    pub fn container(&self, name: impl Into<String>) -> Container {
        Container::new(name)
    }

    /// Every container on the account, in server order.
    pub fn list_containers(&mut self) -> Result<Vec<Container>> {
        self.fetch_container_listing(false)
    }

    /// Only the CDN-enabled containers.
    pub fn list_cdn_containers(&mut self) -> Result<Vec<Container>> {
        self.fetch_container_listing(true)
    }

    fn fetch_container_listing(&mut self, cdn_only: bool) -> Result<Vec<Container>> {
        let mut params = self.session.auth_params()?;
        if cdn_only {
            params.insert(X_CONTENT.to_string(), "cdn".to_string());
        }
        let url = self.session.storage_endpoint()?.to_string();
        let response = self.session.dispatcher().get(&url, params)?;
        Ok(parse_listing(&response.text())
            .into_iter()
            .map(Container::new)
            .collect())
    }

    /// Read the account's CDN base URLs from a HEAD on the storage URL.
    pub fn cdn_urls(&mut self) -> Result<CdnUrls> {
        let mut params = self.session.auth_params()?;
        params.insert(X_CONTENT.to_string(), "cdn".to_string());
        let url = self.session.storage_endpoint()?.to_string();
        let response = self.session.dispatcher().head(&url, params)?;
        let read = |name: &str| response.header(name).map(str::to_string);
        Ok(CdnUrls {
            http: read(X_CDN_URL),
            ssl: read(X_CDN_SSL_URL),
            stream_http: read(X_CDN_STREAM_HTTP_URL),
            stream_flash: read(X_CDN_STREAM_FLASH_URL),
        })
    }

    /// Run a search and return the raw response body.
    pub fn search(&mut self, query: &SearchQuery) -> Result<String> {
        let mut params = self.session.auth_params()?;
        params.insert(X_CONTEXT.to_string(), "search".to_string());
        let url = format!(
            "{}{}",
            self.session.storage_endpoint()?,
            query.to_query_string()
        );
        let response = self.session.dispatcher().get(&url, params)?;
        Ok(response.text())
    }
}
