//! Container operations.

use crate::dispatch::RequestBody;
use crate::encoding::{parse_listing, safer_url_encode, validate_name, validate_path_segment};
use crate::errors::Result;
use crate::headers::{X_CDN_ENABLED, X_CDN_TTL};
use crate::object::ObjectFile;
use crate::session::Session;

/// A named container. Holds no connection state; every operation takes
/// the session explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for an object in this container. No request is made.
    pub fn object(&self, name: impl Into<String>) -> ObjectFile {
        ObjectFile::new(self.name.clone(), name)
    }

    /// Encoded path segment for this container, refusing names that URL
    /// parsing would resolve away.
    fn segment(&self) -> Result<String> {
        validate_path_segment(&self.name)?;
        Ok(safer_url_encode(&self.name))
    }

    /// Create the container. The name is validated before any request.
    pub fn create(&self, session: &mut Session) -> Result<()> {
        validate_name(&self.name)?;
        let segment = self.segment()?;
        let params = session.auth_params()?;
        let url = format!("{}/{segment}", session.storage_endpoint()?);
        session.dispatcher().put(&url, params, RequestBody::Empty)?;
        Ok(())
    }

    /// List the objects in this container, in server order.
    pub fn list_objects(&self, session: &mut Session) -> Result<Vec<ObjectFile>> {
        let segment = self.segment()?;
        let params = session.auth_params()?;
        let url = format!("{}/{segment}", session.storage_endpoint()?);
        let response = session.dispatcher().get(&url, params)?;
        Ok(parse_listing(&response.text())
            .into_iter()
            .map(|name| self.object(name))
            .collect())
    }

    /// Delete the container. The server refuses while it still holds
    /// objects; that refusal comes back as an HTTP status error.
    pub fn remove(&self, session: &mut Session) -> Result<()> {
        let segment = self.segment()?;
        let params = session.auth_params()?;
        let url = format!("{}/{segment}", session.storage_endpoint()?);
        session.dispatcher().delete(&url, params)?;
        Ok(())
    }

    /// Enable CDN delivery, optionally with a TTL in seconds.
    pub fn enable_cdn(&self, session: &mut Session, ttl: Option<u32>) -> Result<()> {
        let segment = self.segment()?;
        let mut params = session.auth_params()?;
        if let Some(ttl) = ttl {
            params.insert(X_CDN_TTL.to_string(), ttl.to_string());
        }
        let url = format!("{}/{segment}", session.cdn_endpoint()?);
        session.dispatcher().put(&url, params, RequestBody::Empty)?;
        Ok(())
    }

    /// Change the CDN TTL. Sent as a POST, so the TTL and token travel in
    /// the form body.
    pub fn update_cdn_ttl(&self, session: &mut Session, ttl: u32) -> Result<()> {
        let segment = self.segment()?;
        let mut params = session.auth_params()?;
        params.insert(X_CDN_TTL.to_string(), ttl.to_string());
        let url = format!("{}/{segment}", session.cdn_endpoint()?);
        session.dispatcher().post(&url, params)?;
        Ok(())
    }

    /// Disable CDN delivery (POST with `X-CDN-Enabled=false`).
    pub fn disable_cdn(&self, session: &mut Session) -> Result<()> {
        let segment = self.segment()?;
        let mut params = session.auth_params()?;
        params.insert(X_CDN_ENABLED.to_string(), "false".to_string());
        let url = format!("{}/{segment}", session.cdn_endpoint()?);
        session.dispatcher().post(&url, params)?;
        Ok(())
    }

    /// Purge every CDN-cached object of this container.
    pub fn purge_cdn(&self, session: &mut Session) -> Result<()> {
        let segment = self.segment()?;
        let params = session.auth_params()?;
        let url = format!("{}/{segment}", session.cdn_endpoint()?);
        session.dispatcher().delete(&url, params)?;
        Ok(())
    }
}
