//! Object operations.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::dispatch::{Params, RequestBody};
use crate::encoding::{safer_url_encode, validate_name, validate_path_segment};
use crate::errors::{ObjectStorageError, Result};
use crate::headers::{first_value, ETAG, X_COPY_FROM, X_OBJECT_META};
use crate::session::Session;

/// An object inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    container: String,
    name: String,
}

/// Contents and response headers of a downloaded object.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub bytes: Bytes,
    pub headers: HeaderMap,
}

impl ObjectData {
    /// User metadata tags, keyed by the lower-cased suffix after
    /// `X-Object-Meta-`.
    ///
    /// Values are decoded from the raw header bytes as UTF-8, so non-ASCII
    /// tags accepted at upload come back intact. Invalid sequences are
    /// replaced with U+FFFD rather than dropping the tag. Only the first
    /// value of a repeated header is used.
    pub fn meta_tags(&self) -> BTreeMap<String, String> {
        let prefix = X_OBJECT_META.to_ascii_lowercase();
        let mut tags = BTreeMap::new();
        for name in self.headers.keys() {
            if let Some(key) = name.as_str().strip_prefix(&prefix) {
                if let Some(value) = self.headers.get(name) {
                    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    tags.insert(key.to_string(), value);
                }
            }
        }
        tags
    }

    /// First value of a response header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        first_value(name, &self.headers)
    }
}

impl ObjectFile {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Encoded `container/object` path, refusing names that URL parsing
    /// would resolve away.
    fn path(&self) -> Result<String> {
        encoded_path(&self.container, &self.name)
    }

    /// Upload a local file, streaming it as the request body.
    ///
    /// Each tag is sent as `X-Object-Meta-{key}`. Returns the `Etag` the
    /// server answered with, unchanged.
    pub fn upload_file(
        &self,
        session: &mut Session,
        path: impl AsRef<Path>,
        tags: &BTreeMap<String, String>,
    ) -> Result<Option<String>> {
        validate_name(&self.name)?;
        let object_path = self.path()?;
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ObjectStorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.put_object(session, object_path, RequestBody::File(file), tags)
    }

    /// Upload an in-memory payload. Same contract as [`Self::upload_file`].
    pub fn upload_bytes(
        &self,
        session: &mut Session,
        data: impl Into<Bytes>,
        tags: &BTreeMap<String, String>,
    ) -> Result<Option<String>> {
        validate_name(&self.name)?;
        let object_path = self.path()?;
        self.put_object(session, object_path, RequestBody::Bytes(data.into()), tags)
    }

    fn put_object(
        &self,
        session: &mut Session,
        object_path: String,
        body: RequestBody,
        tags: &BTreeMap<String, String>,
    ) -> Result<Option<String>> {
        let mut params = session.auth_params()?;
        params.extend(meta_params(tags));
        let url = format!("{}/{object_path}", session.storage_endpoint()?);
        let response = session.dispatcher().put(&url, params, body)?;
        Ok(response.header(ETAG).map(str::to_string))
    }

    /// Download the object with its response headers.
    pub fn fetch(&self, session: &mut Session) -> Result<ObjectData> {
        let object_path = self.path()?;
        let params = session.auth_params()?;
        let url = format!("{}/{object_path}", session.storage_endpoint()?);
        let (_, headers, bytes) = session.dispatcher().get(&url, params)?.into_parts();
        Ok(ObjectData { bytes, headers })
    }

    /// Download the object and return only its metadata tags.
    pub fn meta_tags(&self, session: &mut Session) -> Result<BTreeMap<String, String>> {
        Ok(self.fetch(session)?.meta_tags())
    }

    pub fn remove(&self, session: &mut Session) -> Result<()> {
        let object_path = self.path()?;
        let params = session.auth_params()?;
        let url = format!("{}/{object_path}", session.storage_endpoint()?);
        session.dispatcher().delete(&url, params)?;
        Ok(())
    }

    /// Purge this object from the CDN edge caches.
    pub fn purge_cdn(&self, session: &mut Session) -> Result<()> {
        let object_path = self.path()?;
        let params = session.auth_params()?;
        let url = format!("{}/{object_path}", session.cdn_endpoint()?);
        session.dispatcher().delete(&url, params)?;
        Ok(())
    }

    /// Server-side copy of `source_container/source_object` into this object.
    pub fn copy_from(
        &self,
        session: &mut Session,
        source_container: &str,
        source_object: &str,
    ) -> Result<()> {
        let object_path = self.path()?;
        let source_path = encoded_path(source_container, source_object)?;
        let mut params = session.auth_params()?;
        params.insert(X_COPY_FROM.to_string(), source_path);
        let url = format!("{}/{object_path}", session.storage_endpoint()?);
        session.dispatcher().put(&url, params, RequestBody::Empty)?;
        Ok(())
    }
}

fn encoded_path(container: &str, object: &str) -> Result<String> {
    validate_path_segment(container)?;
    validate_path_segment(object)?;
    Ok(format!(
        "{}/{}",
        safer_url_encode(container),
        safer_url_encode(object)
    ))
}

fn meta_params(tags: &BTreeMap<String, String>) -> Params {
    tags.iter()
        .map(|(key, value)| (format!("{X_OBJECT_META}{key}"), value.clone()))
        .collect()
}
