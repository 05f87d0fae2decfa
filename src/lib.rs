//! sl-objectstorage -- blocking client for Swift-compatible object storage.
//!
//! A [`Session`] authenticates against `{base_url}/auth/v1.0` and holds the
//! token plus the storage and CDN management URLs. The [`Account`],
//! [`Container`] and [`ObjectFile`] facades turn account, container, CDN and
//! object operations into requests issued through the session's
//! [`Dispatcher`].
//!
//! ```no_run
//! use sl_objectstorage::{Account, Session};
//!
//! # fn main() -> sl_objectstorage::Result<()> {
//! let session = Session::new(
//!     "https://dal05.objectstorage.softlayer.net",
//!     "account:user",
//!     "api-key",
//! )?;
//! let mut account = Account::new(session)?;
//! for container in account.list_containers()? {
//!     println!("{}", container.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod encoding;
pub mod errors;
pub mod headers;
pub mod metrics;
pub mod object;
pub mod session;

pub use account::{Account, CdnUrls};
pub use container::Container;
pub use dispatch::{Dispatcher, Method, Params, RequestBody, RequestSpec, ResponseEnvelope};
pub use encoding::{is_valid_name, safer_url_encode, SearchQuery};
pub use errors::{ObjectStorageError, Result};
pub use headers::get_header;
pub use object::{ObjectData, ObjectFile};
pub use session::{AuthInfo, Session};
