//! The capability interface every storage backend implements.
//!
//! The core never talks to a concrete backend SDK; it sees exactly this
//! contract. A backend adapter (object store, NFS export, SFTP server, token
//! cloud drive) maps these calls onto its native client and nothing else in
//! the crate changes.
//!
//! Absence is a value here, never an error: `stat_*` return `Ok(None)`,
//! `open_read` returns `Ok(None)`, `delete_object` reports whether the key
//! existed. Only genuine transport/service failures surface as
//! [`BackendError`], and the core never retries them.

use std::error::Error as StdError;
use std::io::{Read, Write};
use std::time::SystemTime;

use thiserror::Error;

/// Immutable metadata snapshot for one backend object.
///
/// Replaced wholesale on every successful attach; never mutated in place
/// while cached on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_length: u64,
    pub last_modified: SystemTime,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

impl ObjectMeta {
    /// Zero-length metadata stamped with the current time, used for nodes
    /// that do not exist at the backend yet.
    pub fn synthesized() -> Self {
        ObjectMeta {
            content_length: 0,
            last_modified: SystemTime::now(),
            content_type: None,
            etag: None,
        }
    }
}

/// One object row from a listing page.
#[derive(Debug, Clone)]
pub struct Summary {
    pub key: String,
    pub size: u64,
    pub last_modified: SystemTime,
    pub etag: Option<String>,
}

/// One page of a flat listing under a prefix.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Next-level groupings under the prefix, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    /// Object summaries in backend order.
    pub summaries: Vec<Summary>,
    /// Continuation token; `None` when the listing is exhausted.
    pub next_token: Option<String>,
}

/// Transport, authentication, or service failure reported by a backend.
///
/// Carries the operation and key so the caller can diagnose without the core
/// retrying anything on its behalf.
#[derive(Error, Debug)]
#[error("backend {op} failed for key '{key}': {source}")]
pub struct BackendError {
    pub op: &'static str,
    pub key: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl BackendError {
    pub fn new(
        op: &'static str,
        key: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        BackendError {
            op,
            key: key.into(),
            source: source.into(),
        }
    }
}

/// Owner identity attached to a native ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeOwner {
    pub id: String,
    pub display_name: Option<String>,
}

/// Well-known grantee groups of the native permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeGroup {
    AllUsers,
    AuthenticatedUsers,
    LogDelivery,
}

/// Grantee of one native grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeGrantee {
    Group(NativeGroup),
    /// An individual identity addressed by its canonical id.
    Canonical { id: String },
}

/// Native permission levels, including the ACL-management levels the generic
/// model cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePermission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

/// One native grant: a permission level handed to a grantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeGrant {
    pub grantee: NativeGrantee,
    pub permission: NativePermission,
}

/// Native access control list as the backend reports and accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAcl {
    pub owner: NativeOwner,
    pub grants: Vec<NativeGrant>,
}

/// The narrow interface the core requires from a concrete backend adapter.
///
/// Calls are synchronous and blocking; implementations must be shareable
/// across threads (`Send + Sync`), and the core shares one instance behind an
/// `Arc` across every node of a tree. The empty key addresses the container
/// itself (bucket root): `get_acl("")`/`set_acl("", ..)` operate on
/// container-level grants.
pub trait Backend: Send + Sync {
    /// Metadata for the exact key, `Ok(None)` when no such object exists.
    fn stat_object(&self, key: &str) -> Result<Option<ObjectMeta>, BackendError>;

    /// Metadata for the folder marker `key + "/"`, `Ok(None)` when absent.
    fn stat_folder_marker(&self, key: &str) -> Result<Option<ObjectMeta>, BackendError>;

    /// Forward-only content stream starting at `offset`. `Ok(None)` when the
    /// object does not exist.
    fn open_read(
        &self,
        key: &str,
        offset: u64,
    ) -> Result<Option<Box<dyn Read + Send>>, BackendError>;

    /// Sink replacing the object's content; the write becomes visible when
    /// the sink is flushed and dropped.
    fn open_write(&self, key: &str) -> Result<Box<dyn Write + Send>, BackendError>;

    /// Delete the object. `Ok(false)` when the key was already absent.
    fn delete_object(&self, key: &str) -> Result<bool, BackendError>;

    /// One page of keys under `prefix`, grouped at `delimiter`. Pass the
    /// token from the previous page to continue; `None` starts over.
    fn list_page(
        &self,
        prefix: &str,
        delimiter: &str,
        token: Option<&str>,
    ) -> Result<ListPage, BackendError>;

    /// Native grants for the key (empty key: the container).
    fn get_acl(&self, key: &str) -> Result<NativeAcl, BackendError>;

    /// Replace the native grants for the key (empty key: the container).
    fn set_acl(&self, key: &str, acl: &NativeAcl) -> Result<(), BackendError>;

    /// Persist a zero-length folder marker at `key + "/"`.
    fn create_folder_marker(&self, key: &str) -> Result<(), BackendError>;
}
