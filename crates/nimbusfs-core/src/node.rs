//! The virtual file object: one lazily attached handle per remote address.
//!
//! A [`Node`] binds a [`Name`] to backend metadata on demand. Creation is
//! free and does no I/O; the first operation that needs metadata runs the
//! attach state machine:
//!
//! 1. probe the exact key as a file;
//! 2. on absence, probe `key + "/"` as a folder marker;
//! 3. on absence again, synthesize empty metadata: the node is imaginary,
//!    a record for a write that has not happened yet.
//!
//! A node flagged as a folder (hydrated from a parent's listing, or just
//! created by [`Node::create_folder`]) skips both probes. Absence drives the
//! branching above and never escapes as an error; a transport or service
//! failure propagates immediately and leaves the node detached.
//!
//! Nodes are not internally synchronized: one logical caller per node
//! instance, one node per concurrent traversal branch.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, instrument, trace};

use crate::acl::Acl;
use crate::backend::{Backend, NativeOwner, ObjectMeta};
use crate::config::FsConfig;
use crate::error::FsError;
use crate::listing::{self, ChildKind, SEPARATOR};
use crate::name::{Name, NameType};
use crate::random_access::RandomAccessContent;

/// How the current attachment was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachOrigin {
    /// The exact key exists as an object.
    File,
    /// Only the folder marker `key + "/"` exists.
    FolderMarker,
    /// Attached without probing, on the word of a listing or a mkdir.
    Flagged,
    /// Neither key exists; metadata is synthesized and nothing is persisted.
    Synthesized,
}

#[derive(Debug, Clone)]
struct Attachment {
    /// The backend key the metadata belongs to; carries the trailing
    /// separator when the attachment is a folder marker.
    key: String,
    meta: ObjectMeta,
    origin: AttachOrigin,
}

#[derive(Debug, Clone)]
enum NodeState {
    Detached,
    Attached(Attachment),
}

/// One remote file or folder, addressed by a [`Name`].
pub struct Node<B: Backend + ?Sized> {
    name: Name,
    backend: Arc<B>,
    config: Arc<FsConfig>,
    state: NodeState,
    /// Tri-state folder knowledge: `Some(true)` confirmed folder (skips the
    /// file probe for good), `Some(false)` confirmed file, `None` unknown.
    /// Survives detach.
    folder_hint: Option<bool>,
    /// Lazily populated ACL owner, kept for the node's in-memory lifetime.
    owner_cache: Option<NativeOwner>,
}

impl<B: Backend + ?Sized> Node<B> {
    pub(crate) fn new(name: Name, backend: Arc<B>, config: Arc<FsConfig>) -> Self {
        // A trailing-slash type hint on the name is a claim, not knowledge;
        // only listings and mkdir pre-flag the folder state.
        Node {
            name,
            backend,
            config,
            state: NodeState::Detached,
            folder_hint: None,
            owner_cache: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, NodeState::Attached(_))
    }

    /// Backend key of the address (no trailing separator).
    fn key(&self) -> &str {
        self.name.backend_key()
    }

    /// Bind this node to backend metadata. No-op when already attached.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn attach(&mut self) -> Result<(), FsError> {
        if self.is_attached() {
            return Ok(());
        }

        let key = self.key().to_string();

        if self.folder_hint == Some(true) {
            trace!(key = %key, "attaching flagged folder without probing");
            self.state = NodeState::Attached(Attachment {
                key: listing::child_prefix(&key),
                meta: ObjectMeta::synthesized(),
                origin: AttachOrigin::Flagged,
            });
            return Ok(());
        }

        // Do we have a file with that key?
        if let Some(meta) = self.backend.stat_object(&key)? {
            debug!(key = %key, "attached file");
            self.state = NodeState::Attached(Attachment {
                key,
                meta,
                origin: AttachOrigin::File,
            });
            return Ok(());
        }

        // Do we have a folder marker with that key?
        if let Some(meta) = self.backend.stat_folder_marker(&key)? {
            let marker_key = format!("{key}{SEPARATOR}");
            debug!(key = %marker_key, "attached folder");
            self.state = NodeState::Attached(Attachment {
                key: marker_key,
                meta,
                origin: AttachOrigin::FolderMarker,
            });
            self.folder_hint = Some(true);
            return Ok(());
        }

        // Neither exists: a brand-new object nothing has written yet.
        debug!(key = %key, "attached imaginary node");
        self.state = NodeState::Attached(Attachment {
            key,
            meta: ObjectMeta::synthesized(),
            origin: AttachOrigin::Synthesized,
        });
        Ok(())
    }

    /// Drop cached metadata and return to the detached state. Idempotent and
    /// infallible; folder knowledge survives so a re-attach of a confirmed
    /// folder never re-probes the file key.
    pub fn detach(&mut self) {
        if self.is_attached() {
            trace!(name = %self.name, "detached");
            self.state = NodeState::Detached;
        }
    }

    fn attachment(&mut self) -> Result<&Attachment, FsError> {
        self.attach()?;
        match &self.state {
            NodeState::Attached(att) => Ok(att),
            NodeState::Detached => unreachable!("attach() succeeded"),
        }
    }

    /// Resolved type of this node, attaching first if needed.
    pub fn node_type(&mut self) -> Result<NameType, FsError> {
        if self.folder_hint == Some(true) {
            return Ok(NameType::Folder);
        }
        let att = self.attachment()?;
        let resolved = match att.origin {
            AttachOrigin::Flagged | AttachOrigin::FolderMarker => NameType::Folder,
            _ if att.meta.content_type.is_none() => NameType::Imaginary,
            _ if att.key.is_empty() || listing::is_directory_placeholder(&att.key, &att.meta) => {
                NameType::Folder
            }
            _ => NameType::File,
        };
        match resolved {
            NameType::Folder => self.folder_hint = Some(true),
            NameType::File => self.folder_hint = Some(false),
            _ => {}
        }
        Ok(resolved)
    }

    /// Whether anything is persisted at this address.
    pub fn exists(&mut self) -> Result<bool, FsError> {
        Ok(self.node_type()? != NameType::Imaginary)
    }

    pub fn content_size(&mut self) -> Result<u64, FsError> {
        Ok(self.attachment()?.meta.content_length)
    }

    pub fn last_modified(&mut self) -> Result<SystemTime, FsError> {
        Ok(self.attachment()?.meta.last_modified)
    }

    /// Update the cached last-modified time. Returns whether it changed.
    /// The snapshot is replaced wholesale; the backend copy is untouched.
    pub fn set_last_modified(&mut self, modified: SystemTime) -> Result<bool, FsError> {
        self.attach()?;
        let NodeState::Attached(att) = &mut self.state else {
            unreachable!("attach() succeeded");
        };
        if att.meta.last_modified == modified {
            return Ok(false);
        }
        att.meta = ObjectMeta {
            last_modified: modified,
            ..att.meta.clone()
        };
        Ok(true)
    }

    pub fn content_type(&mut self) -> Result<Option<String>, FsError> {
        Ok(self.attachment()?.meta.content_type.clone())
    }

    pub fn etag(&mut self) -> Result<Option<String>, FsError> {
        Ok(self.attachment()?.meta.etag.clone())
    }

    /// Open the content stream from the start.
    pub fn open_read(&mut self) -> Result<Box<dyn Read + Send>, FsError> {
        self.open_read_at(0)
    }

    /// Open a forward-only content stream starting at `offset`.
    pub fn open_read_at(&mut self, offset: u64) -> Result<Box<dyn Read + Send>, FsError> {
        if self.node_type()? == NameType::Folder {
            return Err(FsError::NotAFile {
                name: self.name.to_string(),
            });
        }
        let key = self.key().to_string();
        match self.backend.open_read(&key, offset)? {
            Some(stream) => Ok(stream),
            None => Err(FsError::io(
                "open_read",
                key,
                io::Error::from(io::ErrorKind::NotFound),
            )),
        }
    }

    /// Open a sink replacing this node's content. The node detaches so the
    /// next operation sees fresh metadata.
    pub fn open_write(&mut self) -> Result<Box<dyn Write + Send>, FsError> {
        if self.node_type()? == NameType::Folder {
            return Err(FsError::NotAFile {
                name: self.name.to_string(),
            });
        }
        let key = self.key().to_string();
        let sink = self.backend.open_write(&key)?;
        self.detach();
        self.folder_hint = Some(false);
        Ok(sink)
    }

    /// Random-access read adapter over this node's content.
    pub fn random_access(&mut self) -> Result<RandomAccessContent<B>, FsError> {
        if self.node_type()? == NameType::Folder {
            return Err(FsError::NotAFile {
                name: self.name.to_string(),
            });
        }
        let length = self.content_size()?;
        Ok(RandomAccessContent::new(
            Arc::clone(&self.backend),
            self.key().to_string(),
            length,
        ))
    }

    /// Delete the object (or folder marker) behind this node. The node
    /// returns to the detached state with its folder knowledge cleared.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn delete(&mut self) -> Result<(), FsError> {
        self.attach()?;
        let key = match &self.state {
            NodeState::Attached(att) => att.key.clone(),
            NodeState::Detached => unreachable!("attach() succeeded"),
        };
        let existed = self.backend.delete_object(&key)?;
        trace!(key = %key, existed, "deleted");
        self.state = NodeState::Detached;
        self.folder_hint = None;
        self.owner_cache = None;
        Ok(())
    }

    /// Recursively delete this node and everything under it.
    pub fn delete_all(&mut self) -> Result<(), FsError> {
        if self.node_type()? == NameType::Folder {
            for mut child in self.resolved_children()? {
                child.delete_all()?;
            }
        }
        self.delete()
    }

    /// Persist a folder marker for this address and flag the node as a
    /// folder; subsequent attaches skip probing entirely.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn create_folder(&mut self) -> Result<(), FsError> {
        let key = self.key().to_string();
        self.backend.create_folder_marker(&key)?;
        debug!(key = %key, "created folder marker");
        self.folder_hint = Some(true);
        self.state = NodeState::Attached(Attachment {
            key: listing::child_prefix(&key),
            meta: ObjectMeta {
                content_type: Some(listing::DIRECTORY_MIME_TYPE.to_string()),
                ..ObjectMeta::synthesized()
            },
            origin: AttachOrigin::Flagged,
        });
        Ok(())
    }

    fn require_folder(&mut self) -> Result<(), FsError> {
        // The container root is listable even before any marker exists.
        if self.name.is_root() || self.node_type()? == NameType::Folder {
            Ok(())
        } else {
            Err(FsError::NotAFolder {
                name: self.name.to_string(),
            })
        }
    }

    /// Names of this folder's immediate children.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn children(&mut self) -> Result<Vec<String>, FsError> {
        self.require_folder()?;
        let entries = listing::reconcile(self.backend.as_ref(), self.key())?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.relative_name)
            .collect())
    }

    /// This folder's immediate children as hydrated nodes.
    ///
    /// Children derived from common prefixes come pre-flagged as folders and
    /// never probe on first attach; children derived from summaries come
    /// pre-attached with the listing metadata, so no per-child round trip is
    /// needed.
    #[instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn resolved_children(&mut self) -> Result<Vec<Node<B>>, FsError> {
        self.require_folder()?;
        let prefix = listing::child_prefix(self.key());
        let entries = listing::reconcile(self.backend.as_ref(), self.key())?;

        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let segment = entry.relative_name.trim_end_matches(SEPARATOR);
            if segment.is_empty() {
                continue;
            }
            let mut child = Node::new(
                self.name.child(segment)?,
                Arc::clone(&self.backend),
                Arc::clone(&self.config),
            );
            match entry.kind {
                ChildKind::InferredFolder => {
                    child.folder_hint = Some(true);
                }
                ChildKind::PlaceholderFolder | ChildKind::Leaf => {
                    let meta = entry.meta.unwrap_or_else(ObjectMeta::synthesized);
                    child.folder_hint = Some(entry.kind == ChildKind::PlaceholderFolder);
                    child.state = NodeState::Attached(Attachment {
                        key: format!("{prefix}{}", entry.relative_name),
                        meta,
                        origin: AttachOrigin::File,
                    });
                }
            }
            children.push(child);
        }
        Ok(children)
    }

    /// A child node of this folder, sharing the backend and configuration.
    pub fn child(&self, segment: &str) -> Result<Node<B>, FsError> {
        Ok(Node::new(
            self.name.child(segment)?,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
        ))
    }

    /// Access control list of this node, projected into the generic
    /// three-group model. The empty key addresses the container itself.
    pub fn acl(&mut self) -> Result<Acl, FsError> {
        let native = self.backend.get_acl(self.key())?;
        self.owner_cache = Some(native.owner.clone());
        Ok(Acl::from_native(&native))
    }

    /// Replace this node's grants with the generic model's equivalents.
    pub fn set_acl(&mut self, acl: &Acl) -> Result<(), FsError> {
        let owner = match &self.owner_cache {
            Some(owner) => owner.clone(),
            None => {
                let native = self.backend.get_acl(self.key())?;
                self.owner_cache = Some(native.owner.clone());
                native.owner
            }
        };
        let native = acl.to_native(&owner);
        if !self.key().is_empty() {
            // Objects must be attached before their grants can be replaced.
            self.attach()?;
        }
        self.backend.set_acl(self.key(), &native)?;
        Ok(())
    }

    /// Move this node to `target` by copying everything and then deleting
    /// the source.
    ///
    /// Backends in scope offer no atomic rename, so this is explicitly
    /// non-atomic: a concurrent reader can observe the target populated
    /// while the source still exists, and a failure between the copy and the
    /// delete leaves both behind.
    #[instrument(level = "debug", skip(self, target), fields(from = %self.name, to = %target.name))]
    pub fn rename_to(&mut self, target: &mut Node<B>) -> Result<(), FsError> {
        target.copy_all_from(self)?;
        self.delete_all()
    }

    /// Recursively copy `source` (file or folder) over this node.
    pub fn copy_all_from(&mut self, source: &mut Node<B>) -> Result<(), FsError> {
        match source.node_type()? {
            NameType::Folder => {
                self.create_folder()?;
                for mut source_child in source.resolved_children()? {
                    let mut target_child = self.child(source_child.name().base_name())?;
                    target_child.copy_all_from(&mut source_child)?;
                }
                Ok(())
            }
            NameType::Imaginary => Err(FsError::io(
                "copy",
                source.key().to_string(),
                io::Error::from(io::ErrorKind::NotFound),
            )),
            _ => {
                let mut reader = source.open_read()?;
                let mut writer = self.open_write()?;
                let key = self.key().to_string();
                io::copy(&mut reader, &mut writer)
                    .and_then(|_| writer.flush())
                    .map_err(|source| FsError::io("copy", key, source))?;
                drop(writer);
                self.detach();
                Ok(())
            }
        }
    }
}
