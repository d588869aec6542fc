//! Entry point tying a backend and configuration to name resolution.

use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::config::FsConfig;
use crate::error::FsError;
use crate::name::Name;
use crate::node::Node;

/// A remote file tree over one backend.
///
/// Cheap to clone; all clones share the backend and configuration. Nodes
/// handed out by [`resolve`](RemoteFs::resolve) carry their own state and do
/// not synchronize with each other.
pub struct RemoteFs<B: Backend + ?Sized> {
    backend: Arc<B>,
    config: Arc<FsConfig>,
}

impl<B: Backend + ?Sized> Clone for RemoteFs<B> {
    fn clone(&self) -> Self {
        RemoteFs {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: Backend> RemoteFs<B> {
    pub fn new(backend: B, config: FsConfig) -> Self {
        RemoteFs {
            backend: Arc::new(backend),
            config: Arc::new(config),
        }
    }
}

impl<B: Backend + ?Sized> RemoteFs<B> {
    pub fn from_shared(backend: Arc<B>, config: Arc<FsConfig>) -> Self {
        RemoteFs { backend, config }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Parse a raw URI and hand out a detached node for it.
    pub fn resolve(&self, raw: &str) -> Result<Node<B>, FsError> {
        let name = Name::parse(raw, &self.config.default_host)?;
        debug!(uri = %name, "resolved");
        Ok(self.node_for(name))
    }

    /// A detached node for an already-parsed name.
    pub fn node_for(&self, name: Name) -> Node<B> {
        Node::new(
            name,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
        )
    }

    /// The container root, `<scheme>://<host>/`.
    pub fn root(&self, scheme: &str, host: &str) -> Result<Node<B>, FsError> {
        self.resolve(&format!("{scheme}://{host}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::name::NameType;

    fn fixture() -> RemoteFs<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.put("docs/a.txt", b"hello");
        RemoteFs::new(backend, FsConfig::default())
    }

    #[test]
    fn resolve_hands_out_detached_nodes() {
        let fs = fixture();
        let node = fs.resolve("mem://bucket/docs/a.txt").unwrap();
        assert!(!node.is_attached());
        assert_eq!(node.name().backend_key(), "docs/a.txt");
    }

    #[test]
    fn resolve_applies_default_host() {
        let fs = fixture();
        let node = fs.resolve("mem://@/docs/a.txt").unwrap();
        assert_eq!(node.name().host(), "localhost");
    }

    #[test]
    fn clones_share_the_backend() {
        let fs = fixture();
        let twin = fs.clone();
        let mut node = twin.resolve("mem://bucket/docs/a.txt").unwrap();
        assert!(node.exists().unwrap());
    }

    #[test]
    fn root_resolves_to_empty_key() {
        let fs = fixture();
        let root = fs.root("mem", "bucket").unwrap();
        assert_eq!(root.name().backend_key(), "");
        assert_eq!(root.name().kind(), NameType::Folder);
    }
}
