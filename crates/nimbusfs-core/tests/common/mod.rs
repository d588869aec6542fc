//! Shared fixtures for the integration tests.

use std::io::Read;
use std::sync::Arc;

use nimbusfs_core::{FsConfig, MemoryBackend, Node, RemoteFs};

/// A tree over a fresh in-memory backend seeded with the given objects,
/// returned together with the backend handle for direct inspection.
pub fn seeded_fs(objects: &[(&str, &[u8])]) -> (RemoteFs<MemoryBackend>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    for (key, data) in objects {
        backend.put(key, data);
    }
    let fs = RemoteFs::from_shared(Arc::clone(&backend), Arc::new(FsConfig::default()));
    (fs, backend)
}

#[allow(dead_code)]
pub fn read_all(node: &mut Node<MemoryBackend>) -> Vec<u8> {
    let mut buf = Vec::new();
    node.open_read()
        .expect("open_read")
        .read_to_end(&mut buf)
        .expect("read_to_end");
    buf
}

/// Child names of a node, sorted for stable assertions.
#[allow(dead_code)]
pub fn sorted_children(node: &mut Node<MemoryBackend>) -> Vec<String> {
    let mut names = node.children().expect("children");
    names.sort();
    names
}
