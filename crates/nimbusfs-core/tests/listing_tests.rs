mod common;

use std::sync::Arc;

use common::{seeded_fs, sorted_children};
use nimbusfs_core::{FsConfig, FsError, MemoryBackend, NameType, RemoteFs};

#[test]
fn test_children_merge_prefixes_and_summaries() {
    let (fs, _backend) = seeded_fs(&[
        ("docs/", b""),
        ("docs/a.txt", b"ten bytes!"),
        ("docs/sub/deep.txt", b"x"),
    ]);
    let mut docs = fs.resolve("mem://bucket/docs").unwrap();

    // The folder's own marker never shows up as a child.
    assert_eq!(sorted_children(&mut docs), vec!["a.txt", "sub"]);
}

#[test]
fn test_resolved_children_hydrate_without_probing() {
    let (fs, backend) = seeded_fs(&[
        ("docs/", b""),
        ("docs/a.txt", b"ten bytes!"),
        ("docs/sub/deep.txt", b"x"),
    ]);
    let mut docs = fs.resolve("mem://bucket/docs").unwrap();
    let mut children = docs.resolved_children().unwrap();
    children.sort_by(|a, b| a.name().base_name().cmp(b.name().base_name()));
    assert_eq!(children.len(), 2);

    let probes_before = backend.stat_object_calls();

    let leaf = &mut children[0];
    assert_eq!(leaf.name().base_name(), "a.txt");
    assert_eq!(leaf.node_type().unwrap(), NameType::File);
    assert_eq!(leaf.content_size().unwrap(), 10);
    assert_eq!(leaf.content_type().unwrap().as_deref(), Some("text/plain"));

    let folder = &mut children[1];
    assert_eq!(folder.name().base_name(), "sub");
    assert_eq!(folder.node_type().unwrap(), NameType::Folder);

    // Listing metadata answered everything.
    assert_eq!(backend.stat_object_calls(), probes_before);
}

#[test]
fn test_inferred_folder_needs_no_marker() {
    let (fs, _backend) = seeded_fs(&[("photos/2024/a.jpg", b"j")]);
    let mut root = fs.root("mem", "bucket").unwrap();

    assert_eq!(sorted_children(&mut root), vec!["photos"]);

    let mut photos = fs.resolve("mem://bucket/photos").unwrap();
    // No "photos/" marker exists; the prefix alone makes it listable.
    assert_eq!(sorted_children(&mut photos), vec!["2024"]);
}

#[test]
fn test_placeholder_children_classify_as_folders() {
    let (fs, backend) = seeded_fs(&[("mixed/plain.txt", b"p")]);
    backend.put_with("mixed/old_$folder$", b"", Some("binary/octet-stream"), None);

    let mut mixed = fs.resolve("mem://bucket/mixed").unwrap();
    let mut children = mixed.resolved_children().unwrap();
    children.sort_by(|a, b| a.name().base_name().cmp(b.name().base_name()));

    assert_eq!(children[0].name().base_name(), "old_$folder$");
    assert_eq!(children[0].node_type().unwrap(), NameType::Folder);
    assert_eq!(children[1].name().base_name(), "plain.txt");
    assert_eq!(children[1].node_type().unwrap(), NameType::File);
}

#[test]
fn test_listing_spans_pages_without_duplicates() {
    let backend = Arc::new(MemoryBackend::with_page_size(3));
    for i in 0..10 {
        backend.put(&format!("big/group/{i:02}"), b"x");
    }
    for i in 0..5 {
        backend.put(&format!("big/leaf-{i:02}"), b"y");
    }
    let fs = RemoteFs::from_shared(Arc::clone(&backend), Arc::new(FsConfig::default()));
    let mut big = fs.resolve("mem://bucket/big").unwrap();

    let children = sorted_children(&mut big);
    assert_eq!(children.len(), 6);
    assert_eq!(children[0], "group");
    assert!(children[1..].iter().eq([
        "leaf-00", "leaf-01", "leaf-02", "leaf-03", "leaf-04"
    ]
    .iter()));
}

#[test]
fn test_extensionless_children_are_real_files() {
    let (fs, _backend) = seeded_fs(&[("docs/", b""), ("docs/README", b"read me")]);
    let mut docs = fs.resolve("mem://bucket/docs").unwrap();

    let mut children = docs.resolved_children().unwrap();
    assert_eq!(children.len(), 1);

    let child = &mut children[0];
    assert_eq!(child.name().base_name(), "README");
    assert_eq!(child.node_type().unwrap(), NameType::File);
    assert!(child.exists().unwrap());
    assert_eq!(
        child.content_type().unwrap().as_deref(),
        Some("application/octet-stream")
    );
}

#[test]
fn test_listing_a_file_is_an_error() {
    let (fs, _backend) = seeded_fs(&[("plain.txt", b"p")]);
    let mut node = fs.resolve("mem://bucket/plain.txt").unwrap();

    assert!(matches!(node.children(), Err(FsError::NotAFolder { .. })));
}

#[test]
fn test_empty_folder_lists_nothing() {
    let (fs, _backend) = seeded_fs(&[("hollow/", b"")]);
    let mut node = fs.resolve("mem://bucket/hollow").unwrap();

    assert!(node.children().unwrap().is_empty());
    assert!(node.resolved_children().unwrap().is_empty());
}
