//! Reconciliation of a flat, paginated key space into one level of children.
//!
//! Object backends have no directories, only keys. A "folder" shows up three
//! different ways: as a common prefix grouped by the listing delimiter, as a
//! zero-length placeholder object left behind by one of several historical
//! tools, or not at all. The reconciler folds all of that into an ordered,
//! deduplicated set of immediate children.

use std::collections::BTreeSet;

use tracing::trace;

use crate::backend::{Backend, BackendError, ObjectMeta, Summary};

/// Path separator used across backends.
pub const SEPARATOR: char = '/';

/// Content hash of the zero-byte placeholder objects written by s3sync.rb.
const PLACEHOLDER_ETAG: &str = "d66759af42f282e1ba19144df2d405d0";

/// Key suffix of placeholders created by the Google Storage console and the
/// S3 Organizer extension.
const PLACEHOLDER_SUFFIX: &str = "_$folder$";

/// MIME type of legacy JetS3t directory placeholders.
pub const DIRECTORY_MIME_TYPE: &str = "application/x-directory";

/// How a child entry was derived from the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// Inferred from a common prefix: keys exist below it.
    InferredFolder,
    /// A real object that matches the placeholder heuristics.
    PlaceholderFolder,
    /// A real object that is just a file.
    Leaf,
}

/// One immediate child of a folder.
#[derive(Debug, Clone)]
pub struct ChildEntry {
    /// Name relative to the listed folder, without any separator.
    pub relative_name: String,
    pub kind: ChildKind,
    /// Metadata lifted from the listing summary, populated for every child
    /// derived from a summary so resolved children hydrate without a second
    /// round trip. Inferred folders carry none.
    pub meta: Option<ObjectMeta>,
}

/// The listing prefix for a folder key: `""` lists the container root,
/// anything else gets the trailing separator appended.
pub fn child_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}{SEPARATOR}")
    }
}

/// Reconcile the flat listing under `key` into immediate children.
///
/// Pages are fetched sequentially (each continuation token depends on the
/// previous page) until the backend reports the listing exhausted. Common
/// prefixes accumulate into a lexicographically ordered set, so duplicates
/// across pages collapse; summaries keep backend order, minus the folder's
/// own marker object. Inferred folders are emitted first, then summaries
/// classified by the placeholder test.
///
/// Every call re-lists from the first page: re-invoking yields a fresh
/// snapshot, never a continuation of an earlier call.
pub fn reconcile<B: Backend + ?Sized>(
    backend: &B,
    key: &str,
) -> Result<Vec<ChildEntry>, BackendError> {
    let prefix = child_prefix(key);

    let mut common_prefixes = BTreeSet::new();
    let mut summaries: Vec<Summary> = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = backend.list_page(&prefix, "/", token.as_deref())?;
        common_prefixes.extend(page.common_prefixes);
        summaries.extend(page.summaries);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    trace!(
        prefix = %prefix,
        prefixes = common_prefixes.len(),
        summaries = summaries.len(),
        "listing reconciled"
    );

    let mut children = Vec::with_capacity(common_prefixes.len() + summaries.len());

    for common_prefix in &common_prefixes {
        let relative = common_prefix
            .strip_prefix(&prefix)
            .unwrap_or(common_prefix)
            .trim_end_matches(SEPARATOR);
        if relative.is_empty() {
            continue;
        }
        children.push(ChildEntry {
            relative_name: relative.to_string(),
            kind: ChildKind::InferredFolder,
            meta: None,
        });
    }

    for summary in summaries {
        // The folder's own marker object is not a child of itself.
        if summary.key == prefix {
            continue;
        }
        let relative = summary
            .key
            .strip_prefix(&prefix)
            .unwrap_or(&summary.key)
            .to_string();
        let meta = ObjectMeta {
            content_length: summary.size,
            last_modified: summary.last_modified,
            content_type: Some(guess_content_type(&relative).to_string()),
            etag: summary.etag.clone(),
        };
        let kind = if is_directory_placeholder(&summary.key, &meta) {
            ChildKind::PlaceholderFolder
        } else {
            ChildKind::Leaf
        };
        children.push(ChildEntry {
            relative_name: relative,
            kind,
            meta: Some(meta),
        });
    }

    Ok(children)
}

/// Placeholder-folder test, compatible with the conventions of several
/// generations of tooling. Applied to leaf-shaped summaries and to attached
/// metadata during type resolution, never to the raw name listing.
pub fn is_directory_placeholder(key: &str, meta: &ObjectMeta) -> bool {
    // Zero-byte slash-suffixed markers: AWS console, Panic Transmit.
    if key.ends_with(SEPARATOR) && meta.content_length == 0 {
        return true;
    }

    // s3sync.rb placeholders, recognized by content hash.
    if meta.etag.as_deref() == Some(PLACEHOLDER_ETAG) {
        return true;
    }

    // Google Storage console / S3 Organizer suffix token.
    if key.ends_with(PLACEHOLDER_SUFFIX) && meta.content_length == 0 {
        return true;
    }

    // Legacy JetS3t markers, recognizable only with populated metadata.
    if meta.content_length == 0 && meta.content_type.as_deref() == Some(DIRECTORY_MIME_TYPE) {
        return true;
    }

    false
}

/// Content type from the file extension, for hydrating children out of
/// listing summaries. Unknown extensions and extension-less names fall back
/// to `application/octet-stream`; a hydrated object always has a content
/// type, only synthesized metadata carries none.
pub fn guess_content_type(name: &str) -> &'static str {
    const FALLBACK: &str = "application/octet-stream";
    let extension = match name.rsplit('.').next() {
        Some(extension) if extension.len() < name.len() => extension,
        _ => return FALLBACK,
    };
    match extension.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "bin" => "application/octet-stream",
        _ => FALLBACK,
    }
}
