//! In-memory reference backend.
//!
//! A complete [`Backend`] over a flat, ordered key space, with S3-style
//! delimiter grouping and marker-based pagination. The integration tests run
//! against it, and backend adapter authors can diff their implementation's
//! behavior against this one. Probe and stream-open counters make the lazy
//! parts of the core observable.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::backend::{
    Backend, BackendError, ListPage, NativeAcl, NativeGrant, NativeGrantee, NativeOwner,
    NativePermission, ObjectMeta, Summary,
};
use crate::listing::{self, DIRECTORY_MIME_TYPE};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Arc<Vec<u8>>,
    content_type: Option<String>,
    etag: Option<String>,
    last_modified: SystemTime,
    acl: Option<NativeAcl>,
}

impl StoredObject {
    fn meta(&self) -> ObjectMeta {
        ObjectMeta {
            content_length: self.data.len() as u64,
            last_modified: self.last_modified,
            content_type: self.content_type.clone(),
            etag: self.etag.clone(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    container_acl: NativeAcl,
}

/// Flat-key in-memory backend.
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
    page_size: usize,
    owner: NativeOwner,
    stat_object_calls: AtomicU64,
    open_read_calls: AtomicU64,
    fail_next_stat: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A backend that paginates listings after `page_size` keys, for
    /// exercising continuation-token handling.
    pub fn with_page_size(page_size: usize) -> Self {
        let owner = NativeOwner {
            id: "memory-owner".to_string(),
            display_name: Some("Memory Owner".to_string()),
        };
        MemoryBackend {
            inner: Arc::new(Mutex::new(Inner {
                objects: BTreeMap::new(),
                container_acl: default_acl(&owner),
            })),
            page_size,
            owner,
            stat_object_calls: AtomicU64::new(0),
            open_read_calls: AtomicU64::new(0),
            fail_next_stat: AtomicBool::new(false),
        }
    }

    /// Store an object; content type guessed from the key, etag derived from
    /// the content.
    pub fn put(&self, key: &str, data: &[u8]) {
        self.put_with(key, data, Some(listing::guess_content_type(key)), None);
    }

    /// Store an object with explicit content type and/or etag, for seeding
    /// the various placeholder conventions.
    pub fn put_with(
        &self,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
        etag: Option<&str>,
    ) {
        let mut inner = self.inner.lock().expect("backend lock poisoned");
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                data: Arc::new(data.to_vec()),
                content_type: content_type.map(str::to_string),
                etag: Some(etag.map_or_else(|| pseudo_etag(data), str::to_string)),
                last_modified: SystemTime::now(),
                acl: None,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .expect("backend lock poisoned")
            .objects
            .contains_key(key)
    }

    /// All stored keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("backend lock poisoned")
            .objects
            .keys()
            .cloned()
            .collect()
    }

    /// Number of exact-key metadata probes served so far.
    pub fn stat_object_calls(&self) -> u64 {
        self.stat_object_calls.load(Ordering::Relaxed)
    }

    /// Number of content streams opened so far.
    pub fn open_read_calls(&self) -> u64 {
        self.open_read_calls.load(Ordering::Relaxed)
    }

    /// Make the next metadata probe fail with a transport error.
    pub fn fail_next_stat(&self) {
        self.fail_next_stat.store(true, Ordering::Relaxed);
    }

    fn take_injected_failure(&self, op: &'static str, key: &str) -> Result<(), BackendError> {
        if self.fail_next_stat.swap(false, Ordering::Relaxed) {
            return Err(BackendError::new(
                op,
                key,
                io::Error::new(io::ErrorKind::ConnectionReset, "injected failure"),
            ));
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn stat_object(&self, key: &str) -> Result<Option<ObjectMeta>, BackendError> {
        self.stat_object_calls.fetch_add(1, Ordering::Relaxed);
        self.take_injected_failure("stat_object", key)?;
        let inner = self.inner.lock().expect("backend lock poisoned");
        Ok(inner.objects.get(key).map(StoredObject::meta))
    }

    fn stat_folder_marker(&self, key: &str) -> Result<Option<ObjectMeta>, BackendError> {
        self.take_injected_failure("stat_folder_marker", key)?;
        let marker = format!("{key}/");
        let inner = self.inner.lock().expect("backend lock poisoned");
        Ok(inner.objects.get(&marker).map(StoredObject::meta))
    }

    fn open_read(
        &self,
        key: &str,
        offset: u64,
    ) -> Result<Option<Box<dyn Read + Send>>, BackendError> {
        self.open_read_calls.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.lock().expect("backend lock poisoned");
        let Some(object) = inner.objects.get(key) else {
            return Ok(None);
        };
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(object.data.len());
        let tail = object.data[start..].to_vec();
        Ok(Some(Box::new(Cursor::new(tail))))
    }

    fn open_write(&self, key: &str) -> Result<Box<dyn Write + Send>, BackendError> {
        Ok(Box::new(MemoryWriter {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            buf: Vec::new(),
        }))
    }

    fn delete_object(&self, key: &str) -> Result<bool, BackendError> {
        let mut inner = self.inner.lock().expect("backend lock poisoned");
        Ok(inner.objects.remove(key).is_some())
    }

    fn list_page(
        &self,
        prefix: &str,
        delimiter: &str,
        token: Option<&str>,
    ) -> Result<ListPage, BackendError> {
        let inner = self.inner.lock().expect("backend lock poisoned");

        let mut page = ListPage::default();
        let mut seen_prefixes = Vec::new();
        let mut processed = 0usize;
        let mut last_key: Option<&str> = None;
        let mut truncated = false;

        for (key, object) in inner.objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(marker) = token
                && key.as_str() <= marker
            {
                continue;
            }
            if processed == self.page_size {
                truncated = true;
                break;
            }
            processed += 1;
            last_key = Some(key);

            let rest = &key[prefix.len()..];
            if let Some(cut) = rest.find(delimiter) {
                let common = format!("{prefix}{}", &rest[..cut + delimiter.len()]);
                // Dedup within the page; the reconciler dedups across pages.
                if !seen_prefixes.contains(&common) {
                    seen_prefixes.push(common);
                }
            } else {
                page.summaries.push(Summary {
                    key: key.clone(),
                    size: object.data.len() as u64,
                    last_modified: object.last_modified,
                    etag: object.etag.clone(),
                });
            }
        }

        page.common_prefixes = seen_prefixes;
        if truncated {
            page.next_token = last_key.map(str::to_string);
        }
        Ok(page)
    }

    fn get_acl(&self, key: &str) -> Result<NativeAcl, BackendError> {
        let inner = self.inner.lock().expect("backend lock poisoned");
        if key.is_empty() {
            return Ok(inner.container_acl.clone());
        }
        Ok(inner
            .objects
            .get(key)
            .and_then(|object| object.acl.clone())
            .unwrap_or_else(|| default_acl(&self.owner)))
    }

    fn set_acl(&self, key: &str, acl: &NativeAcl) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().expect("backend lock poisoned");
        if key.is_empty() {
            inner.container_acl = acl.clone();
            return Ok(());
        }
        match inner.objects.get_mut(key) {
            Some(object) => {
                object.acl = Some(acl.clone());
                Ok(())
            }
            None => Err(BackendError::new(
                "set_acl",
                key,
                io::Error::from(io::ErrorKind::NotFound),
            )),
        }
    }

    fn create_folder_marker(&self, key: &str) -> Result<(), BackendError> {
        let marker = format!("{key}/");
        self.put_with(&marker, b"", Some(DIRECTORY_MIME_TYPE), None);
        Ok(())
    }
}

/// Buffering sink; the object becomes visible on flush (and again on drop,
/// with whatever has been written by then).
struct MemoryWriter {
    inner: Arc<Mutex<Inner>>,
    key: String,
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&mut self) {
        let mut inner = self.inner.lock().expect("backend lock poisoned");
        inner.objects.insert(
            self.key.clone(),
            StoredObject {
                data: Arc::new(self.buf.clone()),
                content_type: Some(listing::guess_content_type(&self.key).to_string()),
                etag: Some(pseudo_etag(&self.buf)),
                last_modified: SystemTime::now(),
                acl: None,
            },
        );
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

fn default_acl(owner: &NativeOwner) -> NativeAcl {
    NativeAcl {
        owner: owner.clone(),
        grants: vec![NativeGrant {
            grantee: NativeGrantee::Canonical {
                id: owner.id.clone(),
            },
            permission: NativePermission::FullControl,
        }],
    }
}

/// Opaque content tag; stable for identical bytes, hex like the real thing.
fn pseudo_etag(data: &[u8]) -> String {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut front = DefaultHasher::new();
    data.hash(&mut front);
    let mut back = DefaultHasher::new();
    data.len().hash(&mut back);
    data.hash(&mut back);
    format!("{:016x}{:016x}", front.finish(), back.finish())
}
