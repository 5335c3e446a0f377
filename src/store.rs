//! Record and file stores – the collaborators the exporter is handed
//! explicitly instead of reaching for process-wide session state.
//!
//! Two traits define the seams:
//! - [`RecordStore`] loads a fully populated [`PortfolioRecord`] by name.
//! - [`FileStore`] persists an export artifact and returns a retrievable
//!   [`FileReference`].
//!
//! Adapters: a JSON-file record store, a directory-backed file store, and
//! in-memory versions of both for embedding and tests.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{ExportError, Result};
use crate::model::PortfolioRecord;

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

pub trait RecordStore {
    /// Load a record and its child collections.
    ///
    /// Fails with [`ExportError::NotFound`] when no record has that name.
    fn load(&self, name: &str) -> Result<PortfolioRecord>;
}

/// Records held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: HashMap<String, PortfolioRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PortfolioRecord) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn with(mut self, record: PortfolioRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<PortfolioRecord> for MemoryRecordStore {
    fn from_iter<I: IntoIterator<Item = PortfolioRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, name: &str) -> Result<PortfolioRecord> {
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| ExportError::NotFound(name.to_string()))
    }
}

/// Record store backed by a JSON file holding an array of records.
///
/// The file is read once at open time; lookups are served from memory.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    inner: MemoryRecordStore,
}

impl JsonRecordStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(&path).map_err(|e| {
            ExportError::InvalidInput(format!("cannot read records '{}': {e}", path.display()))
        })?;
        let records: Vec<PortfolioRecord> = serde_json::from_str(&raw).map_err(|e| {
            ExportError::InvalidInput(format!("malformed records '{}': {e}", path.display()))
        })?;
        log::debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self {
            inner: records.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl RecordStore for JsonRecordStore {
    fn load(&self, name: &str) -> Result<PortfolioRecord> {
        self.inner.load(name)
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// A persisted export artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Final stored name (may carry a collision suffix).
    pub file_name: String,
    /// Retrievable URL, e.g. `/private/files/portfolio_export_20240101120000.pdf`.
    pub file_url: String,
    pub is_private: bool,
    /// Content length in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256 of the content.
    pub content_hash: String,
}

impl FileReference {
    /// Extension of the stored file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

pub trait FileStore {
    /// Persist `content` under `file_name`. Never overwrites an existing file.
    fn persist(&self, file_name: &str, content: &[u8], is_private: bool) -> Result<FileReference>;
}

fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

fn file_url(file_name: &str, is_private: bool) -> String {
    if is_private {
        format!("/private/files/{file_name}")
    } else {
        format!("/files/{file_name}")
    }
}

/// Insert `-{n}` before the extension: `a.pdf` → `a-1.pdf`.
fn suffixed_name(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{n}.{ext}"),
        None => format!("{file_name}-{n}"),
    }
}

/// Reject names that would escape the store directory.
fn validate_file_name(file_name: &str) -> Result<()> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.starts_with('.')
    {
        return Err(ExportError::Persistence(format!(
            "invalid file name: {file_name:?}"
        )));
    }
    Ok(())
}

/// Directory-backed file store.
///
/// # Directory structure
///
/// ```text
/// {root}/
/// ├── files/            public artifacts
/// └── private/files/    private artifacts
/// ```
///
/// Writes go to a uniquely named temp file in the target directory, are
/// synced, then linked into place without replacing anything.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, is_private: bool) -> PathBuf {
        if is_private {
            self.root.join("private").join("files")
        } else {
            self.root.join("files")
        }
    }

    /// Filesystem path of a stored reference.
    pub fn path_of(&self, reference: &FileReference) -> PathBuf {
        self.dir(reference.is_private).join(&reference.file_name)
    }

    /// Write `content` to a fresh temp file in `dir`, then link it into place
    /// under the first free name in `file_name`, `file_name-1`, ...
    ///
    /// `persist_noclobber` fails with `AlreadyExists` rather than replacing a
    /// file, which moves the writer on to the next suffix.
    fn write_unique(dir: &Path, file_name: &str, content: &[u8]) -> Result<String> {
        let io_err = |e: std::io::Error| {
            ExportError::Persistence(format!("cannot write into '{}': {e}", dir.display()))
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(content).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;

        let mut name = file_name.to_string();
        let mut n = 0;
        loop {
            match tmp.persist_noclobber(dir.join(&name)) {
                Ok(_) => return Ok(name),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    tmp = e.file;
                    n += 1;
                    name = suffixed_name(file_name, n);
                }
                Err(e) => {
                    return Err(ExportError::Persistence(format!(
                        "cannot write '{}': {}",
                        dir.join(&name).display(),
                        e.error
                    )))
                }
            }
        }
    }
}

impl FileStore for LocalFileStore {
    fn persist(&self, file_name: &str, content: &[u8], is_private: bool) -> Result<FileReference> {
        validate_file_name(file_name)?;
        let dir = self.dir(is_private);
        fs::create_dir_all(&dir).map_err(|e| {
            ExportError::Persistence(format!("cannot create '{}': {e}", dir.display()))
        })?;

        let name = Self::write_unique(&dir, file_name, content)?;
        log::info!("Stored {} ({} bytes)", dir.join(&name).display(), content.len());

        Ok(FileReference {
            file_url: file_url(&name, is_private),
            file_name: name,
            is_private,
            size: content.len() as u64,
            content_hash: content_hash(content),
        })
    }
}

/// A stored artifact held by [`MemoryFileStore`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub reference: FileReference,
    pub content: Vec<u8>,
}

/// File store that keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<StoredFile>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far, in insertion order.
    pub fn files(&self) -> Vec<StoredFile> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileStore for MemoryFileStore {
    fn persist(&self, file_name: &str, content: &[u8], is_private: bool) -> Result<FileReference> {
        validate_file_name(file_name)?;
        let mut files = self
            .files
            .lock()
            .map_err(|e| ExportError::Persistence(e.to_string()))?;

        let taken = |candidate: &str| files.iter().any(|f| f.reference.file_name == candidate);
        let mut name = file_name.to_string();
        let mut n = 0;
        while taken(&name) {
            n += 1;
            name = suffixed_name(file_name, n);
        }

        let reference = FileReference {
            file_url: file_url(&name, is_private),
            file_name: name,
            is_private,
            size: content.len() as u64,
            content_hash: content_hash(content),
        };
        files.push(StoredFile {
            reference: reference.clone(),
            content: content.to_vec(),
        });
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_record_store_reports_missing_names() {
        let store = MemoryRecordStore::new().with(PortfolioRecord::new("PF-1"));
        assert_eq!(store.load("PF-1").unwrap().name, "PF-1");
        match store.load("PF-404") {
            Err(ExportError::NotFound(name)) => assert_eq!(name, "PF-404"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn json_record_store_reads_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(
            &path,
            r#"[{"name": "PF-1", "title": "Bridge Survey", "technologies": [{"technology_name": "GIS"}]}]"#,
        )
        .unwrap();

        let store = JsonRecordStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        let record = store.load("PF-1").unwrap();
        assert_eq!(record.title.as_deref(), Some("Bridge Survey"));
        assert_eq!(record.technologies[0].technology_name, "GIS");
    }

    #[test]
    fn json_record_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonRecordStore::open(&path),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn local_store_writes_private_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let reference = store.persist("report.pdf", b"%PDF-1.7", true).unwrap();

        assert_eq!(reference.file_url, "/private/files/report.pdf");
        assert_eq!(reference.size, 8);
        assert_eq!(reference.extension(), Some("pdf"));
        let on_disk = fs::read(store.path_of(&reference)).unwrap();
        assert_eq!(on_disk, b"%PDF-1.7");
        let leftovers = fs::read_dir(dir.path().join("private/files")).unwrap().count();
        assert_eq!(leftovers, 1, "temp file left behind");
    }

    #[test]
    fn local_store_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let first = store.persist("a.docx", b"one", false).unwrap();
        let second = store.persist("a.docx", b"two", false).unwrap();

        assert_eq!(first.file_url, "/files/a.docx");
        assert_eq!(second.file_name, "a-1.docx");
        assert_ne!(first.content_hash, second.content_hash);
        assert_eq!(fs::read(store.path_of(&first)).unwrap(), b"one");
    }

    #[test]
    fn concurrent_writers_never_share_a_name() {
        use std::collections::HashSet;
        use std::sync::{Arc, Barrier};
        use std::thread;

        const WRITERS: usize = 8;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalFileStore::new(dir.path()));
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let content = vec![i as u8; 200_000];
                    barrier.wait();
                    let reference = store
                        .persist("portfolio_export_20240101000000.pdf", &content, true)
                        .unwrap();
                    (reference, content)
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            let (reference, content) = handle.join().unwrap();
            let on_disk = fs::read(store.path_of(&reference)).unwrap();
            assert_eq!(on_disk, content, "{} holds another writer's bytes", reference.file_name);
            assert_eq!(reference.content_hash, content_hash(&on_disk));
            assert!(names.insert(reference.file_name));
        }
        assert_eq!(names.len(), WRITERS);
        assert!(names.contains("portfolio_export_20240101000000.pdf"));
        let stored = fs::read_dir(dir.path().join("private/files")).unwrap().count();
        assert_eq!(stored, WRITERS);
    }

    #[test]
    fn stores_reject_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(matches!(
            store.persist("../escape.pdf", b"x", true),
            Err(ExportError::Persistence(_))
        ));
        assert!(MemoryFileStore::new().persist("", b"x", true).is_err());
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
