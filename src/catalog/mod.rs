//! Catalog of processed images (filename → [`ImageRecord`]).
//!
//! The in-memory map is the source of truth while the server runs; the JSON
//! file is a best-effort mirror that becomes authoritative again on the next
//! [`CatalogStore::load`].
//!
//! Durability contract: [`CatalogStore::upsert`] schedules a persist and
//! returns without waiting for it. A failed persist is written to the
//! activity log and never reported to the caller. Persists are serialized,
//! each writes a complete snapshot through a temp file + rename, and the
//! snapshot is taken inside the critical section so the last persist to
//! finish always carries the newest map.

mod types;

pub use types::ImageRecord;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use pixelforge_common::{Error, ImageFormat};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::activity::LogSink;
use crate::naming::check_file_name;

pub struct CatalogStore {
    records: RwLock<HashMap<String, ImageRecord>>,
    catalog_path: PathBuf,
    image_dir: PathBuf,
    /// Held across snapshot + write of one persist
    persist_lock: Mutex<()>,
    persists: TaskTracker,
    log: LogSink,
}

impl CatalogStore {
    /// Load the catalog file.
    ///
    /// A missing or unparsable file is an error: the service must not start
    /// from an unknown catalog. Use [`CatalogStore::init_file`] to create an
    /// empty one.
    pub fn load(
        catalog_path: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        log: LogSink,
    ) -> Result<Arc<Self>> {
        let catalog_path = catalog_path.into();
        let content = std::fs::read_to_string(&catalog_path)
            .with_context(|| format!("Failed to read catalog file: {:?}", catalog_path))?;
        let records: HashMap<String, ImageRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {:?}", catalog_path))?;

        for (key, record) in &records {
            if key != &record.filename {
                tracing::warn!(
                    key = %key,
                    filename = %record.filename,
                    "Catalog key does not match record filename"
                );
            }
        }

        tracing::info!("Loaded {} catalog records from {:?}", records.len(), catalog_path);

        Ok(Arc::new(Self {
            records: RwLock::new(records),
            catalog_path,
            image_dir: image_dir.into(),
            persist_lock: Mutex::new(()),
            persists: TaskTracker::new(),
            log,
        }))
    }

    /// Write an empty catalog at `path` unless a file already exists there.
    ///
    /// Returns whether a file was created.
    pub fn init_file(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }
        std::fs::write(path, "{}\n")
            .with_context(|| format!("Failed to write catalog file: {:?}", path))?;
        Ok(true)
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Record that `filter` produced `filename`.
    ///
    /// A new filename gets a fresh record; a known one has `filter` appended
    /// to its history. A persist is scheduled in the background and not
    /// awaited (see the module docs). Must be called within a tokio runtime.
    pub fn upsert(self: &Arc<Self>, filename: &str, format: ImageFormat, filter: &str) -> ImageRecord {
        let record = {
            let mut records = self.records.write();
            records
                .entry(filename.to_string())
                .and_modify(|r| r.filters.push(filter.to_string()))
                .or_insert_with(|| ImageRecord::derived(filename, format, filter))
                .clone()
        };

        self.persist_detached();
        record
    }

    pub fn get(&self, filename: &str) -> Option<ImageRecord> {
        self.records.read().get(filename).cloned()
    }

    /// All records, ordered by filename.
    pub fn records(&self) -> Vec<ImageRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        records
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Serialize the whole catalog and replace the catalog file.
    pub fn persist(&self) -> pixelforge_common::Result<()> {
        let _guard = self.persist_lock.lock();

        let snapshot: BTreeMap<String, ImageRecord> = self
            .records
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::persistence(format!("failed to serialize catalog: {}", e)))?;

        let dir = match self.catalog_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::persistence(format!("failed to create temp file: {}", e)))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence(format!("failed to write catalog: {}", e)))?;
        tmp.persist(&self.catalog_path).map_err(|e| {
            Error::persistence(format!(
                "failed to replace {:?}: {}",
                self.catalog_path, e.error
            ))
        })?;

        tracing::debug!(records = snapshot.len(), "Persisted catalog");
        Ok(())
    }

    fn persist_detached(self: &Arc<Self>) {
        let store = Arc::clone(self);
        self.persists.spawn_blocking(move || {
            if let Err(e) = store.persist() {
                tracing::error!("Failed to persist catalog: {}", e);
                store.log.log(format!("could not persist catalog: {}", e));
            }
        });
    }

    /// Wait until every persist scheduled so far has finished.
    ///
    /// Intended for shutdown and tests; concurrent callers are not supported.
    pub async fn settle(&self) {
        self.persists.close();
        self.persists.wait().await;
        self.persists.reopen();
    }

    /// Remove `filename` from the image directory.
    ///
    /// The catalog entry is kept so the name's filter history survives.
    pub async fn delete(&self, filename: &str) -> pixelforge_common::Result<()> {
        check_file_name(filename)?;
        let path = self.image_dir.join(filename);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                self.log.log(format!(
                    "deleted image: {} from folder {}",
                    filename,
                    self.image_dir.display()
                ));
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.log.log(format!("could not delete image: {} (not found)", filename));
                Err(Error::not_found(filename))
            }
            Err(e) => {
                self.log.log(format!("could not delete image: {}: {}", filename, e));
                Err(Error::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<CatalogStore>) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("server").join("imginfo.json");
        CatalogStore::init_file(&catalog).unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        let log = LogSink::new(dir.path().join("log.txt"));
        let store = CatalogStore::load(&catalog, &images, log).unwrap();
        (dir, store)
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = CatalogStore::load(
            dir.path().join("nope.json"),
            dir.path(),
            LogSink::new(dir.path().join("log.txt")),
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Failed to read catalog file"));
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imginfo.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = CatalogStore::load(&path, dir.path(), LogSink::new(dir.path().join("l")));
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Failed to parse catalog file"));
    }

    #[test]
    fn test_init_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("imginfo.json");
        assert!(CatalogStore::init_file(&path).unwrap());
        std::fs::write(&path, "{\"x.png\":{\"filename\":\"x.png\",\"format\":\"png\",\"original\":true,\"filters\":[]}}").unwrap();
        assert!(!CatalogStore::init_file(&path).unwrap());
        let store = CatalogStore::load(&path, dir.path(), LogSink::new(dir.path().join("l"))).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("x.png").unwrap().original);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_appends() {
        let (_dir, store) = setup();

        let first = store.upsert("blur_cat.png", ImageFormat::Png, "blur");
        assert_eq!(first, ImageRecord::derived("blur_cat.png", ImageFormat::Png, "blur"));

        let second = store.upsert("blur_cat.png", ImageFormat::Png, "invert");
        assert_eq!(second.filters, vec!["blur", "invert"]);

        let third = store.upsert("blur_cat.png", ImageFormat::Png, "blur");
        assert_eq!(third.filters, vec!["blur", "invert", "blur"]);
        assert!(!third.original);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_persists_in_background() {
        let (_dir, store) = setup();
        store.upsert("gray_dog.jpg", ImageFormat::Jpeg, "gray");
        store.settle().await;

        let content = std::fs::read_to_string(store.catalog_path()).unwrap();
        let on_disk: HashMap<String, ImageRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(on_disk["gray_dog.jpg"].filters, vec!["gray"]);
        assert_eq!(on_disk["gray_dog.jpg"].format, ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_persist_failure_is_logged_not_raised() {
        let (dir, store) = setup();
        // Replace the catalog's directory with a file so the temp file cannot be created.
        std::fs::remove_dir_all(dir.path().join("server")).unwrap();
        std::fs::write(dir.path().join("server"), b"blocker").unwrap();

        let record = store.upsert("invert_a.png", ImageFormat::Png, "invert");
        assert_eq!(record.filters, vec!["invert"]);
        store.settle().await;

        assert_matches!(store.persist(), Err(Error::Persistence(_)));
        assert_eq!(store.log.pending(), 1);
        assert_eq!(store.get("invert_a.png"), Some(record));
    }

    #[tokio::test]
    async fn test_delete_removes_file_keeps_record() {
        let (_dir, store) = setup();
        let path = store.image_dir().join("invert_a.png");
        std::fs::write(&path, b"png").unwrap();
        store.upsert("invert_a.png", ImageFormat::Png, "invert");

        store.delete("invert_a.png").await.unwrap();
        assert!(!path.exists());
        assert!(store.get("invert_a.png").is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, store) = setup();
        assert_matches!(store.delete("ghost.png").await, Err(Error::NotFound(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let (dir, store) = setup();
        let outside = dir.path().join("secret.txt");
        std::fs::write(&outside, b"keep").unwrap();

        assert_matches!(store.delete("../secret.txt").await, Err(Error::Validation(_)));
        assert!(outside.exists());
    }

    #[test]
    fn test_records_sorted() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (_dir, store) = setup();
            for name in ["c.png", "a.png", "b.png"] {
                store.upsert(name, ImageFormat::Png, "gray");
            }
            let names: Vec<_> = store.records().into_iter().map(|r| r.filename).collect();
            assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
            store.settle().await;
        });
    }
}
