// Document store backends
//
// The store is transactionless: every `put` is a single-document upsert and
// nothing spans two documents.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::error::{PersistenceError, PersistenceResult};
use super::models::{Document, DocumentKind};

/// Key-document store the record layer is written against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document. Documents without an id get a fresh one.
    async fn put(&self, doc: Document) -> PersistenceResult<Uuid>;

    /// Fetch one document by id
    async fn get(&self, id: Uuid) -> PersistenceResult<Document>;

    /// Remove one document. Removing a missing id is not an error.
    async fn del(&self, id: Uuid) -> PersistenceResult<()>;

    /// All documents of one kind, most recently inserted first
    async fn query(&self, kind: DocumentKind) -> PersistenceResult<Vec<Document>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Default)]
struct MemoryTable {
    next_seq: u64,
    // id -> (insertion sequence, document)
    docs: HashMap<Uuid, (u64, Document)>,
}

impl MemoryTable {
    fn put(&mut self, mut doc: Document) -> Uuid {
        let id = doc.id().unwrap_or_else(Uuid::new_v4);
        doc.set_id(id);
        let seq = match self.docs.get(&id) {
            Some((seq, _)) => *seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.docs.insert(id, (seq, doc));
        id
    }

    fn query(&self, kind: DocumentKind) -> Vec<Document> {
        let mut matching: Vec<&(u64, Document)> = self
            .docs
            .values()
            .filter(|(_, doc)| doc.kind() == kind)
            .collect();
        matching.sort_by(|a, b| b.0.cmp(&a.0));
        matching.into_iter().map(|(_, doc)| doc.clone()).collect()
    }

    fn ordered(&self) -> Vec<Document> {
        let mut all: Vec<&(u64, Document)> = self.docs.values().collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, doc)| doc.clone()).collect()
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<MemoryTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, MemoryTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored documents of every kind
    pub fn len(&self) -> usize {
        self.table().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, doc: Document) -> PersistenceResult<Uuid> {
        Ok(self.table().put(doc))
    }

    async fn get(&self, id: Uuid) -> PersistenceResult<Document> {
        self.table()
            .docs
            .get(&id)
            .map(|(_, doc)| doc.clone())
            .ok_or(PersistenceError::NotFound(id))
    }

    async fn del(&self, id: Uuid) -> PersistenceResult<()> {
        self.table().docs.remove(&id);
        Ok(())
    }

    async fn query(&self, kind: DocumentKind) -> PersistenceResult<Vec<Document>> {
        Ok(self.table().query(kind))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Memory store snapshotted to a JSON file after every write.
///
/// The snapshot is an array in insertion order, so reloading keeps the
/// listing order stable.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<MemoryTable>,
}

impl JsonFileStore {
    /// Open (or create on first write) the snapshot at `path`
    pub async fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut table = MemoryTable::default();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let docs: Vec<Document> = serde_json::from_slice(&bytes)?;
                for doc in docs {
                    table.put(doc);
                }
                log::debug!(
                    "Vibeforge: loaded {} documents from {}",
                    table.docs.len(),
                    path.display()
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&self) -> MutexGuard<'_, MemoryTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn flush(&self) -> PersistenceResult<()> {
        let snapshot = serde_json::to_vec_pretty(&self.table().ordered())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, snapshot).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn put(&self, doc: Document) -> PersistenceResult<Uuid> {
        let id = self.table().put(doc);
        self.flush().await?;
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> PersistenceResult<Document> {
        self.table()
            .docs
            .get(&id)
            .map(|(_, doc)| doc.clone())
            .ok_or(PersistenceError::NotFound(id))
    }

    async fn del(&self, id: Uuid) -> PersistenceResult<()> {
        let removed = self.table().docs.remove(&id).is_some();
        if removed {
            self.flush().await?;
        }
        Ok(())
    }

    async fn query(&self, kind: DocumentKind) -> PersistenceResult<Vec<Document>> {
        Ok(self.table().query(kind))
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_utils::VersionRecord;

    fn version_doc(app_id: Uuid, version: u32) -> Document {
        Document::Version(VersionRecord {
            id: None,
            app_id,
            code: format!("v{}", version),
            version,
            created_at: version as i64,
            note: VersionRecord::note_for(version),
        })
    }

    #[tokio::test]
    async fn test_put_assigns_id_and_get_returns_it() {
        let store = MemoryStore::new();
        let id = store.put(version_doc(Uuid::new_v4(), 1)).await.unwrap();

        let doc = store.get(id).await.unwrap();
        assert_eq!(doc.id(), Some(id));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_put_with_id_is_upsert() {
        let store = MemoryStore::new();
        let app_id = Uuid::new_v4();
        let id = store.put(version_doc(app_id, 1)).await.unwrap();

        let mut doc = store.get(id).await.unwrap();
        if let Document::Version(v) = &mut doc {
            v.note = "edited".to_string();
        }
        assert_eq!(store.put(doc).await.unwrap(), id);
        assert_eq!(store.len(), 1);

        let stored = store.get(id).await.unwrap().into_version().unwrap();
        assert_eq!(stored.note, "edited");
    }

    #[tokio::test]
    async fn test_query_is_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let app_id = Uuid::new_v4();
        for v in 1..=3 {
            store.put(version_doc(app_id, v)).await.unwrap();
        }
        let app: Document =
            serde_json::from_str(r#"{"type": "app", "prompt": "p", "code": "c"}"#).unwrap();
        store.put(app).await.unwrap();

        let versions = store.query(DocumentKind::Version).await.unwrap();
        let numbers: Vec<u32> = versions
            .into_iter()
            .filter_map(Document::into_version)
            .map(|v| v.version)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert_eq!(store.query(DocumentKind::App).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(PersistenceError::NotFound(missing)) if missing == id
        ));
        assert!(store.del(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let app_id = Uuid::new_v4();

        let first_id = {
            let store = JsonFileStore::open(&path).await.unwrap();
            let first = store.put(version_doc(app_id, 1)).await.unwrap();
            let second = store.put(version_doc(app_id, 2)).await.unwrap();
            store.del(second).await.unwrap();
            store.put(version_doc(app_id, 3)).await.unwrap();
            first
        };

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let versions: Vec<u32> = reopened
            .query(DocumentKind::Version)
            .await
            .unwrap()
            .into_iter()
            .filter_map(Document::into_version)
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![3, 1]);
        assert!(reopened.get(first_id).await.is_ok());
    }
}
