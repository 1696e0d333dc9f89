// Record store: application and version records on top of a document store

use super::{
    error::{PersistenceError, PersistenceResult},
    models::{Document, DocumentKind},
    postgres::PgStore,
    store::{DocumentStore, JsonFileStore, MemoryStore},
};
use forge_utils::{time::now_millis, ApplicationRecord, VersionRecord};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Application record store plus the append-only version log.
///
/// There are no multi-document transactions: creating an app and its first
/// version, or appending a version and advancing the app, are separate
/// writes.
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn DocumentStore>,
    is_durable: bool,
}

impl RecordStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            is_durable: true,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            is_durable: false,
        }
    }

    /// Pick a backend: PostgreSQL when a URL is given and reachable, else a
    /// JSON snapshot file, else memory. Never fails; a broken backend only
    /// downgrades durability.
    pub async fn connect(database_url: Option<String>, snapshot: Option<PathBuf>) -> Self {
        if let Some(url) = database_url {
            match PgStore::connect(&url).await {
                Ok(store) => return Self::new(Arc::new(store)),
                Err(e) => {
                    warn!("Vibeforge: Failed to open PostgreSQL store: {}", e);
                    warn!("Vibeforge: Falling back to local snapshot storage");
                }
            }
        }

        if let Some(path) = snapshot {
            match JsonFileStore::open(&path).await {
                Ok(store) => {
                    info!("Vibeforge: Using snapshot store at {}", path.display());
                    return Self::new(Arc::new(store));
                }
                Err(e) => {
                    warn!("Vibeforge: Snapshot store unavailable: {}", e);
                }
            }
        }

        warn!("Vibeforge: Records will not outlive this process");
        Self::in_memory()
    }

    pub fn is_durable(&self) -> bool {
        self.is_durable
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Write a new application record and return it with its id
    pub async fn create_app(&self, mut record: ApplicationRecord) -> PersistenceResult<ApplicationRecord> {
        record.id = None;
        let id = self.store.put(Document::App(record)).await?;
        self.get_app(id).await
    }

    /// Replace a stored application record
    pub async fn update_app(&self, record: &ApplicationRecord) -> PersistenceResult<ApplicationRecord> {
        let id = record.id.ok_or(PersistenceError::Unsaved)?;
        self.store.put(Document::App(record.clone())).await?;
        self.get_app(id).await
    }

    pub async fn get_app(&self, id: Uuid) -> PersistenceResult<ApplicationRecord> {
        self.store
            .get(id)
            .await?
            .into_app()
            .ok_or(PersistenceError::WrongKind { id, expected: "app" })
    }

    /// Applications, most recently created first
    pub async fn list_apps(&self) -> PersistenceResult<Vec<ApplicationRecord>> {
        Ok(self
            .store
            .query(DocumentKind::App)
            .await?
            .into_iter()
            .filter_map(Document::into_app)
            .collect())
    }

    /// Every version record, most recently appended first
    pub async fn list_versions(&self) -> PersistenceResult<Vec<VersionRecord>> {
        Ok(self
            .store
            .query(DocumentKind::Version)
            .await?
            .into_iter()
            .filter_map(Document::into_version)
            .collect())
    }

    /// Versions of one application, highest version first
    pub async fn versions_for(&self, app_id: Uuid) -> PersistenceResult<Vec<VersionRecord>> {
        let mut versions: Vec<VersionRecord> = self
            .list_versions()
            .await?
            .into_iter()
            .filter(|v| v.app_id == app_id)
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    pub async fn find_version(&self, app_id: Uuid, version: u32) -> PersistenceResult<Option<VersionRecord>> {
        Ok(self
            .versions_for(app_id)
            .await?
            .into_iter()
            .find(|v| v.version == version))
    }

    /// Append one snapshot to an application's history
    pub async fn append_version(
        &self,
        app_id: Uuid,
        code: &str,
        version: u32,
    ) -> PersistenceResult<VersionRecord> {
        let record = VersionRecord {
            id: None,
            app_id,
            code: code.to_string(),
            version,
            created_at: now_millis(),
            note: VersionRecord::note_for(version),
        };
        let id = self.store.put(Document::Version(record)).await?;
        self.store
            .get(id)
            .await?
            .into_version()
            .ok_or(PersistenceError::WrongKind {
                id,
                expected: "version",
            })
    }

    /// Remove every version of the application, then the application.
    ///
    /// Returns the number of version records removed.
    pub async fn delete_app(&self, app_id: Uuid) -> PersistenceResult<usize> {
        let versions = self.versions_for(app_id).await?;
        let removed = versions.len();
        for version in versions {
            if let Some(id) = version.id {
                self.store.del(id).await?;
            }
        }
        self.store.del(app_id).await?;
        Ok(removed)
    }

    /// Flip the favorite flag on the stored copy of `record`
    pub async fn toggle_favorite(&self, record: &ApplicationRecord) -> PersistenceResult<ApplicationRecord> {
        let mut stored = self.get_app(record.id.ok_or(PersistenceError::Unsaved)?).await?;
        stored.favorite = !stored.favorite;
        self.update_app(&stored).await
    }

    pub async fn increment_views(&self, record: &ApplicationRecord) -> PersistenceResult<ApplicationRecord> {
        let mut stored = self.get_app(record.id.ok_or(PersistenceError::Unsaved)?).await?;
        stored.views = stored.views.saturating_add(1);
        self.update_app(&stored).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_app(prompt: &str) -> ApplicationRecord {
        ApplicationRecord {
            id: None,
            prompt: prompt.to_string(),
            code: "<!DOCTYPE html><html><head></head><body></body></html>".to_string(),
            subdomain: "sample".to_string(),
            hosted_url: "https://sample.puter.site".to_string(),
            app_name: "sample".to_string(),
            app_uid: "uid-sample".to_string(),
            app_title: "Sample".to_string(),
            model: "gpt-4o-mini".to_string(),
            dir: "app_1".to_string(),
            created_at: now_millis(),
            updated_at: None,
            views: 0,
            favorite: false,
            tags: BTreeSet::new(),
            version: 1,
            imported: false,
        }
    }

    #[tokio::test]
    async fn test_connect_without_backends_degrades_to_memory() {
        let records = RecordStore::connect(None, None).await;
        assert!(!records.is_durable());
        assert_eq!(records.backend(), "memory");

        let app = records.create_app(sample_app("todo")).await.unwrap();
        assert!(app.id.is_some());
    }

    #[tokio::test]
    async fn test_connect_with_snapshot_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let records = RecordStore::connect(None, Some(dir.path().join("db.json"))).await;
        assert!(records.is_durable());
        assert_eq!(records.backend(), "json-file");
    }

    #[tokio::test]
    async fn test_versions_for_sorted_descending() {
        let records = RecordStore::in_memory();
        let app = records.create_app(sample_app("notes")).await.unwrap();
        let other = records.create_app(sample_app("other")).await.unwrap();
        let app_id = app.id.unwrap();

        records.append_version(app_id, "one", 1).await.unwrap();
        records.append_version(other.id.unwrap(), "x", 1).await.unwrap();
        records.append_version(app_id, "two", 2).await.unwrap();

        let versions = records.versions_for(app_id).await.unwrap();
        assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(versions[0].note, "Version 2");
        assert_eq!(
            records.find_version(app_id, 1).await.unwrap().unwrap().code,
            "one"
        );
        assert!(records.find_version(app_id, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_app_leaves_no_orphans() {
        let records = RecordStore::in_memory();
        let app = records.create_app(sample_app("kanban")).await.unwrap();
        let keep = records.create_app(sample_app("keep")).await.unwrap();
        let app_id = app.id.unwrap();
        for v in 1..=3 {
            records.append_version(app_id, "code", v).await.unwrap();
        }
        records.append_version(keep.id.unwrap(), "code", 1).await.unwrap();

        assert_eq!(records.delete_app(app_id).await.unwrap(), 3);

        let remaining = records.list_versions().await.unwrap();
        assert!(remaining.iter().all(|v| v.app_id != app_id));
        assert_eq!(remaining.len(), 1);
        assert!(matches!(
            records.get_app(app_id).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_favorite_and_views() {
        let records = RecordStore::in_memory();
        let app = records.create_app(sample_app("quiz")).await.unwrap();

        let app = records.toggle_favorite(&app).await.unwrap();
        assert!(app.favorite);
        let app = records.increment_views(&app).await.unwrap();
        let app = records.increment_views(&app).await.unwrap();
        assert_eq!(app.views, 2);
        assert!(app.favorite);
    }

    #[tokio::test]
    async fn test_update_unsaved_record_fails() {
        let records = RecordStore::in_memory();
        assert!(matches!(
            records.update_app(&sample_app("x")).await,
            Err(PersistenceError::Unsaved)
        ));
    }

    #[tokio::test]
    async fn test_get_app_rejects_version_document() {
        let records = RecordStore::in_memory();
        let version = records
            .append_version(Uuid::new_v4(), "code", 1)
            .await
            .unwrap();
        let id = version.id.unwrap();
        assert!(matches!(
            records.get_app(id).await,
            Err(PersistenceError::WrongKind { expected: "app", .. })
        ));
    }
}
