// Vibeforge Integration Layer - Local Platform
//
// Runs the platform capabilities against the local machine: storage is a
// directory tree under the data dir, hosting and the app registry are tables
// persisted to `platform.json` next to it.

use async_trait::async_trait;
use names::Generator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::adapter::{
    AppRegistry, AuthProvider, ChatProvider, FileStorage, HostedSite, Hosting, NameGenerator,
    NewApp, Platform, RegisteredApp, User,
};
use super::error::{IntegrationError, IntegrationResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalTables {
    /// subdomain -> served directory
    sites: BTreeMap<String, String>,
    /// app name -> entry
    apps: BTreeMap<String, LocalApp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalApp {
    uid: String,
    #[serde(rename = "indexURL")]
    index_url: String,
    title: String,
    description: String,
}

pub struct LocalPlatform {
    root: PathBuf,
    username: String,
    tables: Mutex<LocalTables>,
}

impl LocalPlatform {
    /// Open the platform rooted at `data_dir`, loading any saved tables
    pub async fn open(data_dir: impl AsRef<Path>) -> IntegrationResult<Self> {
        let root = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join("files")).await?;

        let tables = match tokio::fs::read(root.join("platform.json")).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalTables::default(),
            Err(e) => return Err(e.into()),
        };

        let username = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
        Ok(Self {
            root,
            username,
            tables: Mutex::new(tables),
        })
    }

    /// Bundle with a chat backend into a full [`Platform`]
    pub fn into_platform(self: Arc<Self>, chat: Arc<dyn ChatProvider>) -> Platform {
        Platform {
            auth: self.clone(),
            chat,
            fs: self.clone(),
            hosting: self.clone(),
            apps: self.clone(),
            names: self,
        }
    }

    /// Directory storage paths resolve against
    pub fn files_root(&self) -> PathBuf {
        self.root.join("files")
    }

    /// Directory currently served under `subdomain`
    pub fn served_dir(&self, subdomain: &str) -> Option<PathBuf> {
        self.tables()
            .sites
            .get(subdomain)
            .map(|dir| self.files_root().join(dir))
    }

    fn tables(&self) -> MutexGuard<'_, LocalTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn save(&self) -> IntegrationResult<()> {
        let snapshot = serde_json::to_vec_pretty(&*self.tables())?;
        tokio::fs::write(self.root.join("platform.json"), snapshot).await?;
        Ok(())
    }

    /// Resolve a storage path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> IntegrationResult<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(IntegrationError::Filesystem(format!("invalid path: {}", path)));
        }
        Ok(self.files_root().join(relative))
    }
}

#[async_trait]
impl AuthProvider for LocalPlatform {
    async fn is_signed_in(&self) -> bool {
        true
    }

    async fn get_user(&self) -> IntegrationResult<User> {
        Ok(User {
            username: self.username.clone(),
        })
    }

    async fn sign_in(&self) -> IntegrationResult<User> {
        self.get_user().await
    }
}

#[async_trait]
impl FileStorage for LocalPlatform {
    async fn mkdir(&self, path: &str) -> IntegrationResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                IntegrationError::Filesystem(format!("{} already exists", path))
            }
            _ => e.into(),
        })
    }

    async fn write(&self, path: &str, content: &str) -> IntegrationResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> IntegrationResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_dir_all(&full).await?;
        Ok(())
    }
}

#[async_trait]
impl Hosting for LocalPlatform {
    async fn create(&self, subdomain: &str, dir: &str) -> IntegrationResult<HostedSite> {
        let full = self.resolve(dir)?;
        if !tokio::fs::try_exists(&full).await? {
            return Err(IntegrationError::NotFound(dir.to_string()));
        }
        {
            let mut tables = self.tables();
            if tables.sites.contains_key(subdomain) {
                return Err(IntegrationError::Hosting(format!(
                    "subdomain {} is already in use",
                    subdomain
                )));
            }
            tables.sites.insert(subdomain.to_string(), dir.to_string());
        }
        self.save().await?;
        Ok(HostedSite {
            subdomain: subdomain.to_string(),
        })
    }

    async fn delete(&self, subdomain: &str) -> IntegrationResult<()> {
        let removed = self.tables().sites.remove(subdomain).is_some();
        if !removed {
            return Err(IntegrationError::NotFound(subdomain.to_string()));
        }
        self.save().await
    }
}

#[async_trait]
impl AppRegistry for LocalPlatform {
    async fn create(&self, app: &NewApp) -> IntegrationResult<RegisteredApp> {
        let uid = format!("app-{}", Uuid::new_v4());
        {
            let mut tables = self.tables();
            if tables.apps.contains_key(&app.name) {
                return Err(IntegrationError::NameConflict(app.name.clone()));
            }
            tables.apps.insert(
                app.name.clone(),
                LocalApp {
                    uid: uid.clone(),
                    index_url: app.index_url.clone(),
                    title: app.title.clone(),
                    description: app.description.clone(),
                },
            );
        }
        self.save().await?;
        Ok(RegisteredApp {
            name: app.name.clone(),
            uid,
        })
    }

    async fn update_index_url(&self, name: &str, index_url: &str) -> IntegrationResult<()> {
        {
            let mut tables = self.tables();
            let app = tables
                .apps
                .get_mut(name)
                .ok_or_else(|| IntegrationError::NotFound(name.to_string()))?;
            app.index_url = index_url.to_string();
        }
        self.save().await
    }

    async fn delete(&self, name: &str) -> IntegrationResult<()> {
        let removed = self.tables().apps.remove(name).is_some();
        if !removed {
            return Err(IntegrationError::NotFound(name.to_string()));
        }
        self.save().await
    }

    async fn launch(&self, name: &str) -> IntegrationResult<()> {
        Err(IntegrationError::Registry(format!(
            "{} cannot be launched on the local platform",
            name
        )))
    }
}

impl NameGenerator for LocalPlatform {
    fn random_name(&self) -> String {
        Generator::default()
            .next()
            .unwrap_or_else(|| format!("app-{}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_app(name: &str) -> NewApp {
        NewApp {
            name: name.to_string(),
            index_url: format!("https://{}.localhost", name),
            title: name.to_string(),
            description: "d".to_string(),
            maximize_on_start: true,
            dedupe_name: true,
        }
    }

    #[tokio::test]
    async fn test_storage_round() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalPlatform::open(dir.path()).await.unwrap();

        local.mkdir("app_1").await.unwrap();
        assert!(local.mkdir("app_1").await.is_err());
        local.write("app_1/index.html", "<html></html>").await.unwrap();
        let written = std::fs::read_to_string(local.files_root().join("app_1/index.html")).unwrap();
        assert_eq!(written, "<html></html>");

        local.rmdir("app_1").await.unwrap();
        assert!(matches!(
            local.rmdir("app_1").await,
            Err(IntegrationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalPlatform::open(dir.path()).await.unwrap();
        assert!(matches!(
            local.mkdir("../outside").await,
            Err(IntegrationError::Filesystem(_))
        ));
        assert!(local.write("/etc/passwd", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_hosting_and_registry_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let local = LocalPlatform::open(dir.path()).await.unwrap();
            local.mkdir("app_1").await.unwrap();
            Hosting::create(&local, "clock", "app_1").await.unwrap();
            assert!(Hosting::create(&local, "clock", "app_1").await.is_err());
            AppRegistry::create(&local, &new_app("clock")).await.unwrap();
        }

        let reopened = LocalPlatform::open(dir.path()).await.unwrap();
        assert!(reopened.served_dir("clock").unwrap().ends_with("app_1"));
        let err = AppRegistry::create(&reopened, &new_app("clock"))
            .await
            .unwrap_err();
        assert!(err.is_name_conflict());
        reopened
            .update_index_url("clock", "https://clock.example")
            .await
            .unwrap();
        assert!(reopened.launch("clock").await.is_err());
        AppRegistry::delete(&reopened, "clock").await.unwrap();
        Hosting::delete(&reopened, "clock").await.unwrap();
        assert!(reopened.served_dir("clock").is_none());
    }

    #[tokio::test]
    async fn test_hosting_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalPlatform::open(dir.path()).await.unwrap();
        assert!(matches!(
            Hosting::create(&local, "ghost", "app_404").await,
            Err(IntegrationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_always_signed_in_with_names() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalPlatform::open(dir.path()).await.unwrap();
        assert!(local.is_signed_in().await);
        assert!(!local.sign_in().await.unwrap().username.is_empty());
        assert!(!local.random_name().is_empty());
    }
}
