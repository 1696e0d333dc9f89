// Build / deploy / version pipeline
//
// initial_deploy: chat -> extract -> validate -> mkdir + write -> host ->
//                 register -> app record + version 1
// redeploy:       (cleanup) -> mkdir + write -> re-host same subdomain ->
//                 (registry update) -> version n+1 + record update
// delete_app:     (dir) -> (registry) -> (hosting) -> versions -> record
//
// Steps in parentheses are best-effort. External side effects are never
// rolled back; the record commit happens at most once, after everything
// else succeeded.

use forge_utils::{time::now_millis, ActivityLog, ApplicationRecord, VersionRecord};
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::extractor::extract_code;
use super::validator::validate_html;
use crate::integrations::{ChatMessage, ChatOptions, NewApp, Platform, RegisteredApp, User};
use crate::persistence::{PersistenceError, RecordStore};

/// Input of an initial deployment
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub prompt: String,
    /// Desired registry name; also the subdomain source
    pub name: String,
    pub title: String,
    /// Falls back to the configured default model
    pub model: Option<String>,
    pub tags: BTreeSet<String>,
}

/// A successful (re)deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub record: ApplicationRecord,
    pub hosted_url: String,
}

/// How an application was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// The registry launched it by name
    Launched(String),
    /// Caller should open this URL itself
    OpenUrl(String),
}

/// Outcome of a bulk deletion, one entry per requested id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
    pub missing: Vec<Uuid>,
}

/// Lower-case and keep only `[a-z0-9-]`
pub fn sanitize_subdomain(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

fn fallback_title(prompt: &str, max_chars: usize) -> String {
    prompt.trim().chars().take(max_chars).collect()
}

pub struct DeploymentPipeline {
    platform: Platform,
    records: RecordStore,
    config: PipelineConfig,
    activity: Arc<ActivityLog>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
    last_dir_stamp: AtomicI64,
}

impl DeploymentPipeline {
    pub fn new(platform: Platform, records: RecordStore, config: PipelineConfig) -> Self {
        let activity = Arc::new(ActivityLog::with_capacity(config.activity_capacity));
        Self {
            platform,
            records,
            config,
            activity,
            locks: Mutex::new(HashMap::new()),
            last_dir_stamp: AtomicI64::new(0),
        }
    }

    pub fn activity(&self) -> Arc<ActivityLog> {
        self.activity.clone()
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub async fn sign_in(&self) -> PipelineResult<User> {
        let user = self.surface(self.platform.auth.sign_in().await.map_err(PipelineError::from))?;
        self.activity.info(format!("Welcome {}", user.username));
        Ok(user)
    }

    /// Signed-in user, if any
    pub async fn current_user(&self) -> Option<User> {
        if !self.platform.auth.is_signed_in().await {
            return None;
        }
        self.platform.auth.get_user().await.ok()
    }

    /// Generate, host, register and record a new application.
    ///
    /// Returns `Ok(None)` without doing anything when the prompt is blank or
    /// no one is signed in.
    pub async fn initial_deploy(&self, request: &DeployRequest) -> PipelineResult<Option<Deployment>> {
        if request.prompt.trim().is_empty() {
            return Ok(None);
        }
        if !self.platform.auth.is_signed_in().await {
            warn!("Vibeforge: initial deploy skipped, not signed in");
            return Ok(None);
        }

        self.activity.clear();
        let result = self.run_initial_deploy(request).await;
        self.surface(result).map(Some)
    }

    async fn run_initial_deploy(&self, request: &DeployRequest) -> PipelineResult<Deployment> {
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_model.as_str())
            .to_string();
        self.activity.info(format!("Model: {}", model));
        self.activity.info("Generating code...");

        let messages = [
            ChatMessage::system(self.config.system_prompt.as_str()),
            ChatMessage::user(format!("Build: {}", request.prompt)),
        ];
        let response = self
            .platform
            .chat
            .chat(&messages, &ChatOptions { model: model.clone() })
            .await?;

        let code = extract_code(&response.content);
        validate_html(&code)?;
        self.activity.info(format!("Generated {} bytes", code.len()));

        self.activity.info("Creating directory...");
        let dir = self.fresh_dir_name();
        let index = self.config.index_path(&dir);
        self.platform.fs.mkdir(&dir).await?;
        self.platform.fs.write(&index, &code).await?;
        self.activity.info(format!("Wrote to {}", index));

        self.activity.info("Creating hosted site...");
        let subdomain = match sanitize_subdomain(&request.name) {
            s if s.is_empty() => self.platform.names.random_name(),
            s => s,
        };
        let site = self.platform.hosting.create(&subdomain, &dir).await?;
        let hosted_url = self.config.hosted_url(&site.subdomain);
        self.activity.info(format!("Hosted at: {}", hosted_url));

        self.activity.info("Registering app...");
        let app_name = match request.name.trim() {
            "" => self.platform.names.random_name(),
            name => name.to_string(),
        };
        let app_title = match request.title.trim() {
            "" => fallback_title(&request.prompt, self.config.title_fallback_chars),
            title => title.to_string(),
        };
        let registered = self
            .register_app(app_name, &hosted_url, &app_title, &request.prompt)
            .await?;

        self.activity.info("Saving to database...");
        let now = now_millis();
        let record = ApplicationRecord {
            id: None,
            prompt: request.prompt.clone(),
            code: code.clone(),
            subdomain: site.subdomain,
            hosted_url: hosted_url.clone(),
            app_name: registered.name,
            app_uid: registered.uid,
            app_title,
            model,
            dir,
            created_at: now,
            updated_at: None,
            views: 0,
            favorite: false,
            tags: request.tags.clone(),
            version: 1,
            imported: false,
        };
        let saved = self.records.create_app(record).await?;
        let app_id = saved.id.ok_or(PipelineError::Unsaved)?;
        self.records.append_version(app_id, &code, 1).await?;

        info!(
            "Vibeforge: deployed {} ({}) at {}",
            saved.app_name, app_id, hosted_url
        );
        self.activity.success("Complete!");
        Ok(Deployment {
            record: saved,
            hosted_url,
        })
    }

    /// Register with the desired name, retrying once under a random name if
    /// it is taken.
    async fn register_app(
        &self,
        name: String,
        hosted_url: &str,
        title: &str,
        prompt: &str,
    ) -> PipelineResult<RegisteredApp> {
        let app = NewApp {
            name,
            index_url: hosted_url.to_string(),
            title: title.to_string(),
            description: prompt.to_string(),
            maximize_on_start: true,
            dedupe_name: true,
        };

        match self.platform.apps.create(&app).await {
            Ok(registered) => {
                self.activity.info(format!("App registered: {}", registered.name));
                Ok(registered)
            }
            Err(e) if e.is_name_conflict() => {
                let retry = NewApp {
                    name: self.platform.names.random_name(),
                    dedupe_name: false,
                    ..app
                };
                self.activity
                    .warning(format!("Name taken, using random name {}", retry.name));
                let registered = self.platform.apps.create(&retry).await?;
                self.activity.info(format!("App registered: {}", registered.name));
                Ok(registered)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Publish `new_code` as the next version of `existing`.
    ///
    /// Returns `Ok(None)` without doing anything when the code is blank or
    /// no one is signed in. Fails with `VersionConflict` if the stored
    /// record is no longer at `existing.version`.
    pub async fn redeploy(
        &self,
        existing: &ApplicationRecord,
        new_code: &str,
        tags: &BTreeSet<String>,
    ) -> PipelineResult<Option<Deployment>> {
        if new_code.trim().is_empty() {
            return Ok(None);
        }
        if !self.platform.auth.is_signed_in().await {
            warn!("Vibeforge: redeploy skipped, not signed in");
            return Ok(None);
        }
        let app_id = self.surface(existing.id.ok_or(PipelineError::Unsaved))?;

        let lock = self.lock_for(app_id);
        let result = {
            let _guard = lock.lock().await;
            self.run_redeploy(app_id, existing, new_code, tags).await
        };
        if matches!(result, Err(PipelineError::Storage(PersistenceError::NotFound(_)))) {
            self.forget_lock(app_id);
        }
        self.surface(result).map(Some)
    }

    async fn run_redeploy(
        &self,
        app_id: Uuid,
        existing: &ApplicationRecord,
        new_code: &str,
        tags: &BTreeSet<String>,
    ) -> PipelineResult<Deployment> {
        self.stored_at_version(app_id, existing.version).await?;
        self.activity.info("Updating...");

        if !existing.dir.is_empty() {
            self.activity.info("Cleaning up old directory...");
            match self.platform.fs.rmdir(&existing.dir).await {
                Ok(()) => self.activity.info("Old directory removed"),
                Err(e) => {
                    warn!("Vibeforge: could not remove {}: {}", existing.dir, e);
                    self.activity.warning("Old directory already removed or not found");
                }
            }
        }

        let dir = self.fresh_dir_name();
        self.platform.fs.mkdir(&dir).await?;
        self.platform
            .fs
            .write(&self.config.index_path(&dir), new_code)
            .await?;

        let subdomain = if existing.subdomain.is_empty() {
            self.platform.names.random_name()
        } else {
            existing.subdomain.clone()
        };
        if let Err(e) = self.platform.hosting.delete(&subdomain).await {
            debug!("Vibeforge: hosting delete for {} failed: {}", subdomain, e);
        }
        let site = self.platform.hosting.create(&subdomain, &dir).await?;
        let hosted_url = self.config.hosted_url(&site.subdomain);

        if !existing.app_name.is_empty() {
            match self
                .platform
                .apps
                .update_index_url(&existing.app_name, &hosted_url)
                .await
            {
                Ok(()) => self
                    .activity
                    .info(format!("Updated app: {}", existing.app_name)),
                Err(e) => warn!(
                    "Vibeforge: registry update for {} failed: {}",
                    existing.app_name, e
                ),
            }
        }

        // Commit gate: nothing below runs unless the stored record is still
        // where this run started.
        let mut updated = self.stored_at_version(app_id, existing.version).await?;
        let new_version = existing.version + 1;
        self.records
            .append_version(app_id, new_code, new_version)
            .await?;

        updated.code = new_code.to_string();
        updated.dir = dir;
        updated.subdomain = site.subdomain;
        updated.hosted_url = hosted_url.clone();
        updated.updated_at = Some(now_millis());
        updated.version = new_version;
        updated.tags = tags.clone();
        let saved = self.records.update_app(&updated).await?;

        info!("Vibeforge: {} updated to v{}", app_id, new_version);
        self.activity.success(format!("Updated to v{}", new_version));
        Ok(Deployment {
            record: saved,
            hosted_url,
        })
    }

    /// Stored record, provided it is still at `expected`
    async fn stored_at_version(&self, app_id: Uuid, expected: u32) -> PipelineResult<ApplicationRecord> {
        let stored = self.records.get_app(app_id).await?;
        if stored.version != expected {
            return Err(PipelineError::VersionConflict {
                app_id,
                expected,
                found: stored.version,
            });
        }
        Ok(stored)
    }

    /// Tear down an application's external resources and delete its records.
    ///
    /// Directory, registry and hosting removal are each best-effort; the
    /// version records and the application record are always deleted.
    pub async fn delete_app(&self, record: &ApplicationRecord) -> PipelineResult<()> {
        let app_id = self.surface(record.id.ok_or(PipelineError::Unsaved))?;
        let lock = self.lock_for(app_id);
        let result = {
            let _guard = lock.lock().await;
            self.run_delete(app_id, record).await
        };
        self.forget_lock(app_id);
        self.surface(result)
    }

    async fn run_delete(&self, app_id: Uuid, record: &ApplicationRecord) -> PipelineResult<()> {
        let label = if record.app_name.is_empty() {
            &record.subdomain
        } else {
            &record.app_name
        };
        self.activity.info(format!("Deleting {}...", label));

        if !record.dir.is_empty() {
            match self.platform.fs.rmdir(&record.dir).await {
                Ok(()) => self.activity.info("Directory removed"),
                Err(e) => {
                    debug!("Vibeforge: rmdir {} failed: {}", record.dir, e);
                    self.activity.warning("Directory already removed or not found");
                }
            }
        }
        if !record.app_name.is_empty() {
            if let Err(e) = self.platform.apps.delete(&record.app_name).await {
                debug!("Vibeforge: registry delete {} failed: {}", record.app_name, e);
            }
        }
        if !record.subdomain.is_empty() {
            if let Err(e) = self.platform.hosting.delete(&record.subdomain).await {
                debug!("Vibeforge: hosting delete {} failed: {}", record.subdomain, e);
            }
        }

        let removed = self.records.delete_app(app_id).await?;
        info!("Vibeforge: deleted {} and {} versions", app_id, removed);
        self.activity.success("Deleted");
        Ok(())
    }

    /// Delete applications one at a time. A failure is recorded and the
    /// batch moves on; nothing is retried.
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        for &id in ids {
            let record = match self.records.get_app(id).await {
                Ok(record) => record,
                Err(PersistenceError::NotFound(_)) | Err(PersistenceError::WrongKind { .. }) => {
                    report.missing.push(id);
                    continue;
                }
                Err(e) => {
                    report.failed.push((id, e.to_string()));
                    continue;
                }
            };
            match self.delete_app(&record).await {
                Ok(()) => report.deleted.push(id),
                Err(e) => report.failed.push((id, e.to_string())),
            }
        }
        report
    }

    /// Count a view, then ask the registry to launch the app. Falls back to
    /// the hosted URL when the app has no registry entry or launch fails.
    pub async fn launch(&self, record: &ApplicationRecord) -> PipelineResult<Launch> {
        let record = self.surface(
            self.records
                .increment_views(record)
                .await
                .map_err(PipelineError::from),
        )?;

        if record.app_name.is_empty() {
            return Ok(Launch::OpenUrl(record.hosted_url));
        }
        match self.platform.apps.launch(&record.app_name).await {
            Ok(()) => {
                self.activity.info(format!("Launched: {}", record.app_name));
                Ok(Launch::Launched(record.app_name))
            }
            Err(e) => {
                debug!("Vibeforge: launch {} failed: {}", record.app_name, e);
                Ok(Launch::OpenUrl(record.hosted_url))
            }
        }
    }

    pub async fn toggle_favorite(&self, record: &ApplicationRecord) -> PipelineResult<ApplicationRecord> {
        self.surface(
            self.records
                .toggle_favorite(record)
                .await
                .map_err(PipelineError::from),
        )
    }

    /// History of one application, highest version first
    pub async fn versions_for(&self, app_id: Uuid) -> PipelineResult<Vec<VersionRecord>> {
        self.surface(
            self.records
                .versions_for(app_id)
                .await
                .map_err(PipelineError::from),
        )
    }

    /// Log a surfaced error to the activity log
    pub(crate) fn surface<T>(&self, result: PipelineResult<T>) -> PipelineResult<T> {
        if let Err(e) = &result {
            error!("Vibeforge: {}", e);
            self.activity.error(format!("Error: {}", e));
        }
        result
    }

    fn lock_for(&self, app_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(app_id)
            .or_default()
            .clone()
    }

    fn forget_lock(&self, app_id: Uuid) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&app_id);
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `app_{ms}`, strictly increasing even within one millisecond
    fn fresh_dir_name(&self) -> String {
        let now = now_millis();
        let previous = self
            .last_dir_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        format!("{}{}", self.config.dir_prefix, now.max(previous + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_subdomain() {
        assert_eq!(sanitize_subdomain("  My Cool_App! 2 "), "mycoolapp2");
        assert_eq!(sanitize_subdomain("todo-list"), "todo-list");
        assert_eq!(sanitize_subdomain("Ünïcödé"), "ncd");
        assert_eq!(sanitize_subdomain("!!!"), "");
    }

    #[test]
    fn test_fallback_title_counts_chars() {
        assert_eq!(fallback_title("  short ", 50), "short");
        let long = "é".repeat(80);
        assert_eq!(fallback_title(&long, 50).chars().count(), 50);
    }
}
