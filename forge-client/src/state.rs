// Presentation state
//
// Everything a front end tracks between pipeline calls. The pipeline never
// sees this struct; callers read the fields they need out of it.

use forge_utils::{ActivityLog, ApplicationRecord, VersionRecord};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Provider;
use crate::templates::Template;
use crate::views::SortBy;

#[derive(Debug, Default)]
pub struct AppState {
    // Build form
    pub prompt: String,
    pub app_name: String,
    pub app_title: String,
    pub model: String,
    pub provider: Option<Provider>,
    pub selected_template: Option<&'static str>,
    /// Tags under edit, in the order they were added
    pub tags: Vec<String>,

    // Selection and editing
    pub selected_app: Option<ApplicationRecord>,
    /// Code waiting to be redeployed; empty when nothing is pending
    pub edit_code: String,
    pub generating: bool,

    // Library view
    pub search_query: String,
    pub sort_by: SortBy,
    pub favorites_only: bool,
    pub tag_filter: BTreeSet<String>,
    pub bulk_selection: BTreeSet<Uuid>,

    activity: Arc<ActivityLog>,
}

impl AppState {
    /// State sharing `activity` with the pipeline
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self {
            activity,
            ..Default::default()
        }
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Add a trimmed, non-empty tag once. Returns whether it was added.
    pub fn add_tag(&mut self, input: &str) -> bool {
        let tag = input.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn toggle_tag_filter(&mut self, tag: &str) {
        if !self.tag_filter.remove(tag) {
            self.tag_filter.insert(tag.to_string());
        }
    }

    pub fn tag_set(&self) -> BTreeSet<String> {
        self.tags.iter().cloned().collect()
    }

    pub fn select_template(&mut self, template: &Template) {
        self.selected_template = Some(template.id);
        self.prompt = template.prompt.to_string();
        self.app_title = template.name.to_string();
    }

    /// Select an application for viewing and editing; its tags become the
    /// tags under edit
    pub fn select_app(&mut self, record: ApplicationRecord) {
        self.tags = record.tags.iter().cloned().collect();
        self.selected_app = Some(record);
        self.edit_code.clear();
    }

    pub fn clear_selection(&mut self) {
        self.selected_app = None;
        self.edit_code.clear();
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected_app.as_ref().and_then(|app| app.id)
    }

    /// Load a version's code into the pending buffer. Nothing is persisted
    /// until the buffer is redeployed.
    ///
    /// Ignored unless `version` belongs to the selected application.
    pub fn restore_version(&mut self, version: &VersionRecord) -> bool {
        if self.selected_id() != Some(version.app_id) {
            return false;
        }
        self.edit_code = version.code.clone();
        self.activity.info(format!("Restored v{}", version.version));
        true
    }

    /// Pending buffer if non-empty, else the selected application's code
    pub fn display_code(&self) -> &str {
        if !self.edit_code.is_empty() {
            &self.edit_code
        } else {
            self.selected_app
                .as_ref()
                .map(|app| app.code.as_str())
                .unwrap_or("")
        }
    }

    pub fn pending_edit(&self) -> Option<&str> {
        Some(self.edit_code.as_str()).filter(|code| !code.trim().is_empty())
    }

    /// A build is starting: selection and pending edits are dropped
    pub fn begin_build(&mut self) {
        self.generating = true;
        self.clear_selection();
    }

    /// A build ended; on success the new app is selected and the form reset
    pub fn finish_build(&mut self, deployed: Option<ApplicationRecord>) {
        self.generating = false;
        if let Some(record) = deployed {
            self.selected_app = Some(record);
            self.prompt.clear();
            self.app_name.clear();
            self.app_title.clear();
            self.selected_template = None;
            self.tags.clear();
        }
    }

    pub fn begin_redeploy(&mut self) {
        self.generating = true;
    }

    /// A redeploy ended; on success the pending buffer is committed
    pub fn finish_redeploy(&mut self, updated: Option<ApplicationRecord>) {
        self.generating = false;
        if let Some(record) = updated {
            self.selected_app = Some(record);
            self.edit_code.clear();
        }
    }

    /// Keep the selected copy current after a record changed elsewhere
    pub fn record_updated(&mut self, record: &ApplicationRecord) {
        if record.id.is_some() && self.selected_id() == record.id {
            self.selected_app = Some(record.clone());
        }
    }

    pub fn record_deleted(&mut self, id: Uuid) {
        if self.selected_id() == Some(id) {
            self.clear_selection();
        }
        self.bulk_selection.remove(&id);
    }

    pub fn toggle_bulk(&mut self, id: Uuid) {
        if !self.bulk_selection.remove(&id) {
            self.bulk_selection.insert(id);
        }
    }

    /// Take the bulk selection, leaving it empty
    pub fn take_bulk(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.bulk_selection).into_iter().collect()
    }
}
