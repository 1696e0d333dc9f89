// Vibeforge record types
//
// Field names serialize in camelCase so exported backups stay readable by
// older builds and by hand-edited import files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

fn first_version() -> u32 {
    1
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Current state of one generated application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    /// Assigned by the document store on first write
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub prompt: String,
    pub code: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub hosted_url: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_uid: String,
    #[serde(default)]
    pub app_title: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub imported: bool,
}

impl ApplicationRecord {
    /// Title if set, otherwise the registry name
    pub fn display_name(&self) -> &str {
        if !self.app_title.is_empty() {
            &self.app_title
        } else if !self.app_name.is_empty() {
            &self.app_name
        } else {
            &self.subdomain
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Immutable code snapshot of an application at one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub app_id: Uuid,
    pub code: String,
    pub version: u32,
    pub created_at: i64,
    #[serde(default)]
    pub note: String,
}

impl VersionRecord {
    /// Note used for the snapshot taken at `version`
    pub fn note_for(version: u32) -> String {
        if version <= 1 {
            "Initial version".to_string()
        } else {
            format!("Version {}", version)
        }
    }
}
