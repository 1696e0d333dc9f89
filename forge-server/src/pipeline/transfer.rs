// Export, import and share links

use base64::{engine::general_purpose::STANDARD, Engine as _};
use forge_utils::{time::now_millis, ApplicationRecord};
use log::info;
use serde::{Deserialize, Serialize};

use super::deploy::DeploymentPipeline;
use super::error::{PipelineError, PipelineResult};

/// Contents of a share link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub prompt: String,
    pub code: String,
    pub title: String,
}

impl From<&ApplicationRecord> for SharePayload {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            prompt: record.prompt.clone(),
            code: record.code.clone(),
            title: record.app_title.clone(),
        }
    }
}

/// `{app_name}-export.json`, or `app-export.json` for unnamed apps
pub fn export_file_name(record: &ApplicationRecord) -> String {
    let name = if record.app_name.is_empty() {
        "app"
    } else {
        &record.app_name
    };
    format!("{}-export.json", name)
}

pub fn bulk_export_file_name(timestamp_ms: i64) -> String {
    format!("apps-export-{}.json", timestamp_ms)
}

/// Accepts a JSON array of records or a single record object
pub fn parse_import(text: &str) -> PipelineResult<Vec<ApplicationRecord>> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| PipelineError::ImportParse(e.to_string()))?;
    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Object(_) => serde_json::from_value(value).map(|r| vec![r]),
        _ => {
            return Err(PipelineError::ImportParse(
                "expected an application record or an array of them".to_string(),
            ))
        }
    };
    records.map_err(|e| PipelineError::ImportParse(e.to_string()))
}

pub fn share_link(origin: &str, record: &ApplicationRecord) -> PipelineResult<String> {
    let json = serde_json::to_vec(&SharePayload::from(record))
        .map_err(|e| PipelineError::InvalidShare(e.to_string()))?;
    Ok(format!("{}?share={}", origin, STANDARD.encode(json)))
}

/// Decode the `share` parameter of a link, or a whole link containing one
pub fn decode_share_payload(encoded: &str) -> PipelineResult<SharePayload> {
    let encoded = match encoded.split_once("share=") {
        Some((_, rest)) => rest.split('&').next().unwrap_or(rest),
        None => encoded,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| PipelineError::InvalidShare(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::InvalidShare(e.to_string()))
}

fn to_pretty<T: Serialize + ?Sized>(value: &T) -> PipelineResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Storage(crate::persistence::PersistenceError::from(e)))
}

impl DeploymentPipeline {
    /// Every application record as a pretty JSON array
    pub async fn export_all(&self) -> PipelineResult<String> {
        let apps = self.records().list_apps().await?;
        let json = to_pretty(&apps)?;
        self.activity().success(format!("Exported {} apps", apps.len()));
        Ok(json)
    }

    pub fn export_one(&self, record: &ApplicationRecord) -> PipelineResult<String> {
        let json = to_pretty(record)?;
        self.activity()
            .success(format!("Exported {}", record.display_name()));
        Ok(json)
    }

    /// Persist every record in `text` as a new application at version 1.
    ///
    /// The copy owns no directory, subdomain or registry entry, so deleting
    /// or redeploying it never touches the app it was exported from; its
    /// first redeploy publishes it under a fresh subdomain.
    ///
    /// Records are written one by one; a storage failure part-way leaves
    /// the earlier ones imported.
    pub async fn import_apps(&self, text: &str) -> PipelineResult<Vec<ApplicationRecord>> {
        let parsed = self.surface(parse_import(text))?;
        let mut imported = Vec::with_capacity(parsed.len());
        for record in parsed {
            let saved = self.surface(self.import_one(record).await)?;
            imported.push(saved);
        }
        info!("Vibeforge: imported {} apps", imported.len());
        self.activity()
            .success(format!("Imported {} apps", imported.len()));
        Ok(imported)
    }

    async fn import_one(&self, mut record: ApplicationRecord) -> PipelineResult<ApplicationRecord> {
        record.id = None;
        record.imported = true;
        record.created_at = now_millis();
        record.updated_at = None;
        record.version = 1;
        record.dir.clear();
        record.subdomain.clear();
        record.app_name.clear();
        record.app_uid.clear();

        let saved = self.records().create_app(record).await?;
        let app_id = saved.id.ok_or(PipelineError::Unsaved)?;
        self.records()
            .append_version(app_id, &saved.code, 1)
            .await?;
        Ok(saved)
    }
}
