// Stored document envelope
//
// Application and version records share one store and are told apart by
// their `type` field, the index every listing query runs on.

use forge_utils::{ApplicationRecord, VersionRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Value of the indexed `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    App,
    Version,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::App => "app",
            DocumentKind::Version => "version",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Document {
    App(ApplicationRecord),
    Version(VersionRecord),
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::App(_) => DocumentKind::App,
            Document::Version(_) => DocumentKind::Version,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Document::App(app) => app.id,
            Document::Version(version) => version.id,
        }
    }

    pub fn set_id(&mut self, id: Uuid) {
        match self {
            Document::App(app) => app.id = Some(id),
            Document::Version(version) => version.id = Some(id),
        }
    }

    pub fn into_app(self) -> Option<ApplicationRecord> {
        match self {
            Document::App(app) => Some(app),
            Document::Version(_) => None,
        }
    }

    pub fn into_version(self) -> Option<VersionRecord> {
        match self {
            Document::Version(version) => Some(version),
            Document::App(_) => None,
        }
    }
}
