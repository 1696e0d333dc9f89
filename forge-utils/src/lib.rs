//! Types shared by the Vibeforge pipeline, its storage and its presentation
//! layer.

pub mod activity;
pub mod records;
pub mod time;

pub use activity::{ActivityEntry, ActivityLog, ActivityStyle};
pub use records::{ApplicationRecord, VersionRecord};
