//! Vibeforge presentation layer: front-end state plus pure views over the
//! application and version records.

pub mod models;
pub mod state;
pub mod templates;
pub mod views;

pub use models::{classify, ModelCatalog, ModelInfo, Provider};
pub use state::AppState;
pub use templates::{categories, find_template, templates_in, Template, TEMPLATES};
pub use views::{all_tags, analytics, filter_apps, sort_apps, visible_apps, Analytics, SortBy};
