// Vibeforge Deployment Pipeline
//
// Turns a prompt into a hosted, registered and versioned application, and
// carries it through redeploys, launches and deletion.
//
// ```text
// prompt ──► chat ──► extract_code ──► validate_html ──► fs / hosting / apps
//                                                              │
//                                                              ▼
//                                            ApplicationRecord + VersionRecord
// ```

mod config;
mod deploy;
mod error;
mod extractor;
mod transfer;
mod validator;

pub use config::{PipelineConfig, SYSTEM_PROMPT};
pub use deploy::{
    sanitize_subdomain, BulkDeleteReport, DeployRequest, Deployment, DeploymentPipeline, Launch,
};
pub use error::{PipelineError, PipelineResult};
pub use extractor::extract_code;
pub use transfer::{
    bulk_export_file_name, decode_share_payload, export_file_name, parse_import, share_link,
    SharePayload,
};
pub use validator::{missing_elements, validate_html, MissingElement, ValidationError};

#[cfg(test)]
#[path = "./unit/deploy_tests.rs"]
mod deploy_tests;
