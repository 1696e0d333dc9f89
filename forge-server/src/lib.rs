//! Vibeforge server side: the build/deploy/version pipeline, the platform
//! capabilities it drives and the record store it commits to.

pub mod integrations;
pub mod persistence;
pub mod pipeline;

pub use pipeline::{DeployRequest, Deployment, DeploymentPipeline, PipelineConfig, PipelineError};
