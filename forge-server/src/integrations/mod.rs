// Vibeforge Integration Layer
//
// Capability interfaces for the external platform the pipeline delegates to:
//
// - Authentication (who is deploying)
// - Chat inference (prompt -> HTML document)
// - File storage, site hosting and the app registry
// - Random names for subdomains and apps
//
// # Architecture
//
// ```text
// DeploymentPipeline
//         │
//         ▼
// ┌───────────────────┐
// │     Platform      │  ← Bundle of capability trait objects
// └───────────────────┘
//         │
//         ▼
// ┌───────────────────┐
// │ Local / Mock / …  │  ← Implementations (+ HttpChat for inference)
// └───────────────────┘
// ```
//
// For testing:
// ```ignore
// let mock = Arc::new(MockPlatform::signed_in("tester"));
// mock.reserve_app_name("todo");
// let platform = Platform::from_single(mock.clone());
// ```

mod adapter;
mod error;
mod http;
mod local;
mod mock;

// Re-export public API
pub use adapter::{
    AppRegistry, AuthProvider, ChatConfig, ChatMessage, ChatOptions, ChatProvider, ChatResponse,
    FileStorage, HostedSite, Hosting, NameGenerator, NewApp, Platform, RegisteredApp, Role, User,
};
pub use error::{IntegrationError, IntegrationResult};
pub use http::{model_ids, HttpChat};
pub use local::LocalPlatform;
pub use mock::{MockApp, MockOp, MockPlatform, MOCK_HTML};
