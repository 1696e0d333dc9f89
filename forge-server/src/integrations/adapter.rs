// Vibeforge Integration Layer - Capability Traits
//
// The platform operations the pipeline calls but does not implement:
// authentication, chat inference, file storage, site hosting, the app
// registry and random names. Each capability is its own trait so a backend
// can mix real and fake implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::error::IntegrationResult;

/// Signed-in platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: String,
}

/// Text of a chat completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
}

impl ChatResponse {
    /// Normalize the response shapes chat endpoints return.
    ///
    /// Tried in order: `message.content`, `choices[0].message.content`,
    /// `text`, `content`, a bare string, and finally the JSON text itself.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let candidates = [
            value.pointer("/message/content"),
            value.pointer("/choices/0/message/content"),
            value.get("text"),
            value.get("content"),
        ];
        let content = candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .or_else(|| value.as_str().map(str::to_string))
            .unwrap_or_else(|| value.to_string());
        Self { content }
    }
}

/// Hosting entry as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedSite {
    pub subdomain: String,
}

/// App registry entry to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApp {
    pub name: String,
    #[serde(rename = "indexURL")]
    pub index_url: String,
    pub title: String,
    pub description: String,
    pub maximize_on_start: bool,
    pub dedupe_name: bool,
}

/// App registry entry as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredApp {
    pub name: String,
    pub uid: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn is_signed_in(&self) -> bool;

    async fn get_user(&self) -> IntegrationResult<User>;

    /// Interactive sign-in; returns once a session exists
    async fn sign_in(&self) -> IntegrationResult<User>;
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one chat completion over the ordered `messages`
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> IntegrationResult<ChatResponse>;
}

/// Platform file storage. Paths are relative to the user's storage root.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn mkdir(&self, path: &str) -> IntegrationResult<()>;

    async fn write(&self, path: &str, content: &str) -> IntegrationResult<()>;

    /// Remove a directory and everything in it
    async fn rmdir(&self, path: &str) -> IntegrationResult<()>;
}

#[async_trait]
pub trait Hosting: Send + Sync {
    /// Serve `dir` under `subdomain`
    async fn create(&self, subdomain: &str, dir: &str) -> IntegrationResult<HostedSite>;

    async fn delete(&self, subdomain: &str) -> IntegrationResult<()>;
}

/// Platform app registry.
///
/// `create` fails with [`IntegrationError::NameConflict`] when the name is
/// taken.
///
/// [`IntegrationError::NameConflict`]: super::IntegrationError::NameConflict
#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn create(&self, app: &NewApp) -> IntegrationResult<RegisteredApp>;

    async fn update_index_url(&self, name: &str, index_url: &str) -> IntegrationResult<()>;

    async fn delete(&self, name: &str) -> IntegrationResult<()>;

    async fn launch(&self, name: &str) -> IntegrationResult<()>;
}

pub trait NameGenerator: Send + Sync {
    /// A fresh random name usable as subdomain and app name
    fn random_name(&self) -> String;
}

/// One implementation of every capability the pipeline needs
#[derive(Clone)]
pub struct Platform {
    pub auth: Arc<dyn AuthProvider>,
    pub chat: Arc<dyn ChatProvider>,
    pub fs: Arc<dyn FileStorage>,
    pub hosting: Arc<dyn Hosting>,
    pub apps: Arc<dyn AppRegistry>,
    pub names: Arc<dyn NameGenerator>,
}

impl Platform {
    /// Use one object for every capability
    pub fn from_single<P>(platform: Arc<P>) -> Self
    where
        P: AuthProvider + ChatProvider + FileStorage + Hosting + AppRegistry + NameGenerator + 'static,
    {
        Self {
            auth: platform.clone(),
            chat: platform.clone(),
            fs: platform.clone(),
            hosting: platform.clone(),
            apps: platform.clone(),
            names: platform,
        }
    }

    /// Replace the chat capability, keeping everything else
    pub fn with_chat(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = chat;
        self
    }
}

/// Configuration for the HTTP chat client
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,

    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,

    /// Timeout for one completion in seconds
    pub timeout_secs: u64,

    /// Lists the model ids the chat endpoint accepts
    pub models_endpoint: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vibes-diy-api.com/v1/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 120,
            models_endpoint: "https://api.puter.com/puterai/chat/models/".to_string(),
        }
    }
}
