// Vibeforge Integration Layer - Mock Platform
//
// In-memory implementation of every capability for tests. Tests control chat
// responses, inject failures per operation and inspect what was called.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::adapter::{
    AppRegistry, AuthProvider, ChatMessage, ChatOptions, ChatProvider, ChatResponse, FileStorage,
    HostedSite, Hosting, NameGenerator, NewApp, RegisteredApp, User,
};
use super::error::{IntegrationError, IntegrationResult};

/// Minimal document the mock returns when no chat response is queued
pub const MOCK_HTML: &str = "<!DOCTYPE html>\n<html>\n<head><title>Mock</title></head>\n<body><h1>Mock</h1></body>\n</html>";

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    SignIn,
    Chat,
    Mkdir,
    Write,
    Rmdir,
    HostingCreate,
    HostingDelete,
    AppsCreate,
    AppsUpdate,
    AppsDelete,
    AppsLaunch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockApp {
    pub uid: String,
    pub index_url: String,
    pub title: String,
}

#[derive(Debug, Default)]
struct MockState {
    user: Option<User>,
    chat_responses: VecDeque<IntegrationResult<String>>,
    failures: HashMap<MockOp, IntegrationError>,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, String>,
    sites: BTreeMap<String, String>,
    apps: BTreeMap<String, MockApp>,
    launched: Vec<String>,
    calls: Vec<String>,
    last_chat: Vec<ChatMessage>,
    last_model: Option<String>,
}

/// Mock platform for testing the pipeline without a real backend.
///
/// # Example
///
/// ```ignore
/// let mock = Arc::new(MockPlatform::signed_in("tester"));
/// mock.push_chat_response(Ok("```html\n<!DOCTYPE html>...```".to_string()));
/// mock.fail(MockOp::HostingDelete, IntegrationError::NotFound("sub".into()));
/// let platform = Platform::from_single(mock.clone());
/// ```
#[derive(Debug, Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
    name_counter: AtomicUsize,
}

impl MockPlatform {
    /// Mock with no session
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock with a session for `username`
    pub fn signed_in(username: &str) -> Self {
        let mock = Self::new();
        mock.state().user = Some(User {
            username: username.to_string(),
        });
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: MockOp, call: String) -> IntegrationResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(err) = state.failures.get(&op).cloned() {
            return Err(err);
        }
        Ok(state)
    }

    /// Queue a response for the next `chat()` call
    pub fn push_chat_response(&self, response: IntegrationResult<String>) {
        self.state().chat_responses.push_back(response);
    }

    /// Make every call of `op` fail with `err` until cleared
    pub fn fail(&self, op: MockOp, err: IntegrationError) {
        self.state().failures.insert(op, err);
    }

    pub fn clear_failure(&self, op: MockOp) {
        self.state().failures.remove(&op);
    }

    /// Register an app name so the next `create` with it conflicts
    pub fn reserve_app_name(&self, name: &str) {
        self.state().apps.insert(
            name.to_string(),
            MockApp {
                uid: format!("uid-reserved-{}", name),
                index_url: String::new(),
                title: String::new(),
            },
        );
    }

    pub fn sign_out(&self) {
        self.state().user = None;
    }

    /// Every call made, in order, as `"capability.op args"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded calls whose label starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    pub fn dirs(&self) -> Vec<String> {
        self.state().dirs.iter().cloned().collect()
    }

    /// Directory served under `subdomain`
    pub fn site(&self, subdomain: &str) -> Option<String> {
        self.state().sites.get(subdomain).cloned()
    }

    pub fn app(&self, name: &str) -> Option<MockApp> {
        self.state().apps.get(name).cloned()
    }

    pub fn launched(&self) -> Vec<String> {
        self.state().launched.clone()
    }

    pub fn last_chat(&self) -> (Vec<ChatMessage>, Option<String>) {
        let state = self.state();
        (state.last_chat.clone(), state.last_model.clone())
    }

    /// Reset recorded calls, keeping stored state
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl AuthProvider for MockPlatform {
    async fn is_signed_in(&self) -> bool {
        self.state().user.is_some()
    }

    async fn get_user(&self) -> IntegrationResult<User> {
        self.state().user.clone().ok_or(IntegrationError::NotSignedIn)
    }

    async fn sign_in(&self) -> IntegrationResult<User> {
        let mut state = self.record(MockOp::SignIn, "auth.sign_in".to_string())?;
        let user = state
            .user
            .get_or_insert_with(|| User {
                username: "mock-user".to_string(),
            })
            .clone();
        Ok(user)
    }
}

#[async_trait]
impl ChatProvider for MockPlatform {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> IntegrationResult<ChatResponse> {
        let mut state = self.record(MockOp::Chat, format!("ai.chat {}", options.model))?;
        state.last_chat = messages.to_vec();
        state.last_model = Some(options.model.clone());
        let content = state
            .chat_responses
            .pop_front()
            .unwrap_or_else(|| Ok(MOCK_HTML.to_string()))?;
        Ok(ChatResponse { content })
    }
}

#[async_trait]
impl FileStorage for MockPlatform {
    async fn mkdir(&self, path: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::Mkdir, format!("fs.mkdir {}", path))?;
        if !state.dirs.insert(path.to_string()) {
            return Err(IntegrationError::Filesystem(format!("{} already exists", path)));
        }
        Ok(())
    }

    async fn write(&self, path: &str, content: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::Write, format!("fs.write {}", path))?;
        let parent = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        if !parent.is_empty() && !state.dirs.contains(parent) {
            return Err(IntegrationError::NotFound(parent.to_string()));
        }
        state.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::Rmdir, format!("fs.rmdir {}", path))?;
        if !state.dirs.remove(path) {
            return Err(IntegrationError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        state.files.retain(|file, _| !file.starts_with(&prefix));
        Ok(())
    }
}

#[async_trait]
impl Hosting for MockPlatform {
    async fn create(&self, subdomain: &str, dir: &str) -> IntegrationResult<HostedSite> {
        let mut state = self.record(
            MockOp::HostingCreate,
            format!("hosting.create {} {}", subdomain, dir),
        )?;
        if state.sites.contains_key(subdomain) {
            return Err(IntegrationError::Hosting(format!(
                "subdomain {} is already in use",
                subdomain
            )));
        }
        state.sites.insert(subdomain.to_string(), dir.to_string());
        Ok(HostedSite {
            subdomain: subdomain.to_string(),
        })
    }

    async fn delete(&self, subdomain: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::HostingDelete, format!("hosting.delete {}", subdomain))?;
        state
            .sites
            .remove(subdomain)
            .map(|_| ())
            .ok_or_else(|| IntegrationError::NotFound(subdomain.to_string()))
    }
}

#[async_trait]
impl AppRegistry for MockPlatform {
    async fn create(&self, app: &NewApp) -> IntegrationResult<RegisteredApp> {
        let mut state = self.record(MockOp::AppsCreate, format!("apps.create {}", app.name))?;
        if state.apps.contains_key(&app.name) {
            return Err(IntegrationError::NameConflict(app.name.clone()));
        }
        let uid = format!("app-{}", state.apps.len() + 1);
        state.apps.insert(
            app.name.clone(),
            MockApp {
                uid: uid.clone(),
                index_url: app.index_url.clone(),
                title: app.title.clone(),
            },
        );
        Ok(RegisteredApp {
            name: app.name.clone(),
            uid,
        })
    }

    async fn update_index_url(&self, name: &str, index_url: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::AppsUpdate, format!("apps.update {}", name))?;
        let app = state
            .apps
            .get_mut(name)
            .ok_or_else(|| IntegrationError::NotFound(name.to_string()))?;
        app.index_url = index_url.to_string();
        Ok(())
    }

    async fn delete(&self, name: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::AppsDelete, format!("apps.delete {}", name))?;
        state
            .apps
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| IntegrationError::NotFound(name.to_string()))
    }

    async fn launch(&self, name: &str) -> IntegrationResult<()> {
        let mut state = self.record(MockOp::AppsLaunch, format!("apps.launch {}", name))?;
        if !state.apps.contains_key(name) {
            return Err(IntegrationError::NotFound(name.to_string()));
        }
        state.launched.push(name.to_string());
        Ok(())
    }
}

impl NameGenerator for MockPlatform {
    fn random_name(&self) -> String {
        let n = self.name_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("random-name-{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chat_queue_then_default() {
        let mock = MockPlatform::signed_in("test");
        mock.push_chat_response(Ok("first".to_string()));
        let options = ChatOptions {
            model: "m".to_string(),
        };

        let first = mock.chat(&[ChatMessage::user("hi")], &options).await.unwrap();
        assert_eq!(first.content, "first");
        let second = mock.chat(&[], &options).await.unwrap();
        assert_eq!(second.content, MOCK_HTML);
        assert_eq!(mock.call_count("ai.chat"), 2);
        assert_eq!(mock.last_chat().1.as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let mock = MockPlatform::signed_in("test");
        mock.fail(MockOp::Mkdir, IntegrationError::Filesystem("denied".to_string()));

        let result = mock.mkdir("app_1").await;
        assert!(matches!(result, Err(IntegrationError::Filesystem(_))));
        assert_eq!(mock.calls(), vec!["fs.mkdir app_1"]);

        mock.clear_failure(MockOp::Mkdir);
        assert!(mock.mkdir("app_1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_fs_semantics() {
        let mock = MockPlatform::new();
        assert!(matches!(
            mock.write("missing/index.html", "x").await,
            Err(IntegrationError::NotFound(_))
        ));

        mock.mkdir("app_1").await.unwrap();
        mock.write("app_1/index.html", "x").await.unwrap();
        assert_eq!(mock.file("app_1/index.html").as_deref(), Some("x"));

        mock.rmdir("app_1").await.unwrap();
        assert!(mock.file("app_1/index.html").is_none());
        assert!(mock.rmdir("app_1").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_registry_conflict() {
        let mock = MockPlatform::new();
        mock.reserve_app_name("taken");
        let app = NewApp {
            name: "taken".to_string(),
            index_url: "u".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            maximize_on_start: true,
            dedupe_name: true,
        };

        let err = AppRegistry::create(&mock, &app).await.unwrap_err();
        assert!(err.is_name_conflict());
    }

    #[tokio::test]
    async fn test_mock_auth() {
        let mock = MockPlatform::new();
        assert!(!mock.is_signed_in().await);
        assert!(matches!(
            mock.get_user().await,
            Err(IntegrationError::NotSignedIn)
        ));

        let user = mock.sign_in().await.unwrap();
        assert_eq!(user.username, "mock-user");
        assert!(mock.is_signed_in().await);
    }

    #[test]
    fn test_random_names_are_unique() {
        let mock = MockPlatform::new();
        assert_ne!(mock.random_name(), mock.random_name());
    }
}
