//! One-shot flash storage between requests.
//!
//! The storage backend is an external collaborator; the engine only talks to
//! it through [`FlashProvider`]. Every read consumes what it returns.

use async_trait::async_trait;
use http::header::COOKIE;
use http::request::Parts;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::errors::BoxError;

/// Flash key holding validation errors.
pub const ERRORS_KEY: &str = "errors";

pub const DEFAULT_SESSION_COOKIE: &str = "inertia_session";

#[derive(Error, Debug)]
#[error("flash provider: {0}")]
pub struct FlashError(#[source] pub BoxError);

impl FlashError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        FlashError(err.into())
    }
}

#[async_trait]
pub trait FlashProvider: Send + Sync {
    /// Stores a value for the next request of the same client.
    async fn flash(&self, request: &Parts, key: &str, value: Value) -> Result<(), FlashError>;

    /// Takes a stored value.
    async fn get(&self, request: &Parts, key: &str) -> Result<Option<Value>, FlashError>;

    /// Takes every stored value. Providers without a listing capability return nothing.
    async fn get_all(&self, _request: &Parts) -> Result<Map<String, Value>, FlashError> {
        Ok(Map::new())
    }

    async fn flash_clear_history(&self, request: &Parts) -> Result<(), FlashError>;

    /// Takes the clear-history flag.
    async fn should_clear_history(&self, request: &Parts) -> Result<bool, FlashError>;
}

#[derive(Debug, Default)]
struct FlashSession {
    values: Map<String, Value>,
    clear_history: bool,
}

/// In-process flash storage keyed by a session cookie.
///
/// Requests without the cookie share one anonymous session, which is only
/// suitable for tests and single-user demos.
pub struct MemoryFlashProvider {
    cookie_name: String,
    sessions: Mutex<HashMap<String, FlashSession>>,
}

impl MemoryFlashProvider {
    pub fn new() -> Self {
        Self::with_cookie_name(DEFAULT_SESSION_COOKIE)
    }

    pub fn with_cookie_name(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn session_id(&self, request: &Parts) -> String {
        request
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    }
}

impl Default for MemoryFlashProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlashProvider for MemoryFlashProvider {
    async fn flash(&self, request: &Parts, key: &str, value: Value) -> Result<(), FlashError> {
        let id = self.session_id(request);
        self.sessions
            .lock()
            .entry(id)
            .or_default()
            .values
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, request: &Parts, key: &str) -> Result<Option<Value>, FlashError> {
        let id = self.session_id(request);
        Ok(self
            .sessions
            .lock()
            .get_mut(&id)
            .and_then(|session| session.values.remove(key)))
    }

    async fn get_all(&self, request: &Parts) -> Result<Map<String, Value>, FlashError> {
        let id = self.session_id(request);
        Ok(self
            .sessions
            .lock()
            .get_mut(&id)
            .map(|session| std::mem::take(&mut session.values))
            .unwrap_or_default())
    }

    async fn flash_clear_history(&self, request: &Parts) -> Result<(), FlashError> {
        let id = self.session_id(request);
        self.sessions.lock().entry(id).or_default().clear_history = true;
        Ok(())
    }

    async fn should_clear_history(&self, request: &Parts) -> Result<bool, FlashError> {
        let id = self.session_id(request);
        Ok(self
            .sessions
            .lock()
            .get_mut(&id)
            .map(|session| std::mem::take(&mut session.clear_history))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;
    use serde_json::json;

    fn parts(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_reads_are_one_shot() {
        let provider = MemoryFlashProvider::new();
        let req = parts(Some("theme=dark; inertia_session=abc"));

        provider
            .flash(&req, ERRORS_KEY, json!({"name": "required"}))
            .await
            .unwrap();

        assert_eq!(
            provider.get(&req, ERRORS_KEY).await.unwrap(),
            Some(json!({"name": "required"}))
        );
        assert_eq!(provider.get(&req, ERRORS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let provider = MemoryFlashProvider::new();
        let alice = parts(Some("inertia_session=alice"));
        let bob = parts(Some("inertia_session=bob"));

        provider.flash(&alice, "message", json!("hi")).await.unwrap();
        provider.flash_clear_history(&alice).await.unwrap();

        assert!(provider.get_all(&bob).await.unwrap().is_empty());
        assert!(!provider.should_clear_history(&bob).await.unwrap());

        assert_eq!(
            Value::Object(provider.get_all(&alice).await.unwrap()),
            json!({"message": "hi"})
        );
        assert!(provider.get_all(&alice).await.unwrap().is_empty());
        assert!(provider.should_clear_history(&alice).await.unwrap());
        assert!(!provider.should_clear_history(&alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_session() {
        let provider = MemoryFlashProvider::with_cookie_name("sid");
        let anonymous = parts(None);

        provider.flash(&anonymous, "k", json!(1)).await.unwrap();
        assert_eq!(provider.get(&parts(None), "k").await.unwrap(), Some(json!(1)));
    }
}
