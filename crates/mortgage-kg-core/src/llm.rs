//! The LLM client boundary (§6: "LLM client — `complete(prompt, schema) ->
//! Result<Value>`... retries and rate-limits internally; the pipeline treats
//! it as a pure async function").

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;

/// An LLM completion client used by the navigation extractor, entity
/// extractor, and decision tree extractor for structured JSON extraction.
///
/// Implementations own their own retry and rate-limiting (§9); callers treat
/// `complete` as a plain async function that either returns JSON conforming
/// to `schema` or fails.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request a completion for `prompt`, constrained to `schema` (a JSON
    /// Schema document). Implementations that cannot enforce the schema
    /// server-side must validate the response before returning `Ok`.
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Value>;
}

/// A deterministic in-process [`LlmClient`] for tests (§9: "deterministic
/// in-process fakes, not mocks of an HTTP layer").
///
/// Responses are matched by a caller-supplied key extracted from the prompt
/// (its first line, by convention) so tests can script a short sequence of
/// calls without depending on exact prompt text.
pub struct FakeLlmClient {
    responses: dashmap::DashMap<String, Value>,
    default_response: Option<Value>,
    calls: std::sync::atomic::AtomicUsize,
}

impl FakeLlmClient {
    /// An empty fake that fails every call unless [`Self::with_response`] or
    /// [`Self::with_default`] is used to script one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: dashmap::DashMap::new(),
            default_response: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Script a response for prompts whose first line equals `key`.
    #[must_use]
    pub fn with_response(self, key: impl Into<String>, response: Value) -> Self {
        self.responses.insert(key.into(), response);
        self
    }

    /// Script a response returned for any prompt with no specific match.
    #[must_use]
    pub fn with_default(mut self, response: Value) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for FakeLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, prompt: &str, _schema: &Value) -> Result<Value> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let key = prompt.lines().next().unwrap_or_default();
        if let Some(resp) = self.responses.get(key) {
            return Ok(resp.clone());
        }
        self.default_response
            .clone()
            .ok_or_else(|| Error::Llm(format!("no scripted response for key {key:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_scripted_response_by_key() {
        let fake = FakeLlmClient::new().with_response("extract_nav", json!({"nodes": []}));
        let result = fake
            .complete("extract_nav\nrest of prompt", &json!({}))
            .await
            .expect("scripted response");
        assert_eq!(result, json!({"nodes": []}));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_default_response() {
        let fake = FakeLlmClient::new().with_default(json!({"ok": true}));
        let result = fake.complete("anything", &json!({})).await.unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[tokio::test]
    async fn errors_when_no_response_scripted() {
        let fake = FakeLlmClient::new();
        let result = fake.complete("unscripted", &json!({})).await;
        assert!(result.is_err());
    }
}
