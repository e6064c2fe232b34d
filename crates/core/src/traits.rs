//! Seam traits between the planner and its collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

// =============================================================================
// LLM Client
// =============================================================================

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Token counts reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Tokens used for the prompt.
    pub prompt_tokens: u64,
    /// Tokens used for the completion.
    pub completion_tokens: u64,
}

/// Response from an LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text.
    pub content: String,
    /// Token usage.
    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    /// Create a response carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: LlmUsage::default(),
        }
    }
}

/// Client for an LLM provider.
///
/// Implementations own their timeout and retry policy.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a conversation and return the completion.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;

    /// Complete a single prompt.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }
}

// =============================================================================
// Capability Matching
// =============================================================================

/// Resolves a capability tag to a concrete agent identifier.
#[async_trait]
pub trait CapabilityMatcher: Send + Sync {
    /// Find an agent able to serve `required_capability`.
    ///
    /// `Ok(None)` means no agent is known. Errors come from the backing
    /// storage; planners treat them the same as `Ok(None)`.
    async fn find_agent_for(&self, required_capability: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingClient {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(LlmResponse::text("ok"))
        }
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_message() {
        let client = RecordingClient {
            seen: Mutex::new(Vec::new()),
        };

        let response = client.generate("plan this").await.unwrap();
        assert_eq!(response.content, "ok");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[ChatMessage::user("plan this")]);
    }

    #[test]
    fn test_response_usage_defaults_when_missing() {
        let response: LlmResponse = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(response.usage, LlmUsage::default());
    }
}
