//! Upstream model descriptors and persisted model-name mappings.

use serde::{Deserialize, Serialize};

/// A model as registered by one upstream connection.
///
/// All fields are owned, so `clone()` is a deep copy.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "claude-sonnet-4",
///   "display_name": "Claude Sonnet 4",
///   "owned_by": "anthropic",
///   "context_length": 200000,
///   "capabilities": ["chat", "tools"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model id with its registration-time casing
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

impl ModelDescriptor {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            owned_by: None,
            context_length: None,
            capabilities: Vec::new(),
        }
    }

    /// Case-folded id used as the registry key.
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }
}

/// Insert payload for a `model_mappings` row, (provider, source model) -> target model.
///
/// Rows are created once by the seeding hook and afterwards belong to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModelMapping {
    pub provider: String,
    pub source_model: String,
    pub target_model: String,
    pub is_enabled: bool,
}

impl NewModelMapping {
    /// An enabled mapping from a model onto itself.
    pub fn identity(provider: &str, model_id: &str) -> Self {
        Self {
            provider: provider.to_string(),
            source_model: model_id.to_string(),
            target_model: model_id.to_string(),
            is_enabled: true,
        }
    }
}

/// A registry entry as listed to API clients.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "gpt-4o",
///   "object": "model",
///   "owned_by": "openai",
///   "provider": "openai"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub id: String,
    pub object: &'static str,
    pub owned_by: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelResponse {
    pub fn from_descriptor(provider: &str, descriptor: ModelDescriptor) -> Self {
        Self {
            owned_by: descriptor
                .owned_by
                .unwrap_or_else(|| provider.to_string()),
            id: descriptor.id,
            object: "model",
            provider: provider.to_string(),
            display_name: descriptor.display_name,
        }
    }
}

/// OpenAI-style list envelope.
#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub object: &'static str,
    pub data: Vec<ModelResponse>,
}
