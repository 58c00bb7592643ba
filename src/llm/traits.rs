//! Model provider trait for structured-output completions
//!
//! The planner and starting-URL selector only ever ask for a JSON object that
//! conforms to a schema, so that is the whole surface a provider has to offer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// One piece of multimodal message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Base64-encoded PNG image
    Image { data: String },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from base64 data
    pub fn image(data: impl Into<String>) -> Self {
        Self::Image { data: data.into() }
    }

    /// Whether this part is an image
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// A message sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: String,
    /// Ordered content parts
    pub content: Vec<ContentPart>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

}

/// Options for generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// A request for a schema-conformant JSON object
#[derive(Debug, Clone)]
pub struct ObjectRequest {
    /// Name the schema is registered under
    pub schema_name: String,
    /// JSON Schema the output must satisfy
    pub schema: serde_json::Value,
    /// Conversation to complete
    pub messages: Vec<Message>,
    /// Generation options
    pub options: GenerateOptions,
}

impl ObjectRequest {
    /// Create a request with default options
    pub fn new(
        schema_name: impl Into<String>,
        schema: serde_json::Value,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            schema,
            messages,
            options: GenerateOptions::default(),
        }
    }

    /// Override generation options
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Trait for structured-output model providers
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Produce a JSON object for the request.
    ///
    /// Transport failures surface as `ModelUnavailable`; output that is not a
    /// JSON object surfaces as `SchemaValidation`.
    async fn generate_object(&self, request: ObjectRequest) -> Result<serde_json::Value>;

    /// Get the provider name
    fn name(&self) -> &str;
}
