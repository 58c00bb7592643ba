//! LLM module - structured-output model integrations
//!
//! Provides the provider abstraction the planner depends on, with an
//! OpenAI-compatible implementation.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{ContentPart, GenerateOptions, Message, ObjectRequest, StructuredModel};
