//! LLM provider abstraction layer for whyis
//!
//! This crate provides provider-agnostic abstractions for chat completions:
//!
//! - Message types for LLM communication
//! - Completion request/response types (including JSON response mode)
//! - Provider trait for LLM implementations
//! - An OpenAI provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
