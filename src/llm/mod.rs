//! LLM abstraction layer
//!
//! Provider switching, failover, shared conversation memory and cost
//! tracking on top of the [`LlmProvider`](crate::ports::LlmProvider) port.

pub mod abstraction;
pub mod memory;

pub use abstraction::{GenerateOptions, LlmAbstraction, SelectionStrategy, NOT_CONFIGURED_RESPONSE};
pub use memory::{ConversationMemory, Exchange};
