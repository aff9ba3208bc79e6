//! Chat model integration for Gridsage.
//!
//! The conversational model is treated as a black box behind the
//! [`LlmClient`] trait. Ollama is the only provider.
//!
//! # Example
//! ```no_run
//! use gridsage_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3:instruct");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{client_from_config, create_client};
pub use providers::OllamaClient;
pub use types::{ChatMessage, ChatRole};
