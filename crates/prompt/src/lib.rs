//! Prompt system for the Gridsage assistant.
//!
//! Prompts are YAML definitions rendered with Handlebars. The router and
//! answer prompts ship inside the binary and can be overridden per workspace
//! by dropping `<id>.yml` into `.gridsage/prompts/`.

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{load_prompt, prompts_dir, ANSWER_PROMPT_ID, ROUTER_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptSource};
