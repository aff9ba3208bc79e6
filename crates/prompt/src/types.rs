//! Prompt types for the Gridsage assistant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Sampling settings for the chat call
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// System message template, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User message template with Handlebars syntax
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,

    /// Where this definition came from
    #[serde(skip)]
    pub source: PromptSource,
}

/// Sampling settings for prompt execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBehavior {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "maxTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format ("label" for classifiers, "text" for answers)
    pub format: String,
}

/// Origin of a prompt definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    /// Compiled into the binary
    #[default]
    Builtin,
    /// Overridden from the workspace prompts directory
    Workspace,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    pub temperature: f32,

    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    pub source: PromptSource,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
behavior:
  temperature: 0.0
  maxTokens: 16
system: "Classify the query."
template: "{{query}}"
output:
  format: label
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.behavior.temperature, 0.0);
        assert_eq!(def.behavior.max_tokens, Some(16));
        assert_eq!(def.system.as_deref(), Some("Classify the query."));
        assert_eq!(def.source, PromptSource::Builtin);
    }

    #[test]
    fn test_behavior_defaults() {
        let yaml = r#"
id: bare
title: Bare
apiVersion: "1.0"
template: "{{question}}"
output:
  format: text
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.behavior, PromptBehavior::default());
        assert!(def.system.is_none());
    }
}
