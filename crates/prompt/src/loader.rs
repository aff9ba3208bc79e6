//! Prompt loader: built-in definitions with workspace overrides.

use crate::types::{PromptDefinition, PromptSource};
use gridsage_core::config::STATE_DIR;
use gridsage_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Classifies a query as TOOL, RAG or CHITCHAT.
pub const ROUTER_PROMPT_ID: &str = "router";

/// Answers a question from a context block.
pub const ANSWER_PROMPT_ID: &str = "answer";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (ROUTER_PROMPT_ID, include_str!("../prompts/router.yml")),
    (ANSWER_PROMPT_ID, include_str!("../prompts/answer.yml")),
];

/// Directory searched for `<id>.yml` overrides.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// A file `<id>.yml` in the workspace prompts directory takes precedence
/// over the built-in definition of the same ID.
///
/// # Example
/// ```no_run
/// use gridsage_prompt::{load_prompt, ANSWER_PROMPT_ID};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), ANSWER_PROMPT_ID)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let definition = if prompt_file.is_file() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let mut definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
        definition.source = PromptSource::Workspace;
        definition
    } else {
        let (_, contents) = BUILTIN_PROMPTS
            .iter()
            .find(|(id, _)| *id == prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

        parse_prompt(contents, prompt_id)?
    };

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            prompt_id, definition.id
        )));
    }

    tracing::debug!(
        "Loaded prompt: {} ({}, {:?})",
        definition.id,
        definition.title,
        definition.source
    );

    Ok(definition)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if !(0.0..=2.0).contains(&def.behavior.temperature) {
        return Err(AppError::Prompt(format!(
            "Temperature {} out of range 0.0-2.0",
            def.behavior.temperature
        )));
    }

    Ok(())
}
