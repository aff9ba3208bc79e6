//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use gridsage_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Render a definition's system and user templates with `variables`.
///
/// # Example
/// ```no_run
/// use gridsage_prompt::{build_prompt, load_prompt, ANSWER_PROMPT_ID};
/// use std::collections::HashMap;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(Path::new("."), ANSWER_PROMPT_ID)?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is curtailment?".to_string());
/// vars.insert("context".to_string(), "No documents loaded yet.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    let system = definition
        .system
        .as_deref()
        .map(|template| render(&mut handlebars, "system", template, &variables))
        .transpose()?;

    let user = render(&mut handlebars, "user", &definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        temperature: definition.behavior.temperature,
        max_tokens: definition.behavior.max_tokens,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            source: definition.source,
            resolved_variables: variables,
        },
    })
}

fn render(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register {} template: {}", name, e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))
}
