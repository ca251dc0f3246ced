//! Prompt builder for rendering user templates.

use crate::types::{BuiltPrompt, PromptDefinition, PromptInput};
use handlebars::Handlebars;
use learnpath_core::{AppError, AppResult};
use serde_json::{Map, Value};

/// Build a prompt from a definition and the query input.
///
/// Template variables:
/// - `message`: the learner's message
/// - `context`: caller context, pretty-printed JSON (absent when empty)
/// - `user_profile`: learner profile, pretty-printed JSON (absent when empty)
///
/// # Example
/// ```no_run
/// use learnpath_prompt::{build_prompt, PromptDefinition, PromptInput};
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let input = PromptInput { message: "What is Rust?", ..Default::default() };
/// let built = build_prompt(&def, &input)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, input: &PromptInput<'_>) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut variables = Map::new();
    variables.insert("message".to_string(), Value::String(input.message.to_string()));

    if let Some(context) = input.context.and_then(pretty_non_empty) {
        variables.insert("context".to_string(), Value::String(context));
    }
    if let Some(profile) = input.user_profile.and_then(pretty_non_empty) {
        variables.insert("user_profile".to_string(), Value::String(profile));
    }

    let user = render_template(&definition.template, &Value::Object(variables))?;

    Ok(BuiltPrompt {
        system: definition.system.clone(),
        user: user.trim().to_string(),
        schema: definition.schema.clone(),
        source_prompt_id: definition.id.clone(),
    })
}

/// Render a Handlebars template with variables.
pub(crate) fn render_template(template: &str, variables: &Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

fn pretty_non_empty(value: &Value) -> Option<String> {
    let empty = match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if empty {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string_pretty(other).ok(),
    }
}
