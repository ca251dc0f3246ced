//! Loader for YAML prompt override files.

use crate::builder::render_template;
use crate::types::PromptDefinition;
use learnpath_core::{AppError, AppResult};
use std::path::Path;

/// Load every `*.yml` / `*.yaml` prompt definition under `dir`.
///
/// A missing directory yields an empty list. Any unreadable or invalid file
/// fails the whole load so a typo never silently falls back to built-ins.
pub fn load_definitions(dir: &Path) -> AppResult<Vec<PromptDefinition>> {
    if !dir.exists() {
        tracing::debug!("Prompt override directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut definitions = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_yaml(path) {
            continue;
        }

        definitions.push(load_prompt_file(path)?);
    }

    tracing::info!("Loaded {} prompt override(s) from {:?}", definitions.len(), dir);
    Ok(definitions)
}

/// Load and validate a single prompt file.
pub fn load_prompt_file(path: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", path);

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e)))?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Validate a prompt definition.
pub(crate) fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} has an empty system instruction",
            def.id
        )));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(format!("Prompt {} has an empty template", def.id)));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // Catch template syntax errors at load time rather than per query
    render_template(&def.template, &serde_json::json!({ "message": "" }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Flow, PromptType};
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"
id: answer.chain_of_thought
title: "Stepwise answer"
apiVersion: "1.0"
promptType: chain_of_thought
flow: answer
system: "Reason carefully."
template: "Q: {{message}}"
"#;

    #[test]
    fn test_load_valid_definitions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("cot.yml"), VALID).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let defs = load_definitions(temp_dir.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].prompt_type, PromptType::ChainOfThought);
        assert_eq!(defs[0].flow, Flow::Answer);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let defs = load_definitions(&temp_dir.path().join("absent")).unwrap();
        assert!(defs.is_empty());
    }

    #[test]
    fn test_invalid_yaml_fails() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("bad.yaml"), "invalid: yaml: content:").unwrap();
        assert!(load_definitions(temp_dir.path()).is_err());
    }

    #[test]
    fn test_bad_api_version_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("v.yml");
        fs::write(&path, VALID.replace("\"1.0\"", "\"1\"")).unwrap();
        assert!(load_prompt_file(&path).is_err());
    }
}
