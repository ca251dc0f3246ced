//! Prompt template sets.
//!
//! One definition per (prompt type, flow). Built-ins cover every pair; YAML
//! overrides replace individual entries.

use crate::builder::build_prompt;
use crate::loader::load_definitions;
use crate::types::{BuiltPrompt, Flow, PromptDefinition, PromptInput, PromptType};
use learnpath_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

const PERSONA: &str = "You are LearnPath, a learning assistant for software developers.";

const USER_TEMPLATE: &str = "{{message}}\
{{#if user_profile}}\n\nLearner profile:\n{{user_profile}}{{/if}}\
{{#if context}}\n\nAdditional context:\n{{context}}{{/if}}";

const ROADMAP_INSTRUCTION: &str = "Generate a personalized learning roadmap as JSON following the schema. \
Provide phases, modules and resources. Use only free resources unless asked otherwise. \
Ground recommendations in the provided context when it is relevant.";

const ROADMAP_SCHEMA: &str = r#"Respond with valid JSON only, using this structure:
{
  "user_profile": {"current_level": "string", "primary_goal": "string", "timeline": "string", "learning_style": "string", "time_commitment": "string"},
  "roadmap": {
    "phases": [
      {
        "phase_id": 1,
        "title": "string",
        "duration": "string",
        "learning_objectives": ["string"],
        "modules": [{"module_name": "string", "concepts": ["string"], "resources": [{"title": "string", "url": "string", "type": "string", "difficulty": "string", "estimated_time": "string"}]}],
        "hands_on_project": {"title": "string", "description": "string", "skills_practiced": ["string"], "deliverables": ["string"], "estimated_time": "string", "difficulty": "string"},
        "prerequisites": ["string"],
        "success_metrics": ["string"]
      }
    ],
    "total_duration": "string",
    "difficulty_progression": ["string"]
  },
  "milestone_checkpoints": ["string"],
  "next_steps": "string"
}"#;

const ANSWER_INSTRUCTION: &str =
    "Answer concisely and provide actionable steps. Use the provided context when it is relevant.";

const ANSWER_SCHEMA: &str =
    r#"Respond with JSON: {"explanation":"string","key_points":["string"],"next_steps":"string"}"#;

const ANSWER_EXAMPLE_ONE: &str = r#"Question: What is a REST API?
Answer: {"explanation":"A REST API exposes resources over HTTP using standard verbs.","key_points":["Resources are addressed by URLs","GET, POST, PUT and DELETE map to read and write operations","Responses are usually JSON"],"next_steps":"Build a small CRUD API with one resource."}"#;

const ANSWER_EXAMPLE_TWO: &str = r#"Question: Should I learn TypeScript?
Answer: {"explanation":"TypeScript adds static types to JavaScript and catches errors before runtime.","key_points":["Gradual adoption is possible","Most frontend frameworks support it"],"next_steps":"Convert one small JavaScript project to TypeScript."}"#;

const ROADMAP_EXAMPLE_ONE: &str = r#"Request: I want to become a backend developer in 6 months.
Roadmap outline: Phase 1 "Programming Foundations" (6 weeks, one language, version control, a CLI project); Phase 2 "Web Services" (8 weeks, HTTP, databases, a REST API project); Phase 3 "Production Skills" (10 weeks, testing, deployment, a capstone service)."#;

const ROADMAP_EXAMPLE_TWO: &str = r#"Request: Help me go from HTML basics to React in 3 months.
Roadmap outline: Phase 1 "Modern JavaScript" (4 weeks, ES modules, async, DOM project); Phase 2 "React Fundamentals" (5 weeks, components, state, hooks, a todo app); Phase 3 "Shipping Apps" (3 weeks, routing, data fetching, a deployed portfolio)."#;

/// The set of prompt definitions the orchestrator draws from.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    definitions: HashMap<(PromptType, Flow), PromptDefinition>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLibrary {
    /// Library with the built-in definition for every pair.
    pub fn builtin() -> Self {
        let mut definitions = HashMap::new();
        for prompt_type in PromptType::ALL {
            for flow in [Flow::Roadmap, Flow::Answer] {
                definitions.insert((prompt_type, flow), builtin_definition(prompt_type, flow));
            }
        }
        Self { definitions }
    }

    /// Built-ins with the YAML definitions found under `dir` layered on top.
    pub fn with_overrides(dir: &Path) -> AppResult<Self> {
        let mut library = Self::builtin();
        for definition in load_definitions(dir)? {
            tracing::debug!(
                "Prompt {} overrides {}/{}",
                definition.id,
                definition.prompt_type,
                definition.flow
            );
            library.insert(definition);
        }
        Ok(library)
    }

    /// Replace the definition for the pair the given definition declares.
    pub fn insert(&mut self, definition: PromptDefinition) {
        self.definitions
            .insert((definition.prompt_type, definition.flow), definition);
    }

    /// Definition for a pair.
    pub fn get(&self, prompt_type: PromptType, flow: Flow) -> Option<&PromptDefinition> {
        self.definitions.get(&(prompt_type, flow))
    }

    /// Render the prompt for a query.
    pub fn build(
        &self,
        prompt_type: PromptType,
        flow: Flow,
        input: &PromptInput<'_>,
    ) -> AppResult<BuiltPrompt> {
        let definition = self.get(prompt_type, flow).ok_or_else(|| {
            AppError::Prompt(format!("No prompt defined for {}/{}", prompt_type, flow))
        })?;
        build_prompt(definition, input)
    }

    /// All definition ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.values().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

fn persona(prompt_type: PromptType, flow: Flow) -> String {
    let (example_one, example_two) = match flow {
        Flow::Roadmap => (ROADMAP_EXAMPLE_ONE, ROADMAP_EXAMPLE_TWO),
        Flow::Answer => (ANSWER_EXAMPLE_ONE, ANSWER_EXAMPLE_TWO),
    };

    match prompt_type {
        PromptType::ZeroShot => format!("{} Provide helpful, accurate responses.", PERSONA),
        PromptType::OneShot => format!(
            "{} Use the example to guide your response.\n\nExample:\n{}",
            PERSONA, example_one
        ),
        PromptType::MultiShot => format!(
            "{} Use multiple examples to guide your response.\n\nExample 1:\n{}\n\nExample 2:\n{}",
            PERSONA, example_one, example_two
        ),
        PromptType::Dynamic => format!(
            "{} Adapt your response based on context: match depth and pace to the learner's profile and the retrieved material.",
            PERSONA
        ),
        PromptType::ChainOfThought => format!(
            "{} Think step by step: assess the learner's current level, identify gaps, then order topics by dependency. Put only the final result in the output.",
            PERSONA
        ),
    }
}

fn builtin_definition(prompt_type: PromptType, flow: Flow) -> PromptDefinition {
    let (instruction, schema, title) = match flow {
        Flow::Roadmap => (ROADMAP_INSTRUCTION, ROADMAP_SCHEMA, "Learning roadmap"),
        Flow::Answer => (ANSWER_INSTRUCTION, ANSWER_SCHEMA, "Question answer"),
    };

    PromptDefinition {
        id: format!("{}.{}", flow, prompt_type),
        title: format!("{} ({})", title, prompt_type),
        api_version: "1.0".to_string(),
        prompt_type,
        flow,
        system: format!("{}\n\n{}", persona(prompt_type, flow), instruction),
        schema: Some(schema.to_string()),
        template: USER_TEMPLATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_covers_every_pair() {
        let library = PromptLibrary::builtin();
        assert_eq!(library.ids().len(), 10);
        for prompt_type in PromptType::ALL {
            assert_eq!(
                library.get(prompt_type, Flow::Roadmap).unwrap().id,
                format!("roadmap.{}", prompt_type)
            );
        }
    }

    #[test]
    fn test_flow_schemas_differ() {
        let library = PromptLibrary::builtin();
        let roadmap = library.get(PromptType::ZeroShot, Flow::Roadmap).unwrap();
        let answer = library.get(PromptType::ZeroShot, Flow::Answer).unwrap();

        assert!(roadmap.schema.as_deref().unwrap().contains("\"phases\""));
        assert!(answer.schema.as_deref().unwrap().contains("\"key_points\""));
    }

    #[test]
    fn test_prompt_types_change_persona() {
        let library = PromptLibrary::builtin();
        assert!(library
            .get(PromptType::ChainOfThought, Flow::Answer)
            .unwrap()
            .system
            .contains("step by step"));
        assert!(library
            .get(PromptType::MultiShot, Flow::Answer)
            .unwrap()
            .system
            .contains("Example 2:"));
        assert!(!library
            .get(PromptType::ZeroShot, Flow::Answer)
            .unwrap()
            .system
            .contains("Example"));
    }

    #[test]
    fn test_build_includes_profile() {
        let library = PromptLibrary::builtin();
        let profile = json!({"time_commitment": "10 hours/week"});
        let built = library
            .build(
                PromptType::Dynamic,
                Flow::Roadmap,
                &PromptInput {
                    message: "Roadmap to Rust",
                    context: None,
                    user_profile: Some(&profile),
                },
            )
            .unwrap();

        assert!(built.user.starts_with("Roadmap to Rust\n\nLearner profile:"));
        assert!(built.user.contains("10 hours/week"));
        assert_eq!(built.source_prompt_id, "roadmap.dynamic");
    }

    #[test]
    fn test_overrides_replace_single_entry() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("answer.yml"),
            r#"
id: custom.answer
title: Custom
apiVersion: "1.0"
promptType: zero_shot
flow: answer
system: "Custom tutor."
template: "Custom: {{message}}"
"#,
        )
        .unwrap();

        let library = PromptLibrary::with_overrides(temp_dir.path()).unwrap();
        let built = library
            .build(
                PromptType::ZeroShot,
                Flow::Answer,
                &PromptInput {
                    message: "hi",
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(built.user, "Custom: hi");
        assert!(built.schema.is_none());
        assert_eq!(
            library.get(PromptType::ZeroShot, Flow::Roadmap).unwrap().id,
            "roadmap.zero_shot"
        );
    }
}
