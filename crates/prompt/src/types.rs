//! Prompt types for LearnPath.
//!
//! A [`PromptDefinition`] is keyed by the pair ([`PromptType`], [`Flow`]).

use learnpath_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prompting strategy requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    #[default]
    ZeroShot,
    OneShot,
    MultiShot,
    Dynamic,
    ChainOfThought,
}

impl PromptType {
    pub const ALL: [PromptType; 5] = [
        PromptType::ZeroShot,
        PromptType::OneShot,
        PromptType::MultiShot,
        PromptType::Dynamic,
        PromptType::ChainOfThought,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::ZeroShot => "zero_shot",
            PromptType::OneShot => "one_shot",
            PromptType::MultiShot => "multi_shot",
            PromptType::Dynamic => "dynamic",
            PromptType::ChainOfThought => "chain_of_thought",
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        PromptType::ALL
            .into_iter()
            .find(|pt| pt.as_str() == normalized)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt type: {}", s)))
    }
}

/// Response shape a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Multi-phase learning roadmap
    Roadmap,
    /// `{explanation, key_points, next_steps}`
    Answer,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Roadmap => "roadmap",
            Flow::Answer => "answer",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier, e.g. `roadmap.zero_shot`
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Strategy this definition implements
    #[serde(rename = "promptType")]
    pub prompt_type: PromptType,

    /// Response shape this definition asks for
    pub flow: Flow,

    /// System instruction (persona plus flow instruction)
    pub system: String,

    /// Output format instruction appended to the system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// User message template with Handlebars syntax
    pub template: String,
}

/// Values a user template can reference.
#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
    /// The learner's message
    pub message: &'a str,

    /// Caller-supplied context mapping
    pub context: Option<&'a serde_json::Value>,

    /// Caller-supplied learner profile
    pub user_profile: Option<&'a serde_json::Value>,
}

/// A fully built prompt ready for the generation client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System instruction
    pub system: String,

    /// User message
    pub user: String,

    /// Schema instruction, if the definition has one
    pub schema: Option<String>,

    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_type_parsing() {
        assert_eq!(
            "chain-of-thought".parse::<PromptType>().unwrap(),
            PromptType::ChainOfThought
        );
        assert_eq!("ZERO_SHOT".parse::<PromptType>().unwrap(), PromptType::ZeroShot);
        assert!("few_shot".parse::<PromptType>().is_err());
    }

    #[test]
    fn test_prompt_type_serde_matches_as_str() {
        for pt in PromptType::ALL {
            let json = serde_json::to_value(pt).unwrap();
            assert_eq!(json, pt.as_str());
        }
    }

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: answer.dynamic
title: Adaptive answer
apiVersion: "1.0"
promptType: dynamic
flow: answer
system: "You adapt."
template: "{{message}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.prompt_type, PromptType::Dynamic);
        assert_eq!(def.flow, Flow::Answer);
        assert!(def.schema.is_none());
    }
}
