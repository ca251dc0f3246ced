//! Deterministic local responses used when no provider answer is available.
//!
//! Both builders always produce the full response shape of their flow so
//! callers never have to special-case degraded mode.

use crate::context::truncate_chars;
use crate::types::UserQuery;
use serde_json::{json, Map, Value};

const ROADMAP_PREVIEW_CHARS: usize = 2000;
const ANSWER_PREVIEW_CHARS: usize = 1000;

/// Goal tag inferred from the message.
pub fn primary_goal(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("frontend") {
        "frontend developer"
    } else if lower.contains("full-stack") || lower.contains("full stack") {
        "full-stack developer"
    } else if lower.contains("react") {
        "React developer"
    } else {
        "general software development"
    }
}

/// Two-phase skeleton roadmap.
pub fn local_roadmap(query: &UserQuery, context: &str) -> Value {
    let current_level = query.profile_field("current_level").unwrap_or("unknown");
    let time_commitment = query
        .profile_field("time_commitment")
        .unwrap_or("unspecified");

    let mut roadmap = json!({
        "user_profile": {
            "current_level": current_level,
            "primary_goal": primary_goal(&query.message),
            "timeline": "unspecified",
            "learning_style": "unspecified",
            "time_commitment": time_commitment
        },
        "roadmap": {
            "phases": [
                {
                    "phase_id": 1,
                    "title": "Foundations",
                    "duration": "2-6 weeks",
                    "learning_objectives": ["Understand core concepts"],
                    "modules": [
                        {
                            "module_name": "Core Concepts",
                            "concepts": ["fundamentals"],
                            "resources": [
                                {
                                    "type": "documentation",
                                    "title": "MDN Web Docs",
                                    "url": "https://developer.mozilla.org/",
                                    "difficulty": "beginner",
                                    "estimated_time": "varies"
                                },
                                {
                                    "type": "tutorial",
                                    "title": "Free interactive tutorial",
                                    "url": "https://www.freecodecamp.org/",
                                    "difficulty": "beginner",
                                    "estimated_time": "varies"
                                }
                            ],
                            "hands_on_project": {
                                "title": "Small foundation project",
                                "description": "Build a small app to practice basics",
                                "skills_practiced": ["basics"],
                                "deliverables": ["repo", "README"],
                                "estimated_time": "1-2 weeks",
                                "difficulty": "beginner"
                            },
                            "prerequisites": [],
                            "success_metrics": ["Can explain core concepts"]
                        }
                    ]
                },
                {
                    "phase_id": 2,
                    "title": "Applied Learning",
                    "duration": "4-12 weeks",
                    "learning_objectives": ["Apply skills to projects"],
                    "modules": []
                }
            ],
            "total_duration": "3 months (approx)",
            "difficulty_progression": ["beginner", "intermediate"]
        },
        "milestone_checkpoints": ["Finish foundations project", "Complete small applied project"],
        "next_steps": "Start with Phase 1: follow the listed resources and build the small project."
    });

    if let Some(map) = roadmap.as_object_mut() {
        attach_extras(map, query, context, ROADMAP_PREVIEW_CHARS);
    }
    roadmap
}

/// Generic `{explanation, key_points, next_steps}` answer.
pub fn local_answer(query: &UserQuery, context: &str) -> Value {
    let message = query.message.trim();
    let lower = message.to_lowercase();

    let (key_points, next_steps) = if lower.contains("roadmap") || lower.contains("learning") {
        (
            vec![
                "Clarify your goal and time commitment",
                "Break learning into 3-4 progressive phases",
                "Prioritize hands-on projects",
            ],
            "Provide your current skill level and weekly hours to get a tailored roadmap.",
        )
    } else {
        (
            vec!["Be specific about goal", "Ask for step-by-step plan or resources"],
            "If you want more detail, try rephrasing with specifics (goal, timeline, weekly hours).",
        )
    };

    let mut answer = Map::new();
    answer.insert(
        "explanation".to_string(),
        Value::String(format!(
            "Received your query: {}. The language model provider is unavailable; returning a brief local suggestion.",
            message
        )),
    );
    answer.insert("key_points".to_string(), json!(key_points));
    answer.insert("next_steps".to_string(), json!(next_steps));

    attach_extras(&mut answer, query, context, ANSWER_PREVIEW_CHARS);
    Value::Object(answer)
}

/// Turn unparseable provider text into an answer payload.
pub fn polish_answer(raw: &str, query: &UserQuery) -> Value {
    let mut answer = Map::new();
    answer.insert("explanation".to_string(), Value::String(raw.trim().to_string()));
    answer.insert("key_points".to_string(), json!([]));
    answer.insert(
        "next_steps".to_string(),
        json!("Ask a follow-up question to go deeper on any part of this answer."),
    );
    if let Some(session_id) = &query.session_id {
        answer.insert("session_id".to_string(), json!(session_id));
    }
    Value::Object(answer)
}

/// Local roadmap carrying the provider's unparseable text.
pub fn polish_roadmap(raw: &str, query: &UserQuery, context: &str) -> Value {
    let mut roadmap = local_roadmap(query, context);
    if let Some(map) = roadmap.as_object_mut() {
        map.insert("raw_response".to_string(), Value::String(raw.to_string()));
    }
    roadmap
}

fn attach_extras(map: &mut Map<String, Value>, query: &UserQuery, context: &str, preview_chars: usize) {
    if let Some(session_id) = &query.session_id {
        map.insert("session_id".to_string(), json!(session_id));
    }
    if !context.is_empty() {
        map.insert(
            "context_preview".to_string(),
            Value::String(truncate_chars(context, preview_chars).to_string()),
        );
    }
}
