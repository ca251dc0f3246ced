//! End-to-end query behavior.

use super::doubles::{orchestrator, ScriptedGenerator};
use crate::types::UserQuery;
use learnpath_core::AppError;
use learnpath_knowledge::{DocumentType, KnowledgeDocument};
use learnpath_llm::OfflineClient;
use learnpath_prompt::PromptType;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_query_before_initialize_is_rejected() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(ScriptedGenerator::failing()));

    let result = agent.process_query(UserQuery::new("What is a closure?")).await;
    assert!(matches!(result, Err(AppError::NotInitialized(_))));
}

#[tokio::test]
async fn test_blank_message_is_invalid() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new(&[r#"{"explanation":"x"}"#]));
    let agent = orchestrator(dir.path(), generator.clone());
    agent.initialize().await.unwrap();

    let result = agent.process_query(UserQuery::new("   ")).await;
    assert!(matches!(result, Err(AppError::InvalidQuery(_))));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_aborts_initialize() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();

    let agent = orchestrator(&blocker.join("store"), Arc::new(ScriptedGenerator::failing()));
    assert!(matches!(agent.initialize().await, Err(AppError::StoreInit(_))));
    assert!(!agent.is_initialized());
    assert_eq!(agent.health().await.status, "unavailable");
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(ScriptedGenerator::failing()));

    let first = agent.initialize().await.unwrap();
    let second = agent.initialize().await.unwrap();
    assert!(first.store_ready && second.store_ready);
    assert!(first.provider_available);
    assert_eq!(first.provider, "scripted");
    assert_eq!(second.documents, 0);
}

#[tokio::test]
async fn test_provider_failure_degrades_to_local_answer() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::failing());
    let agent = orchestrator(dir.path(), generator.clone());
    agent.initialize().await.unwrap();

    let reply = agent
        .process_query(UserQuery::new("What is a closure?"))
        .await
        .unwrap();
    assert!(reply.response["explanation"].is_string());
    assert!(reply.response["key_points"].is_array());
    assert!(reply.response["next_steps"].is_string());
    assert_eq!(reply.metadata["generation"], "local");
    assert_eq!(reply.metadata["intent"], "answer");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let roadmap = agent
        .process_query(UserQuery::new("Plan my learning path for Rust"))
        .await
        .unwrap();
    for key in ["user_profile", "roadmap", "milestone_checkpoints", "next_steps"] {
        assert!(roadmap.response.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(roadmap.metadata["generation"], "local");
}

#[tokio::test]
async fn test_offline_client_never_reaches_provider() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(OfflineClient::new("no API key")));

    let report = agent.initialize().await.unwrap();
    assert!(!report.provider_available);

    let reply = agent.process_query(UserQuery::new("Explain Git rebase")).await.unwrap();
    assert!(reply.response["explanation"].is_string());
    assert_eq!(agent.health().await.status, "degraded");
}

#[tokio::test]
async fn test_intent_routing() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(ScriptedGenerator::failing()));
    agent.initialize().await.unwrap();

    let roadmap = agent
        .process_query(UserQuery::new("I want a roadmap to learn React"))
        .await
        .unwrap();
    let phases = roadmap.response["roadmap"]["phases"].as_array().unwrap();
    assert!(!phases.is_empty());
    assert_eq!(roadmap.response["user_profile"]["primary_goal"], "React developer");
    assert_eq!(roadmap.metadata["intent"], "roadmap");

    let answer = agent
        .process_query(UserQuery::new("What is a closure?"))
        .await
        .unwrap();
    assert!(answer.response.get("explanation").is_some());
    assert!(answer.response.get("roadmap").is_none());
}

#[tokio::test]
async fn test_structured_provider_reply_is_returned() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new(&[
        "Sure!\n```json\n{\"explanation\": \"A closure captures {scope}\", \"key_points\": [\"capture\"], \"next_steps\": \"practice\"}\n```",
    ]));
    let agent = orchestrator(dir.path(), generator.clone());
    agent.initialize().await.unwrap();

    let reply = agent
        .process_query(UserQuery::new("What is a closure?").with_prompt_type(PromptType::ChainOfThought))
        .await
        .unwrap();
    assert_eq!(
        reply.response,
        json!({"explanation": "A closure captures {scope}", "key_points": ["capture"], "next_steps": "practice"})
    );
    assert_eq!(reply.metadata["generation"], "provider");
    assert_eq!(reply.metadata["prompt_type"], "chain_of_thought");

    let systems = generator.systems.lock().unwrap();
    assert!(systems[0].contains("explanation"));
}

#[tokio::test]
async fn test_unstructured_reply_is_polished() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(
        dir.path(),
        Arc::new(ScriptedGenerator::new(&["Closures capture their environment.", "Phase one: HTML"])),
    );
    agent.initialize().await.unwrap();

    let answer = agent.process_query(UserQuery::new("What is a closure?")).await.unwrap();
    assert_eq!(answer.response["explanation"], "Closures capture their environment.");
    assert_eq!(answer.metadata["generation"], "provider_unstructured");

    let roadmap = agent.process_query(UserQuery::new("roadmap for web dev")).await.unwrap();
    assert_eq!(roadmap.response["raw_response"], "Phase one: HTML");
    assert!(roadmap.response["roadmap"]["phases"].is_array());
}

#[tokio::test]
async fn test_scalar_reply_is_treated_as_text() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(ScriptedGenerator::new(&["42", "[\"html\", \"css\"]"])));
    agent.initialize().await.unwrap();

    let answer = agent.process_query(UserQuery::new("What is the answer?")).await.unwrap();
    assert!(answer.response.is_object());
    assert_eq!(answer.response["explanation"], "42");
    assert_eq!(answer.metadata["generation"], "provider_unstructured");

    let roadmap = agent
        .process_query(UserQuery::new("roadmap for web dev").with_session("s-scalar"))
        .await
        .unwrap();
    assert!(roadmap.response["roadmap"]["phases"].is_array());
    assert!(agent.session_roadmap("s-scalar").await.is_some());
}

#[tokio::test]
async fn test_session_roadmap_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(
        dir.path(),
        Arc::new(ScriptedGenerator::new(&[
            r#"{"roadmap": {"phases": [{"phase_id": 1, "title": "First"}]}, "next_steps": "a"}"#,
            r#"{"roadmap": {"phases": [{"phase_id": 1, "title": "Second"}]}, "next_steps": "b"}"#,
        ])),
    );
    agent.initialize().await.unwrap();

    for message in ["roadmap for Python", "roadmap for Go"] {
        agent
            .process_query(UserQuery::new(message).with_session("learner-1"))
            .await
            .unwrap();
    }

    assert_eq!(
        agent.session_roadmap("learner-1").await,
        Some(json!({"phases": [{"phase_id": 1, "title": "Second"}]}))
    );
    let info = agent.session_info("learner-1").await;
    assert!(info.exists);
    assert_eq!(info.query_count, 2);
    assert!(!agent.session_info("someone-else").await.exists);
}

#[tokio::test]
async fn test_empty_store_unreachable_provider_scenario() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::unreachable());
    let agent = orchestrator(dir.path(), generator.clone());

    let report = agent.initialize().await.unwrap();
    assert!(!report.provider_available);

    let reply = agent
        .process_query(UserQuery::new("Give me a full-stack roadmap in 3 months"))
        .await
        .unwrap();

    let phases = reply.response["roadmap"]["phases"].as_array().unwrap();
    assert_eq!(phases.len(), 2);
    assert_eq!(reply.response["user_profile"]["primary_goal"], "full-stack developer");
    assert!(reply.context_used.is_empty());
    assert!(reply.retrieval_sources.is_empty());
    assert!(reply.processing_time >= 0.0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retrieved_context_is_used() {
    let dir = TempDir::new().unwrap();
    let agent = orchestrator(dir.path(), Arc::new(ScriptedGenerator::failing()));
    agent.initialize().await.unwrap();

    let docs = vec![
        KnowledgeDocument::new(
            "react-hooks",
            "React hooks",
            "React hooks let function components use state and effects.",
            "react.dev",
            DocumentType::Documentation,
        ),
        KnowledgeDocument::new(
            "react-hooks-blog",
            "Thinking in React hooks",
            "Custom React hooks share stateful logic between components.",
            "react.dev",
            DocumentType::Blog,
        ),
    ];
    assert_eq!(agent.store().add_documents_batch(docs).await, 2);

    let reply = agent
        .process_query(UserQuery::new("How do React hooks work?").with_session("s"))
        .await
        .unwrap();
    assert_eq!(reply.context_used.len(), 1);
    assert!(reply.context_used[0].contains("Source: react.dev"));
    assert_eq!(reply.retrieval_sources, vec!["react.dev"]);
    assert!(reply.response["context_preview"].is_string());
    assert_eq!(reply.response["session_id"], "s");

    let health = agent.health().await;
    assert_eq!(health.knowledge_base_stats.unwrap().total_documents, 2);
    assert_eq!(health.active_sessions, 1);
}
