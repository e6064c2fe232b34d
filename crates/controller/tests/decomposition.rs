//! End-to-end planning scenarios through the public API.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use taskgraph_controller::{
    parse_plan, CapabilityMatcher, CapabilityRegistry, DecompositionContext, LlmClient,
    LlmTaskDecomposer, RegistryCapabilityMatcher, StaticCapabilityMatcher, DEFAULT_AGENT_KEY,
};
use taskgraph_core::{
    traits::{ChatMessage, LlmResponse},
    types::{TaskNode, WorkflowDefinition},
    Error, Result,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("taskgraph_controller=debug")
        .with_test_writer()
        .try_init();
}

struct CannedLlm(std::result::Result<String, String>);

#[async_trait]
impl LlmClient for CannedLlm {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        match &self.0 {
            Ok(text) => Ok(LlmResponse::text(text.clone())),
            Err(msg) => Err(Error::llm(msg.clone())),
        }
    }
}

fn static_matcher() -> StaticCapabilityMatcher {
    StaticCapabilityMatcher::from_pairs([
        ("data_analysis", "analyst"),
        ("report_generation", "reporter"),
    ])
}

#[tokio::test]
async fn test_analysis_then_report_plan() {
    init_tracing();
    let text = r#"{"tasks": [
        {"type": "analyze", "capability": "data_analysis", "params": {"x": 1}},
        {"id": "g1", "cap": "report_generation", "deps": ["t1"]}
    ]}"#;

    let wf = parse_plan(text, &static_matcher(), "worker").await.unwrap();

    let expected = WorkflowDefinition::new(vec![
        TaskNode::new("t1", "analyst", "analyze").with_param("x", 1),
        TaskNode::new("g1", "reporter", "report_generation").with_dependencies(["t1"]),
    ]);
    assert_eq!(wf, expected);
    wf.validate().unwrap();
}

#[tokio::test]
async fn test_empty_task_object_becomes_noop() {
    let wf = parse_plan(r#"{"tasks":[{}]}"#, &static_matcher(), "worker")
        .await
        .unwrap();
    assert_eq!(wf, WorkflowDefinition::single(TaskNode::noop("t1", "worker")));
}

#[tokio::test]
async fn test_invalid_json_raises_directly_but_not_through_decomposer() {
    init_tracing();
    assert!(parse_plan("not json", &static_matcher(), "worker").await.is_err());

    let decomposer = LlmTaskDecomposer::new(
        Arc::new(CannedLlm(Ok("not json".to_string()))),
        Arc::new(static_matcher()),
    );
    let context: DecompositionContext =
        HashMap::from([(DEFAULT_AGENT_KEY.to_string(), json!("analyst"))]);

    let wf = decomposer.decompose("find sales data", &context).await;
    assert_eq!(
        wf,
        WorkflowDefinition::single(
            TaskNode::noop("t1", "analyst").with_param("query", "find sales data")
        )
    );
}

#[tokio::test]
async fn test_network_failure_is_absorbed() {
    let decomposer = LlmTaskDecomposer::new(
        Arc::new(CannedLlm(Err("timeout".to_string()))),
        Arc::new(static_matcher()),
    );

    let wf = decomposer.decompose("plan a trip", &DecompositionContext::new()).await;
    assert_eq!(
        wf,
        WorkflowDefinition::single(TaskNode::noop("t1", "analyst").with_param("query", "plan a trip"))
    );
}

#[tokio::test]
async fn test_registry_backed_matching() {
    let registry = Arc::new(CapabilityRegistry::new());
    registry.register("a", ["x", "y"]);
    registry.register("b", ["y"]);

    assert_eq!(registry.agents_for("y"), vec!["a", "b"]);

    let matcher = RegistryCapabilityMatcher::new(registry.clone());
    assert_eq!(matcher.find_agent_for("y").await.unwrap(), Some("a".to_string()));

    let text = r#"{"tasks": [{"cap": "y"}, {"cap": "x"}, {"cap": "z"}]}"#;
    let wf = parse_plan(text, &matcher, "fallback").await.unwrap();
    let agents: Vec<&str> = wf.iter().map(|t| t.agent_id.as_str()).collect();
    assert_eq!(agents, vec!["a", "a", "fallback"]);
}

#[tokio::test]
async fn test_decomposer_with_registry_and_fenced_output() {
    let registry = Arc::new(CapabilityRegistry::new());
    registry.register("etl-1", ["ingest"]);
    registry.register("stats-1", ["data_analysis"]);

    let reply = "```json\n{\"tasks\": [\
        {\"id\": \"load\", \"type\": \"ingest\", \"capability\": \"ingest\"},\
        {\"id\": \"stats\", \"capability\": \"data_analysis\", \"dependencies\": [\"load\"]},\
        {\"id\": \"stats\", \"type\": \"publish\", \"deps\": [\"stats\"]}\
    ]}\n```";
    let decomposer = LlmTaskDecomposer::new(
        Arc::new(CannedLlm(Ok(reply.to_string()))),
        Arc::new(RegistryCapabilityMatcher::new(registry)),
    );

    let wf = decomposer
        .decompose("load and analyze", &DecompositionContext::new())
        .await;

    assert_eq!(wf.task_ids(), vec!["load", "stats", "stats-3"]);
    assert_eq!(wf.tasks[0].agent_id, "etl-1");
    assert_eq!(wf.tasks[1].agent_id, "stats-1");
    assert_eq!(wf.tasks[2].agent_id, "analyst");
    assert_eq!(
        wf.tasks[2].dependencies,
        BTreeSet::from(["stats".to_string()])
    );

    let order: Vec<&str> = wf
        .topological_order()
        .unwrap()
        .into_iter()
        .map(|t| t.task_id.as_str())
        .collect();
    assert_eq!(order, vec!["load", "stats", "stats-3"]);
}
