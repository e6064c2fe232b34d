//! LLM-driven task decomposition.
//!
//! The decomposer asks an LLM to break a request into a JSON task list,
//! normalizes the answer with [`parse_plan`], and resolves each task's
//! capability to an agent. It never fails: if the LLM call or the parse
//! goes wrong, the caller gets a single no-op task carrying the original
//! query so the request can be retried or inspected by hand.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use taskgraph_core::{
    traits::{CapabilityMatcher, LlmClient},
    types::{TaskNode, WorkflowDefinition},
    Error, Result,
};

use crate::plan::parse_plan;

/// Context key naming the fallback agent.
pub const DEFAULT_AGENT_KEY: &str = "default_agent";

/// Per-call context passed to [`LlmTaskDecomposer::decompose`].
pub type DecompositionContext = HashMap<String, serde_json::Value>;

/// Decomposer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecomposerConfig {
    /// Agent used when the context names none.
    pub default_agent: String,
    /// Pull the JSON object out of fenced or prose-wrapped responses.
    pub strip_code_fences: bool,
    /// Capability names listed in the prompt.
    pub capabilities: Vec<String>,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            default_agent: "analyst".to_string(),
            strip_code_fences: true,
            capabilities: Vec::new(),
        }
    }
}

impl DecomposerConfig {
    /// Load configuration from YAML. Missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Breaks natural-language requests into task graphs.
pub struct LlmTaskDecomposer {
    /// LLM client for planning.
    llm: Arc<dyn LlmClient>,
    /// Capability resolution.
    matcher: Arc<dyn CapabilityMatcher>,
    /// Configuration.
    config: DecomposerConfig,
}

impl LlmTaskDecomposer {
    /// Create a decomposer with default configuration.
    pub fn new(llm: Arc<dyn LlmClient>, matcher: Arc<dyn CapabilityMatcher>) -> Self {
        Self {
            llm,
            matcher,
            config: DecomposerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: DecomposerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Decompose `query` into a workflow.
    ///
    /// The default agent is `context["default_agent"]` when that is a
    /// non-empty string, otherwise [`DecomposerConfig::default_agent`].
    /// Any failure yields a single `noop` task for the default agent with
    /// `params.query` set to `query`.
    pub async fn decompose(&self, query: &str, context: &DecompositionContext) -> WorkflowDefinition {
        let default_agent = self.default_agent(context);

        tracing::info!(
            query_len = query.len(),
            default_agent = %default_agent,
            "Decomposing request"
        );

        match self.try_decompose(query, &default_agent).await {
            Ok(workflow) => {
                tracing::info!(task_count = workflow.len(), "Decomposition complete");
                workflow
            }
            Err(e) => {
                tracing::warn!(error = %e, "Decomposition failed, using fallback plan");
                Self::fallback(query, &default_agent)
            }
        }
    }

    /// Decompose `query`, surfacing LLM and parse errors.
    pub async fn try_decompose(&self, query: &str, default_agent: &str) -> Result<WorkflowDefinition> {
        let prompt = self.build_prompt(query);
        let response = self.llm.generate(&prompt).await?;

        tracing::debug!(
            response_len = response.content.len(),
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Planner response received"
        );

        let raw = response.content.as_str();
        match parse_plan(raw, self.matcher.as_ref(), default_agent).await {
            Err(Error::PlanParse(e)) if self.config.strip_code_fences => {
                let span = extract_json(raw);
                if span.len() == raw.len() {
                    return Err(Error::PlanParse(e));
                }
                tracing::debug!(error = %e, "Reply is not bare JSON, retrying on object span");
                parse_plan(span, self.matcher.as_ref(), default_agent).await
            }
            result => result,
        }
    }

    /// Build the planning prompt for `query`.
    pub fn build_prompt(&self, query: &str) -> String {
        let capabilities = if self.config.capabilities.is_empty() {
            String::new()
        } else {
            format!(
                "\nAVAILABLE CAPABILITIES:\n{}\n",
                self.config
                    .capabilities
                    .iter()
                    .map(|c| format!("- {}", c))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        format!(
            r#"You are a planner that breaks a request into executable tasks.

REQUEST: {query}
{capabilities}
Respond with a single JSON object of the form:
{{"tasks": [{{"id": "t1", "type": "<operation>", "capability": "<capability>", "params": {{}}, "deps": []}}]}}

Each task has:
- id: unique task id
- type: the operation to perform
- capability: the capability an agent needs to run it
- params: an object with the task inputs
- deps: ids of tasks that must finish first

Return only the JSON object."#
        )
    }

    fn default_agent(&self, context: &DecompositionContext) -> String {
        context
            .get(DEFAULT_AGENT_KEY)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.default_agent.as_str())
            .to_string()
    }

    fn fallback(query: &str, default_agent: &str) -> WorkflowDefinition {
        WorkflowDefinition::single(TaskNode::noop("t1", default_agent).with_param("query", query))
    }
}

/// The outermost `{ ... }` span of `text`, or `text` itself when there is none.
fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
