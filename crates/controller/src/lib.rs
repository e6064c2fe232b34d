//! Planning controller for the task-graph planner.
//!
//! This crate provides capability matching, plan normalization, and the
//! LLM task decomposer that produces executable workflows.

pub mod capability;
pub mod decomposer;
pub mod plan;

pub use capability::{CapabilityRegistry, RegistryCapabilityMatcher, StaticCapabilityMatcher};
pub use decomposer::{DecomposerConfig, DecompositionContext, LlmTaskDecomposer, DEFAULT_AGENT_KEY};
pub use plan::{normalize_tasks, parse_plan};
pub use taskgraph_core::traits::{CapabilityMatcher, LlmClient};
