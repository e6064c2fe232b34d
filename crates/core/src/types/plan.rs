use std::collections::BTreeSet;

use super::workflow::TaskParams;

// =============================================================================
// Plan Types (normalized LLM output, before agent resolution)
// =============================================================================

/// A plan entry after key-alias resolution and defaulting.
///
/// Never handed to executors; the planner turns each one into a
/// [`TaskNode`](super::TaskNode) once its agent is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    /// Task id, unique within the plan after deduplication.
    pub id: String,

    /// Operation classifier.
    pub task_type: String,

    /// Capability used to pick an agent.
    pub capability: Option<String>,

    /// Opaque payload.
    pub params: TaskParams,

    /// Ids of tasks that must finish first.
    pub dependencies: BTreeSet<String>,
}
