//! Core type definitions for the task-graph planner.
//!
//! This module contains the plan and workflow structures passed between
//! the decomposer and downstream executors.

mod plan;
mod workflow;

pub use plan::PlannedTask;
pub use workflow::{TaskNode, TaskParams, WorkflowDefinition};

/// Task type used when a plan entry names neither a type nor a capability.
pub const NOOP_TASK_TYPE: &str = "noop";
