use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::NOOP_TASK_TYPE;
use crate::{Error, Result};

/// Opaque task payload.
pub type TaskParams = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Workflow Types (handed to the executor)
// =============================================================================

/// A task bound to a concrete agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique id within the workflow.
    pub task_id: String,

    /// Agent that executes the task.
    pub agent_id: String,

    /// Operation classifier.
    pub task_type: String,

    /// Opaque payload.
    #[serde(default)]
    pub params: TaskParams,

    /// Ids of tasks that must finish first.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl TaskNode {
    /// Create a task with no params and no dependencies.
    pub fn new(
        task_id: impl Into<String>,
        agent_id: impl Into<String>,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            params: TaskParams::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Create a no-op task.
    pub fn noop(task_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self::new(task_id, agent_id, NOOP_TASK_TYPE)
    }

    /// Add a single param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the dependencies.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// Ordered set of tasks produced by one decomposition.
///
/// The planner does not check dependencies. Executors that need an
/// acyclic, closed graph call [`validate`](Self::validate) or
/// [`topological_order`](Self::topological_order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Tasks in plan order.
    pub tasks: Vec<TaskNode>,
}

impl WorkflowDefinition {
    /// Create a workflow from tasks.
    pub fn new(tasks: Vec<TaskNode>) -> Self {
        Self { tasks }
    }

    /// Create a workflow holding a single task.
    pub fn single(task: TaskNode) -> Self {
        Self { tasks: vec![task] }
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate tasks in plan order.
    pub fn iter(&self) -> std::slice::Iter<'_, TaskNode> {
        self.tasks.iter()
    }

    /// Look up a task by id.
    pub fn get(&self, task_id: &str) -> Option<&TaskNode> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Task ids in plan order.
    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.task_id.as_str()).collect()
    }

    /// Dependencies naming tasks that are not in this workflow, as
    /// `(task_id, missing_dependency)` pairs.
    pub fn dangling_dependencies(&self) -> Vec<(&str, &str)> {
        let known: HashSet<&str> = self.tasks.iter().map(|t| t.task_id.as_str()).collect();

        self.tasks
            .iter()
            .flat_map(|t| {
                t.dependencies
                    .iter()
                    .filter(|d| !known.contains(d.as_str()))
                    .map(move |d| (t.task_id.as_str(), d.as_str()))
            })
            .collect()
    }

    /// Order tasks so every task follows its dependencies.
    ///
    /// Ready tasks are emitted in plan order. Fails on duplicate ids,
    /// dangling dependencies, or cycles.
    pub fn topological_order(&self) -> Result<Vec<&TaskNode>> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.tasks.len());
        for (i, task) in self.tasks.iter().enumerate() {
            if index.insert(task.task_id.as_str(), i).is_some() {
                return Err(Error::invalid_workflow(format!(
                    "duplicate task id '{}'",
                    task.task_id
                )));
            }
        }

        if let Some((task_id, dep)) = self.dangling_dependencies().first() {
            return Err(Error::invalid_workflow(format!(
                "task '{}' depends on unknown task '{}'",
                task_id, dep
            )));
        }

        let mut in_degree = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in &task.dependencies {
                let d = index[dep.as_str()];
                dependents[d].push(i);
                in_degree[i] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| i)
            .collect();
        let mut ordered = Vec::with_capacity(self.tasks.len());

        while let Some(i) = ready.pop_first() {
            ordered.push(&self.tasks[i]);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if ordered.len() < self.tasks.len() {
            let stuck: Vec<&str> = self
                .tasks
                .iter()
                .zip(&in_degree)
                .filter(|(_, deg)| **deg > 0)
                .map(|(t, _)| t.task_id.as_str())
                .collect();
            return Err(Error::invalid_workflow(format!(
                "dependency cycle among tasks: {}",
                stuck.join(", ")
            )));
        }

        Ok(ordered)
    }

    /// Check that ids are unique, dependencies resolve, and there are no cycles.
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }
}

impl IntoIterator for WorkflowDefinition {
    type Item = TaskNode;
    type IntoIter = std::vec::IntoIter<TaskNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

impl<'a> IntoIterator for &'a WorkflowDefinition {
    type Item = &'a TaskNode;
    type IntoIter = std::slice::Iter<'a, TaskNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

impl FromIterator<TaskNode> for WorkflowDefinition {
    fn from_iter<I: IntoIterator<Item = TaskNode>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
