//! Plan normalization.
//!
//! Turns the JSON an LLM returns for a planning prompt into a
//! [`WorkflowDefinition`]. Model output is loosely shaped, so every task
//! field is read through a fixed alias table and defaulted when missing.
//! Only invalid JSON is an error; any other malformed shape degrades to a
//! usable plan.

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;

use taskgraph_core::{
    traits::CapabilityMatcher,
    types::{PlannedTask, TaskNode, TaskParams, WorkflowDefinition, NOOP_TASK_TYPE},
    Result,
};

/// Keys for the operation type, highest priority first.
const TYPE_KEYS: &[&str] = &["type", "task_type", "capability", "cap"];
/// Keys for the capability used in agent matching.
const CAPABILITY_KEYS: &[&str] = &["capability", "cap"];
/// Keys for the task payload.
const PARAMS_KEYS: &[&str] = &["params", "parameters"];
/// Keys for predecessor ids.
const DEPS_KEYS: &[&str] = &["deps", "dependencies"];

/// Parse LLM plan text into a workflow.
///
/// Fails only when `text` is not valid JSON. A missing or empty `tasks`
/// list yields a single no-op task for `default_agent`; non-object entries
/// are skipped. Tasks whose capability the matcher cannot resolve (or
/// whose lookup fails) go to `default_agent`.
pub async fn parse_plan(
    text: &str,
    matcher: &dyn CapabilityMatcher,
    default_agent: &str,
) -> Result<WorkflowDefinition> {
    let value: Value = serde_json::from_str(text)?;

    let Some(planned) = normalize_tasks(&value) else {
        tracing::debug!("Plan has no tasks, using no-op plan");
        return Ok(WorkflowDefinition::single(TaskNode::noop("t1", default_agent)));
    };

    let mut tasks = Vec::with_capacity(planned.len());
    for task in planned {
        let agent_id = match task.capability.as_deref() {
            Some(capability) => resolve_agent(matcher, capability)
                .await
                .unwrap_or_else(|| default_agent.to_string()),
            None => default_agent.to_string(),
        };

        tracing::debug!(
            task_id = %task.id,
            agent_id = %agent_id,
            capability = ?task.capability,
            "Resolved plan task"
        );

        let task_type = if task.task_type.is_empty() {
            task.capability
                .clone()
                .unwrap_or_else(|| NOOP_TASK_TYPE.to_string())
        } else {
            task.task_type
        };

        tasks.push(TaskNode {
            task_id: task.id,
            agent_id,
            task_type,
            params: task.params,
            dependencies: task.dependencies,
        });
    }

    Ok(WorkflowDefinition::new(tasks))
}

/// Normalize the `tasks` list of a parsed plan.
///
/// Returns `None` when `plan` is not an object or `tasks` is missing,
/// not a list, or empty. Ids are deduplicated in list order.
pub fn normalize_tasks(plan: &Value) -> Option<Vec<PlannedTask>> {
    let entries = plan.get("tasks")?.as_array().filter(|t| !t.is_empty())?;

    let mut seen = HashSet::new();
    let planned = entries
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(i, entry)| {
            let mut task = normalize_entry(entry, i + 1);
            task.id = unique_id(task.id, &seen);
            seen.insert(task.id.clone());
            task
        })
        .collect();

    Some(planned)
}

/// Normalize one task object. `position` is 1-based among object entries.
fn normalize_entry(entry: &serde_json::Map<String, Value>, position: usize) -> PlannedTask {
    let id = first_truthy(entry, &["id"])
        .map(stringify)
        .unwrap_or_else(|| format!("t{}", position));

    let task_type = first_truthy(entry, TYPE_KEYS)
        .map(stringify)
        .unwrap_or_else(|| NOOP_TASK_TYPE.to_string());

    let capability = first_truthy(entry, CAPABILITY_KEYS).map(stringify);

    let params: TaskParams = first_truthy(entry, PARAMS_KEYS)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let dependencies: BTreeSet<String> = match first_truthy(entry, DEPS_KEYS) {
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        Some(single) => BTreeSet::from([stringify(single)]),
        None => BTreeSet::new(),
    };

    PlannedTask {
        id,
        task_type,
        capability,
        params,
        dependencies,
    }
}

/// Ask the matcher for an agent. Lookup errors and empty ids count as no match.
async fn resolve_agent(matcher: &dyn CapabilityMatcher, capability: &str) -> Option<String> {
    match matcher.find_agent_for(capability).await {
        Ok(Some(agent_id)) if !agent_id.is_empty() => Some(agent_id),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(
                capability = capability,
                error = %e,
                "Capability lookup failed, using default agent"
            );
            None
        }
    }
}

/// Disambiguate `id` against ids already emitted.
fn unique_id(id: String, seen: &HashSet<String>) -> String {
    if !seen.contains(&id) {
        return id;
    }

    let mut n = seen.len();
    loop {
        let candidate = format!("{}-{}", id, n + 1);
        if !seen.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// First value under `keys` that is not null, false, zero, or empty.
fn first_truthy<'a>(entry: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| entry.get(*k))
        .find(|v| is_truthy(v))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Strings verbatim, anything else as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
