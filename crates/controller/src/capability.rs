//! Capability registry and matchers.
//!
//! The registry keeps a bidirectional index between agent ids and the
//! capability tags they serve. Matchers resolve one capability to one
//! agent id and are what the planner consults.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;

use taskgraph_core::{traits::CapabilityMatcher, Error, Result};

// =============================================================================
// Registry
// =============================================================================

/// In-memory bidirectional index of agents and capabilities.
///
/// The two indices are updated one after the other; callers that mix
/// registration with lookups from other tasks must serialize them.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    /// capability -> agents
    by_capability: DashMap<String, BTreeSet<String>>,
    /// agent -> capabilities
    by_agent: DashMap<String, BTreeSet<String>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent for the given capabilities.
    ///
    /// Repeated calls union the capability sets. An empty iterator still
    /// records the agent with no capabilities.
    pub fn register<I, S>(&self, agent_id: &str, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let capabilities: Vec<String> = capabilities.into_iter().map(|c| c.to_string()).collect();

        self.by_agent
            .entry(agent_id.to_string())
            .or_default()
            .extend(capabilities.iter().cloned());

        for capability in &capabilities {
            self.by_capability
                .entry(capability.clone())
                .or_default()
                .insert(agent_id.to_string());
        }

        tracing::debug!(
            agent_id = agent_id,
            capabilities = capabilities.len(),
            "Registered agent capabilities"
        );
    }

    /// Remove an agent from every capability it serves.
    ///
    /// Capabilities left without agents are dropped. Unknown agents are
    /// ignored.
    pub fn unregister(&self, agent_id: &str) {
        let Some((_, capabilities)) = self.by_agent.remove(agent_id) else {
            return;
        };

        for capability in &capabilities {
            if let Some(mut agents) = self.by_capability.get_mut(capability) {
                agents.remove(agent_id);
            }
            self.by_capability
                .remove_if(capability, |_, agents| agents.is_empty());
        }

        tracing::debug!(agent_id = agent_id, "Unregistered agent");
    }

    /// Agents serving `capability`, sorted.
    pub fn agents_for(&self, capability: &str) -> Vec<String> {
        self.by_capability
            .get(capability)
            .map(|agents| agents.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Capabilities of `agent_id`, sorted.
    pub fn capabilities_for(&self, agent_id: &str) -> Vec<String> {
        self.by_agent
            .get(agent_id)
            .map(|caps| caps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All registered agents, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.by_agent.iter().map(|e| e.key().clone()).collect();
        agents.sort();
        agents
    }

    /// All capabilities with at least one agent, sorted.
    pub fn capabilities(&self) -> Vec<String> {
        let mut caps: Vec<String> = self
            .by_capability
            .iter()
            .map(|e| e.key().clone())
            .collect();
        caps.sort();
        caps
    }

    /// Whether no agent is registered.
    pub fn is_empty(&self) -> bool {
        self.by_agent.is_empty()
    }
}

// =============================================================================
// Matchers
// =============================================================================

/// Matcher backed by a fixed capability -> agent table.
#[derive(Debug, Default)]
pub struct StaticCapabilityMatcher {
    mapping: RwLock<HashMap<String, String>>,
}

impl StaticCapabilityMatcher {
    /// Create an empty matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher from `(capability, agent_id)` pairs.
    pub fn from_pairs<I, C, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, A)>,
        C: Into<String>,
        A: Into<String>,
    {
        pairs.into_iter().collect()
    }

    /// Bind `capability` to `agent_id`, replacing any previous binding.
    pub fn set(&self, capability: impl Into<String>, agent_id: impl Into<String>) -> Result<()> {
        self.mapping
            .write()
            .map_err(|_| Error::matcher("capability table lock poisoned"))?
            .insert(capability.into(), agent_id.into());
        Ok(())
    }
}

impl<C: Into<String>, A: Into<String>> FromIterator<(C, A)> for StaticCapabilityMatcher {
    fn from_iter<I: IntoIterator<Item = (C, A)>>(iter: I) -> Self {
        Self {
            mapping: RwLock::new(
                iter.into_iter()
                    .map(|(c, a)| (c.into(), a.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl CapabilityMatcher for StaticCapabilityMatcher {
    async fn find_agent_for(&self, required_capability: &str) -> Result<Option<String>> {
        let mapping = self
            .mapping
            .read()
            .map_err(|_| Error::matcher("capability table lock poisoned"))?;
        Ok(mapping.get(required_capability).cloned())
    }
}

/// Matcher backed by a [`CapabilityRegistry`].
///
/// Picks the lowest-sorting agent registered for the capability.
#[derive(Debug, Clone)]
pub struct RegistryCapabilityMatcher {
    registry: Arc<CapabilityRegistry>,
}

impl RegistryCapabilityMatcher {
    /// Create a matcher over `registry`.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CapabilityMatcher for RegistryCapabilityMatcher {
    async fn find_agent_for(&self, required_capability: &str) -> Result<Option<String>> {
        Ok(self
            .registry
            .agents_for(required_capability)
            .into_iter()
            .next())
    }
}
