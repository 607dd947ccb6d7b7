//! Affiliation and split partitioning
//!
//! The per-agent split keys of one class live in a `SplitIndex`, a side map
//! scoped to the class being built. Nothing is written onto the agents.

use ahash::AHashMap;
use tracing::warn;

use crate::core::types::{AgentId, Value};
use crate::location::LocationPolicy;
use crate::model::Model;

/// Parent identity used when an agent has no parent of the nest type
pub const NO_PARENT: &str = "None";

/// Agents of `pool` passing the class filter, in pool order
pub fn affiliated(model: &Model, policy: &dyn LocationPolicy, pool: &[AgentId]) -> Vec<AgentId> {
    pool.iter()
        .copied()
        .filter(|id| model.agent(*id).map_or(false, |agent| policy.filter(agent)))
        .collect()
}

/// `"<group value>-<group id>"` of the agent's parent location of type `nest`
///
/// Several candidate parents is a misconfiguration; it is logged and the first
/// one (lowest id) wins.
pub fn parent_identity(model: &Model, agent: AgentId, nest: &str) -> String {
    let parents = model.graph().locations_of_with_type(agent, nest);
    if parents.len() > 1 {
        warn!(
            "{} has {} locations of class {} as potential parents; using the first",
            agent,
            parents.len(),
            nest
        );
    }
    parents
        .first()
        .and_then(|id| model.location(*id))
        .map(|parent| parent.group_identity())
        .unwrap_or_else(|| NO_PARENT.to_string())
}

/// Split keys of every affiliated agent of one class
#[derive(Debug, Default)]
pub struct SplitIndex {
    values: Vec<Value>,
    order: Vec<AgentId>,
    keys: AHashMap<AgentId, Vec<Value>>,
}

impl SplitIndex {
    /// Evaluate `split` for every agent. With `nest` set, each key is prefixed
    /// with the agent's parent identity.
    pub fn build(model: &Model, policy: &dyn LocationPolicy, agents: &[AgentId], nest: Option<&str>) -> Self {
        let mut index = SplitIndex::default();

        for &id in agents {
            let Some(agent) = model.agent(id) else {
                continue;
            };
            if index.keys.contains_key(&id) {
                continue;
            }

            let prefix = nest.map(|parent_type| parent_identity(model, id, parent_type));
            let mut agent_keys: Vec<Value> = Vec::new();
            for raw in policy.split(agent) {
                let key = match &prefix {
                    Some(parent) => Value::Str(format!("{}-{}", parent, raw)),
                    None => raw,
                };
                if !agent_keys.contains(&key) {
                    agent_keys.push(key);
                }
            }

            for key in &agent_keys {
                if !index.values.contains(key) {
                    index.values.push(key.clone());
                }
            }
            index.order.push(id);
            index.keys.insert(id, agent_keys);
        }

        index
    }

    /// Distinct keys in first-seen order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Agents mapping to `value`, in input order
    pub fn agents_for(&self, value: &Value) -> Vec<AgentId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.keys_of(*id).map_or(false, |keys| keys.contains(value)))
            .collect()
    }

    pub fn keys_of(&self, agent: AgentId) -> Option<&[Value]> {
        self.keys.get(&agent).map(Vec::as_slice)
    }
}
