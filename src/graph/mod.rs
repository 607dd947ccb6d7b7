//! Bipartite membership graph
//!
//! Two disjoint node sets (agents, locations) joined by weighted, undirected
//! membership edges. The partition is encoded in the key types, so an
//! agent-agent or location-location edge cannot be expressed at all.
//!
//! All listing queries return identifiers in ascending order.

use ahash::{AHashMap, AHashSet};

use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, NodeId};

#[derive(Debug, Clone)]
struct AgentNode {
    kind: String,
    locations: AHashSet<LocationId>,
}

#[derive(Debug, Clone)]
struct LocationNode {
    type_name: String,
    agents: AHashSet<AgentId>,
}

/// Agents, locations and the memberships between them
#[derive(Debug, Clone, Default)]
pub struct MembershipGraph {
    agents: AHashMap<AgentId, AgentNode>,
    locations: AHashMap<LocationId, LocationNode>,
    weights: AHashMap<(AgentId, LocationId), f64>,
}

fn sorted<T: Ord + Copy>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_unstable();
    out
}

fn type_allowed(type_name: &str, allowed: Option<&[&str]>) -> bool {
    match allowed {
        None => true,
        Some(types) => types.iter().any(|t| *t == type_name),
    }
}

impl MembershipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent node. No-op if already present.
    pub fn add_agent(&mut self, agent: AgentId, kind: &str) {
        self.agents.entry(agent).or_insert_with(|| AgentNode {
            kind: kind.to_string(),
            locations: AHashSet::new(),
        });
    }

    /// Register a location node. No-op if already present.
    pub fn add_location(&mut self, location: LocationId, type_name: &str) {
        self.locations.entry(location).or_insert_with(|| LocationNode {
            type_name: type_name.to_string(),
            agents: AHashSet::new(),
        });
    }

    pub fn has_agent(&self, agent: AgentId) -> bool {
        self.agents.contains_key(&agent)
    }

    pub fn has_location(&self, location: LocationId) -> bool {
        self.locations.contains_key(&location)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        match node {
            NodeId::Agent(a) => self.has_agent(a),
            NodeId::Location(l) => self.has_location(l),
        }
    }

    /// Type tag of a node: agent kind or location class name
    pub fn type_of(&self, node: NodeId) -> Option<&str> {
        match node {
            NodeId::Agent(a) => self.agents.get(&a).map(|n| n.kind.as_str()),
            NodeId::Location(l) => self.locations.get(&l).map(|n| n.type_name.as_str()),
        }
    }

    fn check_endpoints(&self, agent: AgentId, location: LocationId) -> Result<()> {
        if !self.has_agent(agent) {
            return Err(PopError::reference(agent, location, format!("{} is not registered", agent)));
        }
        if !self.has_location(location) {
            return Err(PopError::reference(
                agent,
                location,
                format!("{} is not registered", location),
            ));
        }
        Ok(())
    }

    /// Create or overwrite the edge between `agent` and `location`
    pub fn add_membership(&mut self, agent: AgentId, location: LocationId, weight: f64) -> Result<()> {
        self.check_endpoints(agent, location)?;

        if let Some(node) = self.agents.get_mut(&agent) {
            node.locations.insert(location);
        }
        if let Some(node) = self.locations.get_mut(&location) {
            node.agents.insert(agent);
        }
        self.weights.insert((agent, location), weight);
        Ok(())
    }

    /// Remove the edge if it exists; both endpoints must be registered
    pub fn remove_membership(&mut self, agent: AgentId, location: LocationId) -> Result<()> {
        self.check_endpoints(agent, location)?;
        if !self.has_membership(agent, location) {
            return Ok(());
        }

        self.weights.remove(&(agent, location));
        if let Some(node) = self.agents.get_mut(&agent) {
            node.locations.remove(&location);
        }
        if let Some(node) = self.locations.get_mut(&location) {
            node.agents.remove(&agent);
        }
        Ok(())
    }

    pub fn has_membership(&self, agent: AgentId, location: LocationId) -> bool {
        self.weights.contains_key(&(agent, location))
    }

    /// Remove an agent and all its edges. Returns false if it was absent.
    pub fn remove_agent(&mut self, agent: AgentId) -> bool {
        let Some(node) = self.agents.remove(&agent) else {
            return false;
        };
        for location in node.locations {
            self.weights.remove(&(agent, location));
            if let Some(loc) = self.locations.get_mut(&location) {
                loc.agents.remove(&agent);
            }
        }
        true
    }

    /// Remove a location and all its edges. Returns false if it was absent.
    pub fn remove_location(&mut self, location: LocationId) -> bool {
        let Some(node) = self.locations.remove(&location) else {
            return false;
        };
        for agent in node.agents {
            self.weights.remove(&(agent, location));
            if let Some(a) = self.agents.get_mut(&agent) {
                a.locations.remove(&location);
            }
        }
        true
    }

    pub fn locations_of(&self, agent: AgentId) -> Vec<LocationId> {
        self.agents
            .get(&agent)
            .map(|n| sorted(n.locations.iter().copied()))
            .unwrap_or_default()
    }

    pub fn agents_of(&self, location: LocationId) -> Vec<AgentId> {
        self.locations
            .get(&location)
            .map(|n| sorted(n.agents.iter().copied()))
            .unwrap_or_default()
    }

    /// Locations of `agent` whose class name is `type_name`
    pub fn locations_of_with_type(&self, agent: AgentId, type_name: &str) -> Vec<LocationId> {
        self.locations_of(agent)
            .into_iter()
            .filter(|l| self.type_of(NodeId::Location(*l)) == Some(type_name))
            .collect()
    }

    /// Agents sharing at least one location with `agent`, excluding `agent`.
    ///
    /// `location_types` restricts which locations count; `None` or an empty
    /// slice means all of them.
    pub fn neighbors_of_agent(&self, agent: AgentId, location_types: Option<&[&str]>) -> Vec<AgentId> {
        let Some(node) = self.agents.get(&agent) else {
            return Vec::new();
        };
        let filter = location_types.filter(|types| !types.is_empty());

        let mut neighbors: AHashSet<AgentId> = AHashSet::new();
        for location in &node.locations {
            let Some(loc) = self.locations.get(location) else {
                continue;
            };
            if !type_allowed(&loc.type_name, filter) {
                continue;
            }
            neighbors.extend(loc.agents.iter().copied().filter(|&other| other != agent));
        }
        sorted(neighbors.into_iter())
    }

    /// Nodes sitting on a length-2 path between `a` and `b`
    ///
    /// For two agents these are the locations they share, for two locations the
    /// agents they share. Mixed endpoints have no length-2 path in a bipartite
    /// graph and yield nothing. An empty `allowed_types` slice is rejected.
    pub fn objects_between(&self, a: NodeId, b: NodeId, allowed_types: Option<&[&str]>) -> Result<Vec<NodeId>> {
        if let Some(types) = allowed_types {
            if types.is_empty() {
                return Err(PopError::config(
                    "type filter for objects_between must name at least one type",
                ));
            }
        }
        for node in [a, b] {
            if !self.contains(node) {
                return Err(PopError::reference(a, b, format!("{} is not registered", node)));
            }
        }
        if a == b {
            return Ok(Vec::new());
        }

        let between: Vec<NodeId> = match (a, b) {
            (NodeId::Agent(x), NodeId::Agent(y)) => {
                let (xs, ys) = (&self.agents[&x].locations, &self.agents[&y].locations);
                sorted(xs.intersection(ys).copied())
                    .into_iter()
                    .map(NodeId::Location)
                    .collect()
            }
            (NodeId::Location(x), NodeId::Location(y)) => {
                let (xs, ys) = (&self.locations[&x].agents, &self.locations[&y].agents);
                sorted(xs.intersection(ys).copied())
                    .into_iter()
                    .map(NodeId::Agent)
                    .collect()
            }
            _ => Vec::new(),
        };

        Ok(between
            .into_iter()
            .filter(|node| self.type_of(*node).map_or(false, |t| type_allowed(t, allowed_types)))
            .collect())
    }

    pub fn get_weight(&self, agent: AgentId, location: LocationId) -> Result<f64> {
        self.weights
            .get(&(agent, location))
            .copied()
            .ok_or_else(|| PopError::reference(agent, location, "membership does not exist"))
    }

    pub fn set_weight(&mut self, agent: AgentId, location: LocationId, weight: f64) -> Result<()> {
        match self.weights.get_mut(&(agent, location)) {
            Some(w) => {
                *w = weight;
                Ok(())
            }
            None => Err(PopError::reference(agent, location, "membership does not exist")),
        }
    }

    /// All edges as (agent, location, weight), ordered by agent then location
    pub fn edges(&self) -> Vec<(AgentId, LocationId, f64)> {
        let mut edges: Vec<(AgentId, LocationId, f64)> =
            self.weights.iter().map(|(&(a, l), &w)| (a, l, w)).collect();
        edges.sort_unstable_by_key(|&(a, l, _)| (a, l));
        edges
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        sorted(self.agents.keys().copied())
    }

    pub fn location_ids(&self) -> Vec<LocationId> {
        sorted(self.locations.keys().copied())
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn edge_count(&self) -> usize {
        self.weights.len()
    }
}
