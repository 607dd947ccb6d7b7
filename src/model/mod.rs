//! Model - agents, locations and the membership graph between them
//!
//! The model is the query surface the simulation layer reads: membership,
//! neighbors, between-object paths and edge weights. The registry and the
//! graph are always mutated together so every graph node has a backing
//! record and vice versa.

use crate::agent::Agent;
use crate::core::config::MakerConfig;
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, NodeId, Record, Value};
use crate::graph::MembershipGraph;
use crate::location::{Location, LocationPolicy};
use crate::registry::Registry;

#[derive(Default)]
pub struct Model {
    registry: Registry,
    graph: MembershipGraph,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model whose identifier allocation follows `config`
    pub fn with_config(config: &MakerConfig) -> Self {
        Self {
            registry: Registry::new(config),
            graph: MembershipGraph::new(),
        }
    }

    pub fn graph(&self) -> &MembershipGraph {
        &self.graph
    }

    // === CREATION ===

    /// Create and register an agent carrying the columns of `record`
    pub fn spawn_agent(&mut self, kind: &str, record: &Record) -> Result<AgentId> {
        let id = self.registry.create_agent(kind, record)?;
        self.graph.add_agent(id, kind);
        Ok(id)
    }

    /// Create and register an empty instance of a location class
    pub fn spawn_location(&mut self, policy: &dyn LocationPolicy) -> Result<LocationId> {
        let id = self.registry.create_location(policy)?;
        self.graph.add_location(id, policy.type_name());
        Ok(id)
    }

    pub fn add_agent_to_location(&mut self, agent: AgentId, location: LocationId, weight: f64) -> Result<()> {
        self.graph.add_membership(agent, location, weight)
    }

    pub fn remove_agent_from_location(&mut self, agent: AgentId, location: LocationId) -> Result<()> {
        self.graph.remove_membership(agent, location)
    }

    // === REMOVAL ===

    pub fn remove_agent(&mut self, agent: AgentId) -> Option<Agent> {
        self.graph.remove_agent(agent);
        self.registry.remove_agent(agent)
    }

    pub fn remove_location(&mut self, location: LocationId) -> Option<Location> {
        self.graph.remove_location(location);
        self.registry.remove_location(location)
    }

    /// Remove every agent and its edges
    pub fn clear_agents(&mut self) -> usize {
        let ids = self.registry.agent_ids();
        for id in &ids {
            self.remove_agent(*id);
        }
        ids.len()
    }

    /// Remove every location and its edges
    pub fn clear_locations(&mut self) -> usize {
        let ids = self.registry.location_ids();
        for id in &ids {
            self.remove_location(*id);
        }
        ids.len()
    }

    // === LOOKUP ===

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.registry.agent(id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.registry.agent_mut(id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.registry.location(id)
    }

    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.registry.location_mut(id)
    }

    /// Set an attribute on an agent; the reserved `id` name is refused
    pub fn set_agent_attribute(&mut self, id: AgentId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.registry
            .agent_mut(id)
            .ok_or_else(|| PopError::UnknownNode(NodeId::Agent(id)))?
            .set(name, value)
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.registry.agent_ids()
    }

    pub fn location_ids(&self) -> Vec<LocationId> {
        self.registry.location_ids()
    }

    /// All agents in id order
    pub fn agents(&self) -> Vec<&Agent> {
        self.agent_ids()
            .into_iter()
            .filter_map(|id| self.registry.agent(id))
            .collect()
    }

    /// All locations in id order
    pub fn locations(&self) -> Vec<&Location> {
        self.location_ids()
            .into_iter()
            .filter_map(|id| self.registry.location(id))
            .collect()
    }

    pub fn locations_of_type(&self, type_name: &str) -> Vec<&Location> {
        self.locations()
            .into_iter()
            .filter(|l| l.type_name == type_name)
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        self.registry.agent_count()
    }

    pub fn location_count(&self) -> usize {
        self.registry.location_count()
    }

    // === MEMBERSHIP QUERIES ===

    pub fn locations_of(&self, agent: AgentId) -> Vec<LocationId> {
        self.graph.locations_of(agent)
    }

    pub fn agents_of(&self, location: LocationId) -> Vec<AgentId> {
        self.graph.agents_of(location)
    }

    /// Co-located agents, optionally only through locations of the given classes
    pub fn neighbors_of_agent(&self, agent: AgentId, location_types: Option<&[&str]>) -> Vec<AgentId> {
        self.graph.neighbors_of_agent(agent, location_types)
    }

    pub fn objects_between(&self, a: NodeId, b: NodeId, allowed_types: Option<&[&str]>) -> Result<Vec<NodeId>> {
        self.graph.objects_between(a, b, allowed_types)
    }

    /// Locations through which two agents are co-members
    pub fn locations_between_agents(
        &self,
        a: AgentId,
        b: AgentId,
        location_types: Option<&[&str]>,
    ) -> Result<Vec<LocationId>> {
        Ok(self
            .graph
            .objects_between(a.into(), b.into(), location_types)?
            .into_iter()
            .filter_map(|n| n.as_location())
            .collect())
    }

    /// Agents that belong to both locations
    pub fn agents_between_locations(
        &self,
        a: LocationId,
        b: LocationId,
        agent_kinds: Option<&[&str]>,
    ) -> Result<Vec<AgentId>> {
        Ok(self
            .graph
            .objects_between(a.into(), b.into(), agent_kinds)?
            .into_iter()
            .filter_map(|n| n.as_agent())
            .collect())
    }

    pub fn get_weight(&self, agent: AgentId, location: LocationId) -> Result<f64> {
        self.graph.get_weight(agent, location)
    }

    pub fn set_weight(&mut self, agent: AgentId, location: LocationId, weight: f64) -> Result<()> {
        self.graph.set_weight(agent, location, weight)
    }

    /// Contact intensity between two agents
    ///
    /// Sum over shared locations of the smaller of the two membership weights.
    pub fn contact_weight(&self, a: AgentId, b: AgentId) -> Result<f64> {
        let shared = self.locations_between_agents(a, b, None)?;
        let mut total = 0.0;
        for location in shared {
            let wa = self.graph.get_weight(a, location)?;
            let wb = self.graph.get_weight(b, location)?;
            total += wa.min(wb);
        }
        Ok(total)
    }
}
