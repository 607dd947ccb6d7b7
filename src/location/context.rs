//! Mutable view handed to `refine` and `do_this_after_creation`

use crate::agent::Agent;
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, NodeId, Record, Value};
use crate::location::Location;
use crate::model::Model;

/// One location instance plus the model it lives in
pub struct LocationContext<'a> {
    model: &'a mut Model,
    location: LocationId,
    group: &'a [AgentId],
    default_weight: f64,
}

impl<'a> LocationContext<'a> {
    pub fn new(model: &'a mut Model, location: LocationId, group: &'a [AgentId], default_weight: f64) -> Self {
        Self {
            model,
            location,
            group,
            default_weight,
        }
    }

    pub fn location_id(&self) -> LocationId {
        self.location
    }

    pub fn location(&self) -> Result<&Location> {
        self.model
            .location(self.location)
            .ok_or_else(|| PopError::UnknownNode(NodeId::Location(self.location)))
    }

    /// Current members of this instance
    pub fn members(&self) -> Vec<AgentId> {
        self.model.agents_of(self.location)
    }

    /// Every agent of the packing group this instance was cut from
    ///
    /// Differs from `members` when the class subsplits its groups. Empty in
    /// `do_this_after_creation`, where the working set has been discarded.
    pub fn group(&self) -> &[AgentId] {
        self.group
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.model.agent(id)
    }

    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Create a new agent and make it a member of this instance
    pub fn spawn_member(&mut self, kind: &str, record: &Record) -> Result<AgentId> {
        let id = self.model.spawn_agent(kind, record)?;
        self.model.add_agent_to_location(id, self.location, self.default_weight)?;
        Ok(id)
    }

    pub fn add_member(&mut self, agent: AgentId, weight: Option<f64>) -> Result<()> {
        self.model
            .add_agent_to_location(agent, self.location, weight.unwrap_or(self.default_weight))
    }

    pub fn remove_member(&mut self, agent: AgentId) -> Result<()> {
        self.model.remove_agent_from_location(agent, self.location)
    }

    pub fn weight(&self, agent: AgentId) -> Result<f64> {
        self.model.get_weight(agent, self.location)
    }

    pub fn set_weight(&mut self, agent: AgentId, weight: f64) -> Result<()> {
        self.model.set_weight(agent, self.location, weight)
    }

    pub fn set_attribute(&mut self, agent: AgentId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.model.set_agent_attribute(agent, name, value)
    }
}
