//! Locations: contexts that group agents (households, classrooms, workplaces)
//!
//! A `Location` is plain data. Its behavior during population building comes
//! from the `LocationPolicy` of its class.

pub mod context;
pub mod declarative;
pub mod policy;

pub use context::LocationContext;
pub use declarative::{build_policies, AttributeFilter, DeclarativeLocation, LocationSpec};
pub use policy::{LocationPolicy, PolicyRef};

use serde::{Deserialize, Serialize};

use crate::core::error::{PopError, Result};
use crate::core::types::{LocationId, Value};

/// How many agents / instances a location class aims for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Capacity {
    /// One instance per group, no member limit
    #[default]
    Unbounded,
    /// Target member count per instance
    Size(usize),
    /// Target instance count
    Locations(usize),
}

impl Capacity {
    /// Build from the two optional knobs a class may set; setting both is an error
    pub fn from_options(type_name: &str, size: Option<usize>, n_locations: Option<usize>) -> Result<Self> {
        match (size, n_locations) {
            (Some(_), Some(_)) => Err(PopError::config(format!(
                "location class `{}` sets both `size` and `n_locations`",
                type_name
            ))),
            (Some(s), None) => Ok(Capacity::Size(s)),
            (None, Some(n)) => Ok(Capacity::Locations(n)),
            (None, None) => Ok(Capacity::Unbounded),
        }
    }

    pub fn validate(&self, type_name: &str) -> Result<()> {
        match self {
            Capacity::Size(0) => Err(PopError::config(format!(
                "location class `{}` requests size 0",
                type_name
            ))),
            Capacity::Locations(0) => Err(PopError::config(format!(
                "location class `{}` requests 0 locations",
                type_name
            ))),
            _ => Ok(()),
        }
    }

    /// Member limit per group and target group count for a pool of `n_agents`
    ///
    /// A target instance count implies a per-instance size of
    /// `ceil(n_agents / n_locations)`.
    pub fn packing_limits(&self, n_agents: usize) -> (Option<usize>, usize) {
        match *self {
            Capacity::Unbounded => (None, 1),
            Capacity::Size(size) => (Some(size), n_agents.div_ceil(size).max(1)),
            Capacity::Locations(n) => (Some(n_agents.div_ceil(n).max(1)), n),
        }
    }
}

/// Lifecycle of a location instance. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocationState {
    /// Built from a policy so the engine can check its settings before a
    /// run; never registered
    Probed,
    /// Members being assembled by the engine
    Forming,
    /// Registered in the graph, membership fixed, `refine` called
    Materialized,
    /// `do_this_after_creation` called
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    /// Location class name
    pub type_name: String,
    pub capacity: Capacity,
    pub overcrowding: bool,
    /// Split key that produced this instance
    pub group_value: Value,
    pub subgroup_value: Value,
    pub group_id: usize,
    pub subgroup_id: usize,
    state: LocationState,
}

impl Location {
    /// Read-only stand-in for a class, used to inspect its settings
    pub fn probe(policy: &dyn LocationPolicy) -> Self {
        Self {
            id: LocationId(u64::MAX),
            type_name: policy.type_name().to_string(),
            capacity: policy.capacity(),
            overcrowding: policy.overcrowding(),
            group_value: Value::Null,
            subgroup_value: Value::Null,
            group_id: 0,
            subgroup_id: 0,
            state: LocationState::Probed,
        }
    }

    pub fn forming(id: LocationId, policy: &dyn LocationPolicy) -> Self {
        Self {
            id,
            state: LocationState::Forming,
            ..Self::probe(policy)
        }
    }

    pub fn state(&self) -> LocationState {
        self.state
    }

    /// Move to `next`; moving backwards or sideways out of `Probed` is refused
    pub fn advance(&mut self, next: LocationState) -> Result<()> {
        if self.state == LocationState::Probed || next < self.state {
            return Err(PopError::config(format!(
                "{} cannot move from {:?} to {:?}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// `"<group value>-<group id>"`, the identity nested classes key on
    pub fn group_identity(&self) -> String {
        format!("{}-{}", self.group_value, self.group_id)
    }

    /// Descriptor stored on member agents under the class name
    pub fn descriptor(&self) -> String {
        format!("gv={}, gid={}", self.group_value, self.group_id)
    }
}
