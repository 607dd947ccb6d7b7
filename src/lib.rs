//! popnet - synthetic agent populations with a bipartite membership graph
//!
//! Agents are created from survey-style records, then assigned to location
//! instances (households, classrooms, workplaces) by location classes that
//! implement `LocationPolicy`. The resulting agent-location graph answers
//! membership, neighbor and between-object queries.

pub mod agent;
pub mod assignment;
pub mod core;
pub mod graph;
pub mod location;
pub mod maker;
pub mod model;
pub mod registry;
pub mod sampling;
pub mod scenario;
pub mod table;

pub use agent::{Agent, AgentOptions};
pub use crate::core::{AgentId, LocationId, MakerConfig, NodeId, PopError, Record, Result, Value};
pub use location::{Capacity, Location, LocationContext, LocationPolicy, LocationSpec, PolicyRef};
pub use maker::PopMaker;
pub use model::Model;
pub use sampling::SampleSpec;
