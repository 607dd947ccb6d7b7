//! The capability contract of a location class
//!
//! A location class is a type implementing `LocationPolicy`. Every hook has a
//! default, so a class only overrides what it needs:
//!
//! ```ignore
//! struct Classroom;
//!
//! impl LocationPolicy for Classroom {
//!     fn type_name(&self) -> &str { "Classroom" }
//!     fn capacity(&self) -> Capacity { Capacity::Size(25) }
//!     fn split(&self, agent: &Agent) -> Vec<Value> { vec![agent.value("grade")] }
//!     fn nest(&self) -> Option<&str> { Some("School") }
//! }
//! ```

use std::sync::Arc;

use crate::agent::Agent;
use crate::core::error::Result;
use crate::core::types::Value;
use crate::location::context::LocationContext;
use crate::location::Capacity;

/// Shared handle to a location class
pub type PolicyRef = Arc<dyn LocationPolicy>;

pub trait LocationPolicy {
    /// Class name; becomes the type tag of every instance
    fn type_name(&self) -> &str;

    fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    /// Allow a group to grow past its size once the target count is reached
    fn overcrowding(&self) -> bool {
        false
    }

    /// Combine unequal melted group lists cyclically
    fn multi_melt(&self) -> bool {
        false
    }

    /// Is the agent eligible for this class at all
    fn filter(&self, _agent: &Agent) -> bool {
        true
    }

    /// Grouping keys. Every key yields an independent set of instances.
    fn split(&self, _agent: &Agent) -> Vec<Value> {
        vec![Value::Null]
    }

    /// Agents sharing a non-null value are packed into the same group
    fn stick_together(&self, _agent: &Agent) -> Option<Value> {
        None
    }

    /// Keys partitioning a finished group into separate instances
    fn subsplit(&self, _agent: &Agent) -> Vec<Value> {
        vec![Value::Null]
    }

    /// Class name of the parent every instance lives inside
    fn nest(&self) -> Option<&str> {
        None
    }

    /// Classes whose independently formed groups are merged into this one
    fn melt(&self) -> Vec<PolicyRef> {
        Vec::new()
    }

    /// May `agent` join the candidate `group`
    fn find(&self, _agent: &Agent, _group: &[&Agent]) -> bool {
        true
    }

    /// Membership weight for `agent`; `None` uses the configured default
    fn weight(&self, _agent: &Agent) -> Option<f64> {
        None
    }

    /// Called once per instance right after its members are written
    fn refine(&self, _ctx: &mut LocationContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once per instance after every class of the run is built
    fn do_this_after_creation(&self, _ctx: &mut LocationContext<'_>) -> Result<()> {
        Ok(())
    }
}
