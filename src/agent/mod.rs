//! Agents: identity plus an open-ended attribute map
//!
//! An agent never stores which locations it belongs to. Membership lives in the
//! `MembershipGraph` and is queried through the `Model`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, Record, Value, RESERVED_ATTRIBUTE};

/// Kind tag given to agents when none is specified
pub const DEFAULT_AGENT_KIND: &str = "Agent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Agent class tag, used by type-filtered queries
    pub kind: String,
    attributes: BTreeMap<String, Value>,
}

impl Agent {
    pub fn new(id: AgentId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Build an agent from a record. Fails on the reserved `id` column.
    pub fn from_record(id: AgentId, kind: impl Into<String>, record: &Record) -> Result<Self> {
        let mut agent = Self::new(id, kind);
        agent.assign_record(record)?;
        Ok(agent)
    }

    /// Copy every column of `record` into the attribute map
    pub fn assign_record(&mut self, record: &Record) -> Result<()> {
        if record.contains_key(RESERVED_ATTRIBUTE) {
            return Err(PopError::config(format!(
                "records may not set an agent attribute called `{}`",
                RESERVED_ATTRIBUTE
            )));
        }
        for (name, value) in record {
            self.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute value, `Value::Null` when unset
    pub fn value(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if name == RESERVED_ATTRIBUTE {
            return Err(PopError::config(format!(
                "`{}` is reserved and cannot be used as an attribute name",
                RESERVED_ATTRIBUTE
            )));
        }
        self.attributes.insert(name, value.into());
        Ok(())
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

/// How records are turned into agents
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Kind tag for every created agent
    pub kind: String,
    /// Take the kind tag from this record column instead
    pub kind_attribute: Option<String>,
    /// Remove all existing agents before creating new ones
    pub clear_agents: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            kind: DEFAULT_AGENT_KIND.to_string(),
            kind_attribute: None,
            clear_agents: false,
        }
    }
}

impl AgentOptions {
    pub fn with_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Resolve the kind tag for one record
    pub fn kind_for(&self, record: &Record) -> Result<String> {
        match &self.kind_attribute {
            None => Ok(self.kind.clone()),
            Some(column) => match record.get(column) {
                Some(value) if !value.is_null() => Ok(value.to_string()),
                _ => Err(PopError::config(format!(
                    "record has no value in kind column `{}`",
                    column
                ))),
            },
        }
    }
}
