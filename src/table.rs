//! Tabular views of the agent population

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::agent::Agent;
use crate::core::error::{PopError, Result};
use crate::core::types::{Record, Value};

/// Column-oriented snapshot of agent attributes
///
/// One row per agent in id order. Agents lacking a column get `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentTable {
    columns: BTreeMap<String, Vec<Value>>,
    rows: usize,
}

impl AgentTable {
    /// Every attribute of every agent, or only `columns` when given
    pub fn from_agents(agents: &[&Agent], columns: Option<&[&str]>) -> Result<Self> {
        let present: BTreeSet<&str> = agents
            .iter()
            .flat_map(|agent| agent.attributes().keys().map(String::as_str))
            .collect();

        let wanted: Vec<&str> = match columns {
            None => present.iter().copied().collect(),
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|c| !present.contains(**c)) {
                    return Err(PopError::config(format!("no agent has an attribute `{}`", missing)));
                }
                requested.to_vec()
            }
        };

        let columns = wanted
            .into_iter()
            .map(|name| {
                let values = agents.iter().map(|agent| agent.value(name)).collect();
                (name.to_string(), values)
            })
            .collect();

        Ok(Self {
            columns,
            rows: agents.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<Record> {
        (index < self.rows).then(|| {
            self.columns
                .iter()
                .map(|(name, values)| (name.clone(), values[index].clone()))
                .collect()
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.columns)?)
    }
}
