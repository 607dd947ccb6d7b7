//! Scenario files - a complete population build described in TOML
//!
//! ```toml
//! [config]
//! seed = 7
//!
//! [agents]
//! kind = "Person"
//!
//! [sample]
//! n = 40
//! sample_level = "household"
//!
//! [[records]]
//! household = 1
//! status = "pupil"
//!
//! [[locations]]
//! name = "Home"
//! stick_by = "household"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{AgentOptions, DEFAULT_AGENT_KIND};
use crate::core::config::MakerConfig;
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, Record};
use crate::location::{build_policies, LocationSpec};
use crate::maker::PopMaker;
use crate::model::Model;
use crate::sampling::SampleSpec;

fn default_kind() -> String {
    DEFAULT_AGENT_KIND.to_string()
}

/// How agents are created from the scenario records
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub kind_attribute: Option<String>,
    /// Number of attribute-less agents, used when there are no records
    #[serde(default)]
    pub n: Option<usize>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            kind_attribute: None,
            n: None,
        }
    }
}

impl AgentSection {
    pub fn options(&self) -> AgentOptions {
        AgentOptions {
            kind: self.kind.clone(),
            kind_attribute: self.kind_attribute.clone(),
            clear_agents: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: MakerConfig,
    #[serde(default)]
    pub agents: AgentSection,
    #[serde(default)]
    pub sample: Option<SampleSpec>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
}

/// Result of running a scenario
pub struct Population {
    pub model: Model,
    pub maker: PopMaker,
    pub agents: Vec<AgentId>,
    pub locations: Vec<LocationId>,
}

/// Instance statistics of one location class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub type_name: String,
    pub instances: usize,
    pub members: usize,
    pub smallest: usize,
    pub largest: usize,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.config.validate()?;
        if scenario.records.is_empty() && scenario.agents.n.is_none() {
            return Err(PopError::config("scenario has neither records nor agents.n"));
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build the population with the scenario's own config
    pub fn run(&self) -> Result<Population> {
        self.run_with(self.config.clone())
    }

    pub fn run_with(&self, config: MakerConfig) -> Result<Population> {
        let classes = build_policies(&self.locations)?;
        let mut maker = PopMaker::new(config)?;
        let mut model = maker.new_model();

        let (agents, locations) = if self.records.is_empty() {
            let n = self.agents.n.unwrap_or(0);
            let agents = maker.create_n_agents(&mut model, n, &self.agents.kind)?;
            let locations = maker.create_locations(&mut model, &classes, Some(&agents), false)?;
            (agents, locations)
        } else {
            maker.make(
                &mut model,
                &self.records,
                self.sample.as_ref(),
                &self.agents.options(),
                &classes,
            )?
        };

        info!(
            "scenario built {} agents and {} locations",
            agents.len(),
            locations.len()
        );
        Ok(Population {
            model,
            maker,
            agents,
            locations,
        })
    }
}

/// Per-class instance counts and member count range, by class name
pub fn summarize(model: &Model) -> Vec<ClassSummary> {
    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for location in model.locations() {
        by_class
            .entry(location.type_name.as_str())
            .or_default()
            .push(model.agents_of(location.id).len());
    }

    by_class
        .into_iter()
        .map(|(name, sizes)| ClassSummary {
            type_name: name.to_string(),
            instances: sizes.len(),
            members: sizes.iter().sum(),
            smallest: sizes.iter().copied().min().unwrap_or(0),
            largest: sizes.iter().copied().max().unwrap_or(0),
        })
        .collect()
}
