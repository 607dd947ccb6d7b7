//! PopMaker - the population building front end
//!
//! Owns the configuration and the seeded random generator of a build. All
//! randomness of sampling and assignment is drawn from that one generator, so
//! a maker created with the same config and fed the same inputs reproduces
//! the same population.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::agent::AgentOptions;
use crate::assignment::AssignmentEngine;
use crate::core::config::MakerConfig;
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, Record};
use crate::location::PolicyRef;
use crate::model::Model;
use crate::sampling::{draw_sample, SampleSpec};
use crate::table::AgentTable;

pub struct PopMaker {
    config: MakerConfig,
    rng: ChaCha8Rng,
    agents: Vec<AgentId>,
    locations: Vec<LocationId>,
}

impl PopMaker {
    pub fn new(config: MakerConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            agents: Vec::new(),
            locations: Vec::new(),
        })
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: MakerConfig::with_seed(seed),
            rng: ChaCha8Rng::seed_from_u64(seed),
            agents: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Empty model allocating identifiers the way this maker's config says
    pub fn new_model(&self) -> Model {
        Model::with_config(&self.config)
    }

    /// Agents created by this maker that are still alive, in creation order
    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    /// Locations created by this maker, in creation order
    pub fn locations(&self) -> &[LocationId] {
        &self.locations
    }

    pub fn draw_sample(&mut self, records: &[Record], spec: &SampleSpec) -> Result<Vec<Record>> {
        draw_sample(records, spec, &mut self.rng)
    }

    /// One agent per record
    pub fn create_agents(&mut self, model: &mut Model, records: &[Record], options: &AgentOptions) -> Result<Vec<AgentId>> {
        if options.clear_agents {
            let removed = model.clear_agents();
            self.agents.clear();
            info!("cleared {} agents", removed);
        }

        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let kind = options.kind_for(record)?;
            created.push(model.spawn_agent(&kind, record)?);
        }

        info!("created {} agents", created.len());
        self.agents.extend_from_slice(&created);
        Ok(created)
    }

    /// `n` agents with no attributes
    pub fn create_n_agents(&mut self, model: &mut Model, n: usize, kind: &str) -> Result<Vec<AgentId>> {
        let records = vec![Record::new(); n];
        self.create_agents(model, &records, &AgentOptions::with_kind(kind))
    }

    /// Build location instances for `classes`
    ///
    /// The pool is `agents` when given, otherwise every live agent this maker
    /// created. Returns the locations of this run only.
    pub fn create_locations(
        &mut self,
        model: &mut Model,
        classes: &[PolicyRef],
        agents: Option<&[AgentId]>,
        clear_locations: bool,
    ) -> Result<Vec<LocationId>> {
        if clear_locations {
            let removed = model.clear_locations();
            self.locations.clear();
            info!("cleared {} locations", removed);
        }

        let pool: Vec<AgentId> = match agents {
            Some(ids) => ids.to_vec(),
            None => {
                self.agents.retain(|id| model.agent(*id).is_some());
                self.agents.clone()
            }
        };

        let created = AssignmentEngine::new(model, &mut self.rng, &self.config).run(classes, &pool)?;
        self.locations.extend_from_slice(&created);
        Ok(created)
    }

    /// Sample records, create agents from them and build every class
    pub fn make(
        &mut self,
        model: &mut Model,
        records: &[Record],
        sample: Option<&SampleSpec>,
        options: &AgentOptions,
        classes: &[PolicyRef],
    ) -> Result<(Vec<AgentId>, Vec<LocationId>)> {
        let sampled;
        let input = match sample {
            Some(spec) => {
                sampled = self.draw_sample(records, spec)?;
                sampled.as_slice()
            }
            None => records,
        };

        let agents = self.create_agents(model, input, options)?;
        let locations = self.create_locations(model, classes, Some(&agents), false)?;
        Ok((agents, locations))
    }

    /// Attribute table of every agent in the model
    pub fn agents_table(&self, model: &Model, columns: Option<&[&str]>) -> Result<AgentTable> {
        if model.agent_count() == 0 {
            return Err(PopError::config("there are no agents to tabulate"));
        }
        AgentTable::from_agents(&model.agents(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use crate::location::{Capacity, LocationPolicy};
    use std::sync::Arc;

    struct Pair;

    impl LocationPolicy for Pair {
        fn type_name(&self) -> &str {
            "Pair"
        }
        fn capacity(&self) -> Capacity {
            Capacity::Size(2)
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MakerConfig {
            max_id_attempts: 0,
            ..MakerConfig::default()
        };
        assert!(PopMaker::new(config).is_err());
    }

    #[test]
    fn test_clear_agents_resets_pool() {
        let mut maker = PopMaker::with_seed(1);
        let mut model = maker.new_model();
        maker.create_n_agents(&mut model, 3, "Agent").unwrap();

        let options = AgentOptions {
            clear_agents: true,
            ..AgentOptions::default()
        };
        maker.create_agents(&mut model, &[Record::new()], &options).unwrap();
        assert_eq!(model.agent_count(), 1);
        assert_eq!(maker.agents().len(), 1);
    }

    #[test]
    fn test_create_locations_uses_maker_agents() {
        let mut maker = PopMaker::with_seed(1);
        let mut model = maker.new_model();
        let agents = maker.create_n_agents(&mut model, 4, "Agent").unwrap();
        model.remove_agent(agents[0]);

        let classes: Vec<PolicyRef> = vec![Arc::new(Pair)];
        let created = maker.create_locations(&mut model, &classes, None, false).unwrap();
        assert_eq!(created.len(), 2);

        let again = maker.create_locations(&mut model, &classes, None, true).unwrap();
        assert_eq!(model.location_count(), again.len());
        assert_eq!(maker.locations(), again.as_slice());
    }

    #[test]
    fn test_make_with_sample() {
        let mut maker = PopMaker::with_seed(5);
        let mut model = maker.new_model();
        let records: Vec<Record> = (0..10)
            .map(|i| {
                let mut record = Record::new();
                record.insert("n".into(), Value::from(i));
                record
            })
            .collect();

        let classes: Vec<PolicyRef> = vec![Arc::new(Pair)];
        let (agents, locations) = maker
            .make(&mut model, &records, Some(&SampleSpec::records(6)), &AgentOptions::default(), &classes)
            .unwrap();
        assert_eq!(agents.len(), 6);
        assert_eq!(locations.len(), 3);
    }

    #[test]
    fn test_agents_table_requires_agents() {
        let maker = PopMaker::with_seed(5);
        let model = maker.new_model();
        assert!(maker.agents_table(&model, None).is_err());
    }
}
