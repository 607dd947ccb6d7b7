//! Registry - owns identity assignment and storage for agents and locations

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::agent::Agent;
use crate::core::config::{IdStrategy, MakerConfig};
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, Record};
use crate::location::{Location, LocationPolicy};

/// Stream offset so id draws never mirror the engine's own random sequence
const ID_STREAM_SALT: u64 = 0x1D5_A110C;

/// Hands out identifiers shared by agents and locations
///
/// Ids are never reused, not even after the node is removed, so an id stays
/// unique for the lifetime of the model.
pub struct IdAllocator {
    strategy: IdStrategy,
    max_attempts: usize,
    next: u64,
    used: AHashSet<u64>,
    rng: ChaCha8Rng,
}

impl IdAllocator {
    pub fn new(strategy: IdStrategy, max_attempts: usize, seed: u64) -> Self {
        Self {
            strategy,
            max_attempts,
            next: 0,
            used: AHashSet::new(),
            rng: ChaCha8Rng::seed_from_u64(seed ^ ID_STREAM_SALT),
        }
    }

    pub fn from_config(config: &MakerConfig) -> Self {
        Self::new(config.id_strategy, config.max_id_attempts, config.seed)
    }

    /// Allocate a fresh identifier
    ///
    /// Random allocation redraws on collision at most `max_attempts` times.
    pub fn allocate(&mut self, what: &str) -> Result<u64> {
        match self.strategy {
            IdStrategy::Sequential => {
                while self.used.contains(&self.next) {
                    self.next += 1;
                }
                let id = self.next;
                self.used.insert(id);
                self.next += 1;
                Ok(id)
            }
            IdStrategy::Random { space } => {
                for _ in 0..self.max_attempts {
                    let candidate = self.rng.gen_range(0..space);
                    if self.used.insert(candidate) {
                        return Ok(candidate);
                    }
                }
                Err(PopError::Generation {
                    what: format!("unique {} id in 0..{}", what, space),
                    attempts: self.max_attempts,
                })
            }
        }
    }

    pub fn allocated(&self) -> usize {
        self.used.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::from_config(&MakerConfig::default())
    }
}

/// Storage for every agent and location of a model
#[derive(Default)]
pub struct Registry {
    agents: AHashMap<AgentId, Agent>,
    locations: AHashMap<LocationId, Location>,
    ids: IdAllocator,
}

impl Registry {
    pub fn new(config: &MakerConfig) -> Self {
        Self {
            agents: AHashMap::new(),
            locations: AHashMap::new(),
            ids: IdAllocator::from_config(config),
        }
    }

    /// Create an agent from a record and return its id
    pub fn create_agent(&mut self, kind: &str, record: &Record) -> Result<AgentId> {
        let mut agent = Agent::new(AgentId(u64::MAX), kind);
        agent.assign_record(record)?;
        let id = AgentId(self.ids.allocate("agent")?);
        agent.id = id;
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Create a location of the given class in the `Forming` state
    pub fn create_location(&mut self, policy: &dyn LocationPolicy) -> Result<LocationId> {
        let id = LocationId(self.ids.allocate("location")?);
        self.locations.insert(id, Location::forming(id, policy));
        Ok(id)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn remove_location(&mut self, id: LocationId) -> Option<Location> {
        self.locations.remove(&id)
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn location_ids(&self) -> Vec<LocationId> {
        let mut ids: Vec<LocationId> = self.locations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }
}
