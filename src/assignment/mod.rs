//! Assignment engine - turns location classes into location instances
//!
//! For each class, in the order given:
//! affiliation -> split (nest-aware) -> packing or melting -> subsplit -> materialize
//!
//! Materializing an instance registers it, writes its memberships, stores a
//! descriptor on every member and runs `refine`. Once every class of the run
//! is built, `do_this_after_creation` runs for each new instance in creation
//! order.

pub mod melt;
pub mod packing;
pub mod split;
pub mod subsplit;

pub use packing::Group;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::core::config::MakerConfig;
use crate::core::error::{PopError, Result};
use crate::core::types::{AgentId, LocationId, NodeId, Value, RESERVED_ATTRIBUTE};
use crate::location::{Location, LocationContext, LocationPolicy, LocationState, PolicyRef};
use crate::model::Model;

use melt::melted_groups;
use packing::pack;
use split::{affiliated, SplitIndex};
use subsplit::subgroups;

/// Reject classes the engine cannot build before anything is created
pub fn validate_classes(classes: &[PolicyRef]) -> Result<()> {
    fn check(policy: &dyn LocationPolicy) -> Result<()> {
        let settings = Location::probe(policy);
        let name = settings.type_name.as_str();
        if name.is_empty() || name == RESERVED_ATTRIBUTE {
            return Err(PopError::config(format!("`{}` is not a usable location class name", name)));
        }
        settings.capacity.validate(name)
    }

    for class in classes {
        check(class.as_ref())?;
        for component in class.melt() {
            check(component.as_ref())?;
            if !component.melt().is_empty() {
                return Err(PopError::config(format!(
                    "location class `{}` melts `{}`, which melts classes itself",
                    class.type_name(),
                    component.type_name()
                )));
            }
        }
    }
    Ok(())
}

/// One assignment run over a model
pub struct AssignmentEngine<'a> {
    model: &'a mut Model,
    rng: &'a mut ChaCha8Rng,
    config: &'a MakerConfig,
    created: Vec<(LocationId, PolicyRef)>,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(model: &'a mut Model, rng: &'a mut ChaCha8Rng, config: &'a MakerConfig) -> Self {
        Self {
            model,
            rng,
            config,
            created: Vec::new(),
        }
    }

    /// Build every class over `agents` and return the new locations in
    /// creation order
    pub fn run(mut self, classes: &[PolicyRef], agents: &[AgentId]) -> Result<Vec<LocationId>> {
        validate_classes(classes)?;
        if let Some(missing) = agents.iter().find(|id| self.model.agent(**id).is_none()) {
            return Err(PopError::UnknownNode(NodeId::Agent(*missing)));
        }

        info!(
            "building {} location classes over {} agents",
            classes.len(),
            agents.len()
        );

        let mut pool = agents.to_vec();
        for class in classes {
            for &agent in &pool {
                self.model.set_agent_attribute(agent, class.type_name(), Value::Null)?;
            }
        }

        for class in classes {
            if self.config.shuffle_agents {
                pool.shuffle(self.rng);
            }
            self.build_class(class, &pool)?;
        }

        self.finalize()
    }

    fn build_class(&mut self, class: &PolicyRef, pool: &[AgentId]) -> Result<()> {
        let components = class.melt();
        let members = if components.is_empty() {
            affiliated(self.model, class.as_ref(), pool)
        } else {
            let mut union: Vec<AgentId> = Vec::new();
            for component in &components {
                for agent in affiliated(self.model, component.as_ref(), pool) {
                    if !union.contains(&agent) {
                        union.push(agent);
                    }
                }
            }
            union
        };

        let index = SplitIndex::build(self.model, class.as_ref(), &members, class.nest());
        debug!(
            "{}: {} affiliated agents, {} split values",
            class.type_name(),
            members.len(),
            index.values().len()
        );

        for value in index.values() {
            let mut bucket = index.agents_for(value);
            bucket.shuffle(self.rng);

            let groups = if components.is_empty() {
                pack(self.model, class.as_ref(), &bucket, self.rng)
            } else {
                melted_groups(self.model, class.as_ref(), &bucket, self.rng)
            };
            self.materialize(class, value, &groups)?;
        }

        Ok(())
    }

    fn materialize(&mut self, class: &PolicyRef, group_value: &Value, groups: &[Group]) -> Result<()> {
        for (group_id, group) in groups.iter().enumerate() {
            for (subgroup_id, sub) in subgroups(self.model, class.as_ref(), group).into_iter().enumerate() {
                let id = self.model.spawn_location(class.as_ref())?;

                let descriptor = {
                    let location = self
                        .model
                        .location_mut(id)
                        .ok_or_else(|| PopError::UnknownNode(NodeId::Location(id)))?;
                    location.group_value = group_value.clone();
                    location.group_id = group_id;
                    location.subgroup_value = sub.value.clone();
                    location.subgroup_id = subgroup_id;
                    location.descriptor()
                };

                for &agent in &sub.members {
                    let weight = self
                        .model
                        .agent(agent)
                        .and_then(|a| class.weight(a))
                        .unwrap_or(self.config.default_weight);
                    self.model.add_agent_to_location(agent, id, weight)?;
                    self.model
                        .set_agent_attribute(agent, class.type_name(), descriptor.clone())?;
                }

                let mut ctx = LocationContext::new(self.model, id, group, self.config.default_weight);
                class.refine(&mut ctx)?;
                self.advance(id, LocationState::Materialized)?;

                self.created.push((id, PolicyRef::clone(class)));
            }
        }
        Ok(())
    }

    fn finalize(mut self) -> Result<Vec<LocationId>> {
        let created = std::mem::take(&mut self.created);
        for (id, class) in &created {
            let mut ctx = LocationContext::new(self.model, *id, &[], self.config.default_weight);
            class.do_this_after_creation(&mut ctx)?;
            self.advance(*id, LocationState::Finalized)?;
        }

        info!("created {} locations", created.len());
        Ok(created.into_iter().map(|(id, _)| id).collect())
    }

    fn advance(&mut self, id: LocationId, next: LocationState) -> Result<()> {
        self.model
            .location_mut(id)
            .ok_or_else(|| PopError::UnknownNode(NodeId::Location(id)))?
            .advance(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::core::types::Record;
    use crate::location::Capacity;
    use rand::SeedableRng;
    use std::sync::Arc;

    struct Home;

    impl LocationPolicy for Home {
        fn type_name(&self) -> &str {
            "Home"
        }
        fn capacity(&self) -> Capacity {
            Capacity::Size(2)
        }
        fn weight(&self, agent: &Agent) -> Option<f64> {
            agent.value("hours").as_f64()
        }
    }

    struct Broken;

    impl LocationPolicy for Broken {
        fn type_name(&self) -> &str {
            "Broken"
        }
        fn capacity(&self) -> Capacity {
            Capacity::Size(0)
        }
    }

    struct Reserved;

    impl LocationPolicy for Reserved {
        fn type_name(&self) -> &str {
            "id"
        }
    }

    fn setup(n: usize) -> (Model, Vec<AgentId>) {
        let mut model = Model::new();
        let ids = (0..n)
            .map(|i| {
                let mut record = Record::new();
                record.insert("hours".into(), Value::from(i as f64));
                model.spawn_agent("Agent", &record).unwrap()
            })
            .collect();
        (model, ids)
    }

    #[test]
    fn test_run_materializes_and_finalizes() {
        let (mut model, agents) = setup(4);
        let config = MakerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let classes: Vec<PolicyRef> = vec![Arc::new(Home)];

        let created = AssignmentEngine::new(&mut model, &mut rng, &config)
            .run(&classes, &agents)
            .unwrap();

        assert_eq!(created.len(), 2);
        for id in &created {
            let location = model.location(*id).unwrap();
            assert_eq!(location.state(), LocationState::Finalized);
            assert_eq!(model.agents_of(*id).len(), 2);
        }
        for agent in &agents {
            let descriptor = model.agent(*agent).unwrap().value("Home");
            assert!(descriptor.as_str().unwrap().starts_with("gv=None, gid="));
        }
    }

    #[test]
    fn test_policy_weight_used() {
        let (mut model, agents) = setup(2);
        let config = MakerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let classes: Vec<PolicyRef> = vec![Arc::new(Home)];

        let created = AssignmentEngine::new(&mut model, &mut rng, &config)
            .run(&classes, &agents)
            .unwrap();
        assert_eq!(model.get_weight(agents[1], created[0]).unwrap(), 1.0);
        assert_eq!(model.get_weight(agents[0], created[0]).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_class_creates_nothing() {
        let (mut model, agents) = setup(3);
        let config = MakerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let classes: Vec<PolicyRef> = vec![Arc::new(Home), Arc::new(Broken)];

        let result = AssignmentEngine::new(&mut model, &mut rng, &config).run(&classes, &agents);
        assert!(matches!(result, Err(PopError::Configuration(_))));
        assert_eq!(model.location_count(), 0);
    }

    #[test]
    fn test_reserved_class_name_rejected() {
        let classes: Vec<PolicyRef> = vec![Arc::new(Home), Arc::new(Reserved)];
        assert!(matches!(validate_classes(&classes), Err(PopError::Configuration(_))));
        assert!(validate_classes(&[Arc::new(Home) as PolicyRef]).is_ok());
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let (mut model, _) = setup(1);
        let config = MakerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let classes: Vec<PolicyRef> = vec![Arc::new(Home)];

        let result = AssignmentEngine::new(&mut model, &mut rng, &config).run(&classes, &[AgentId(77)]);
        assert!(matches!(result, Err(PopError::UnknownNode(_))));
    }

    #[test]
    fn test_advance_unknown_location_is_error() {
        let (mut model, _) = setup(1);
        let config = MakerConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut engine = AssignmentEngine::new(&mut model, &mut rng, &config);

        let err = engine.advance(LocationId(99), LocationState::Materialized).unwrap_err();
        assert!(matches!(err, PopError::UnknownNode(NodeId::Location(LocationId(99)))));
    }

    #[test]
    fn test_same_seed_same_population() {
        let build = || {
            let (mut model, agents) = setup(9);
            let config = MakerConfig::default();
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let classes: Vec<PolicyRef> = vec![Arc::new(Home)];
            AssignmentEngine::new(&mut model, &mut rng, &config)
                .run(&classes, &agents)
                .unwrap();
            model.graph().edges()
        };
        assert_eq!(build(), build());
    }
}
