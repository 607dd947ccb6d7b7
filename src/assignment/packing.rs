//! Capacity-bounded packing of one split bucket into groups

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::agent::Agent;
use crate::core::types::{AgentId, Value};
use crate::location::LocationPolicy;
use crate::model::Model;

/// Agents destined for one location instance (before subsplitting)
pub type Group = Vec<AgentId>;

/// Agents that must land in the same group
///
/// Agents with the same non-null `stick_together` value form one cluster, in
/// first-seen order. Everyone else is a cluster of one.
pub fn sticky_clusters(model: &Model, policy: &dyn LocationPolicy, agents: &[AgentId]) -> Vec<Vec<AgentId>> {
    let mut clusters: Vec<Vec<AgentId>> = Vec::new();
    let mut by_value: AHashMap<Value, usize> = AHashMap::new();

    for &id in agents {
        let Some(agent) = model.agent(id) else {
            continue;
        };
        match policy.stick_together(agent) {
            Some(value) => match by_value.get(&value) {
                Some(&slot) => clusters[slot].push(id),
                None => {
                    by_value.insert(value, clusters.len());
                    clusters.push(vec![id]);
                }
            },
            None => clusters.push(vec![id]),
        }
    }

    clusters
}

fn has_room(size: Option<usize>, group: &[AgentId], cluster: &[AgentId]) -> bool {
    size.map_or(true, |limit| limit.saturating_sub(group.len()) >= cluster.len())
}

fn accepts(model: &Model, policy: &dyn LocationPolicy, group: &[AgentId], cluster: &[AgentId]) -> bool {
    let members: Vec<&Agent> = group.iter().filter_map(|id| model.agent(*id)).collect();
    cluster
        .iter()
        .filter_map(|id| model.agent(*id))
        .all(|agent| policy.find(agent, &members))
}

/// Pack `agents` into groups respecting the class capacity
///
/// Clusters are placed into the first group that has room for the whole
/// cluster and whose members the policy's `find` accepts. When none fits, a
/// new group is opened, unless the class overcrowds and the target number of
/// groups is reached, in which case the smallest group absorbs the cluster.
/// A cluster larger than the size limit always gets a group of its own.
pub fn pack(model: &Model, policy: &dyn LocationPolicy, agents: &[AgentId], rng: &mut ChaCha8Rng) -> Vec<Group> {
    let (size, target) = policy.capacity().packing_limits(agents.len());

    let mut clusters = sticky_clusters(model, policy, agents);
    clusters.shuffle(rng);

    let mut groups: Vec<Group> = vec![Vec::new()];
    for cluster in clusters {
        let slot = groups
            .iter()
            .position(|group| has_room(size, group, &cluster) && accepts(model, policy, group, &cluster));

        match slot {
            Some(i) => groups[i].extend(cluster),
            None if policy.overcrowding() && groups.len() >= target => {
                let smallest = groups
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, group)| group.len())
                    .map_or(0, |(i, _)| i);
                groups[smallest].extend(cluster);
                groups.shuffle(rng);
            }
            None => groups.push(cluster),
        }
    }

    groups.retain(|group| !group.is_empty());
    groups.shuffle(rng);

    debug!(
        "{}: packed {} agents into {} groups",
        policy.type_name(),
        agents.len(),
        groups.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Record;
    use crate::location::Capacity;
    use rand::SeedableRng;

    struct Sized {
        size: usize,
        overcrowding: bool,
    }

    impl LocationPolicy for Sized {
        fn type_name(&self) -> &str {
            "Sized"
        }
        fn capacity(&self) -> Capacity {
            Capacity::Size(self.size)
        }
        fn overcrowding(&self) -> bool {
            self.overcrowding
        }
        fn stick_together(&self, agent: &Agent) -> Option<Value> {
            let value = agent.value("family");
            (!value.is_null()).then_some(value)
        }
    }

    /// Nobody may join a group that already holds someone of the same sex
    struct Mixed;

    impl LocationPolicy for Mixed {
        fn type_name(&self) -> &str {
            "Mixed"
        }
        fn find(&self, agent: &Agent, group: &[&Agent]) -> bool {
            group.iter().all(|other| other.value("sex") != agent.value("sex"))
        }
    }

    fn spawn(model: &mut Model, column: &str, value: Value) -> AgentId {
        let mut record = Record::new();
        record.insert(column.into(), value);
        model.spawn_agent("Agent", &record).unwrap()
    }

    fn sorted_sizes(groups: &[Group]) -> Vec<usize> {
        let mut sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        sizes
    }

    #[test]
    fn test_size_limit_respected() {
        let mut model = Model::new();
        let ids: Vec<AgentId> = (0..7).map(|_| spawn(&mut model, "x", Value::Null)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let groups = pack(&model, &Sized { size: 3, overcrowding: false }, &ids, &mut rng);
        assert_eq!(sorted_sizes(&groups), vec![1, 3, 3]);
    }

    struct TwoRooms {
        overcrowding: bool,
    }

    impl LocationPolicy for TwoRooms {
        fn type_name(&self) -> &str {
            "TwoRooms"
        }
        fn capacity(&self) -> Capacity {
            Capacity::Locations(2)
        }
        fn overcrowding(&self) -> bool {
            self.overcrowding
        }
        fn stick_together(&self, agent: &Agent) -> Option<Value> {
            Some(agent.value("family"))
        }
    }

    #[test]
    fn test_overcrowding_fills_smallest_group() {
        let mut model = Model::new();
        let ids: Vec<AgentId> = [1, 1, 2, 2, 3, 3]
            .iter()
            .map(|f| spawn(&mut model, "family", Value::from(*f)))
            .collect();

        // three pairs, two rooms of three: the last pair cannot fit anywhere
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let crowded = pack(&model, &TwoRooms { overcrowding: true }, &ids, &mut rng);
        assert_eq!(sorted_sizes(&crowded), vec![2, 4]);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let spread = pack(&model, &TwoRooms { overcrowding: false }, &ids, &mut rng);
        assert_eq!(sorted_sizes(&spread), vec![2, 2, 2]);
    }

    #[test]
    fn test_sticky_clusters_stay_together() {
        let mut model = Model::new();
        let families = [1, 1, 1, 1, 2, 2, 3];
        let ids: Vec<AgentId> = families
            .iter()
            .map(|f| spawn(&mut model, "family", Value::from(*f)))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let groups = pack(&model, &Sized { size: 1, overcrowding: false }, &ids, &mut rng);
        assert_eq!(sorted_sizes(&groups), vec![1, 2, 4]);
        for group in &groups {
            let values: Vec<Value> = group.iter().map(|id| model.agent(*id).unwrap().value("family")).collect();
            assert!(values.windows(2).all(|w| w[0] == w[1]));
        }
    }

    #[test]
    fn test_find_hook_controls_joining() {
        let mut model = Model::new();
        let ids: Vec<AgentId> = ["f", "m", "f", "m"]
            .iter()
            .map(|s| spawn(&mut model, "sex", Value::from(*s)))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let groups = pack(&model, &Mixed, &ids, &mut rng);
        assert_eq!(sorted_sizes(&groups), vec![2, 2]);
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let model = Model::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(pack(&model, &Mixed, &[], &mut rng).is_empty());
    }

    #[test]
    fn test_null_stick_values_are_singletons() {
        let mut model = Model::new();
        let ids: Vec<AgentId> = (0..3).map(|_| spawn(&mut model, "family", Value::Null)).collect();
        let clusters = sticky_clusters(&model, &Sized { size: 2, overcrowding: false }, &ids);
        assert_eq!(clusters.len(), 3);
    }
}
