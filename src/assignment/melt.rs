//! Melting: merge groups formed independently by several component classes

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::assignment::packing::{pack, Group};
use crate::assignment::split::{affiliated, parent_identity, SplitIndex};
use crate::core::types::AgentId;
use crate::location::LocationPolicy;
use crate::model::Model;

/// Merge per-component group lists position by position
///
/// The result is as long as the longest list. With `multi_melt`, shorter lists
/// are reused cyclically; without it, a shorter list stops contributing once
/// exhausted. Empty lists never contribute. Agents appearing in several
/// component groups are kept once.
pub fn merge_positional(lists: &[Vec<Group>], multi_melt: bool) -> Vec<Group> {
    let longest = lists.iter().map(Vec::len).max().unwrap_or(0);

    (0..longest)
        .map(|i| {
            let mut merged: Group = Vec::new();
            for list in lists.iter().filter(|list| !list.is_empty()) {
                let part = if multi_melt {
                    Some(&list[i % list.len()])
                } else {
                    list.get(i)
                };
                for agent in part.into_iter().flatten() {
                    if !merged.contains(agent) {
                        merged.push(*agent);
                    }
                }
            }
            merged
        })
        .collect()
}

/// Agents grouped by the identity of their nest parent, in first-seen order
fn by_parent(model: &Model, nest: Option<&str>, agents: &[AgentId]) -> Vec<(String, Vec<AgentId>)> {
    let Some(nest) = nest else {
        return vec![(String::new(), agents.to_vec())];
    };

    let mut buckets: Vec<(String, Vec<AgentId>)> = Vec::new();
    for &agent in agents {
        let parent = parent_identity(model, agent, nest);
        match buckets.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, members)) => members.push(agent),
            None => buckets.push((parent, vec![agent])),
        }
    }
    buckets
}

/// Groups of a melting class for one split bucket
///
/// Each component forms its own groups (filter, split and pack by the
/// component) under every parent; the lists are then merged. Results of all
/// parents are concatenated.
pub fn melted_groups(
    model: &Model,
    class: &dyn LocationPolicy,
    agents: &[AgentId],
    rng: &mut ChaCha8Rng,
) -> Vec<Group> {
    let components = class.melt();
    let mut out: Vec<Group> = Vec::new();

    for (parent, nested) in by_parent(model, class.nest(), agents) {
        let mut lists: Vec<Vec<Group>> = Vec::with_capacity(components.len());

        for component in &components {
            let members = affiliated(model, component.as_ref(), &nested);
            let index = SplitIndex::build(model, component.as_ref(), &members, None);

            let mut groups: Vec<Group> = Vec::new();
            for value in index.values() {
                let mut bucket = index.agents_for(value);
                bucket.shuffle(rng);
                groups.extend(pack(model, component.as_ref(), &bucket, rng));
            }
            groups.shuffle(rng);
            lists.push(groups);
        }

        if lists.iter().all(Vec::is_empty) {
            warn!(
                "{}: melted classes produced no groups under parent `{}`",
                class.type_name(),
                parent
            );
            continue;
        }

        let lengths: Vec<usize> = lists.iter().map(Vec::len).collect();
        if !class.multi_melt() && lengths.windows(2).any(|w| w[0] != w[1]) {
            warn!(
                "{}: melted classes produced unequal group counts {:?}; shorter lists run out",
                class.type_name(),
                lengths
            );
        }

        out.extend(merge_positional(&lists, class.multi_melt()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::core::types::{Record, Value};
    use crate::location::{Capacity, PolicyRef};
    use rand::SeedableRng;
    use std::sync::Arc;

    fn ids(raw: &[u64]) -> Group {
        raw.iter().map(|i| AgentId(*i)).collect()
    }

    #[test]
    fn test_merge_equal_lengths() {
        let lists = vec![vec![ids(&[1]), ids(&[2])], vec![ids(&[3]), ids(&[4])]];
        assert_eq!(merge_positional(&lists, false), vec![ids(&[1, 3]), ids(&[2, 4])]);
    }

    #[test]
    fn test_merge_shorter_list_runs_out() {
        let lists = vec![vec![ids(&[1]), ids(&[2]), ids(&[5])], vec![ids(&[3])]];
        assert_eq!(
            merge_positional(&lists, false),
            vec![ids(&[1, 3]), ids(&[2]), ids(&[5])]
        );
    }

    #[test]
    fn test_multi_melt_cycles_shorter_list() {
        let lists = vec![vec![ids(&[1]), ids(&[2]), ids(&[5])], vec![ids(&[3])]];
        assert_eq!(
            merge_positional(&lists, true),
            vec![ids(&[1, 3]), ids(&[2, 3]), ids(&[5, 3])]
        );
    }

    #[test]
    fn test_merge_skips_empty_and_dedups() {
        let lists = vec![vec![ids(&[1, 2])], vec![], vec![ids(&[2, 3])]];
        assert_eq!(merge_positional(&lists, true), vec![ids(&[1, 2, 3])]);
        assert!(merge_positional(&[], false).is_empty());
    }

    struct Role {
        name: &'static str,
        size: usize,
    }

    impl LocationPolicy for Role {
        fn type_name(&self) -> &str {
            self.name
        }
        fn capacity(&self) -> Capacity {
            Capacity::Size(self.size)
        }
        fn filter(&self, agent: &Agent) -> bool {
            agent.value("status") == Value::from(self.name)
        }
    }

    struct Classroom {
        parts: Vec<PolicyRef>,
    }

    impl LocationPolicy for Classroom {
        fn type_name(&self) -> &str {
            "Classroom"
        }
        fn melt(&self) -> Vec<PolicyRef> {
            self.parts.clone()
        }
    }

    #[test]
    fn test_melted_groups_combine_components() {
        let mut model = Model::new();
        let mut agents = Vec::new();
        for status in ["pupil", "pupil", "pupil", "pupil", "teacher", "teacher"] {
            let mut record = Record::new();
            record.insert("status".into(), Value::from(status));
            agents.push(model.spawn_agent("Agent", &record).unwrap());
        }

        let classroom = Classroom {
            parts: vec![
                Arc::new(Role { name: "pupil", size: 2 }),
                Arc::new(Role { name: "teacher", size: 1 }),
            ],
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let groups = melted_groups(&model, &classroom, &agents, &mut rng);

        assert_eq!(groups.len(), 2);
        for group in &groups {
            let teachers = group
                .iter()
                .filter(|id| model.agent(**id).unwrap().value("status") == Value::from("teacher"))
                .count();
            assert_eq!(group.len(), 3);
            assert_eq!(teachers, 1);
        }
    }
}
