use crate::core::types::{AgentId, Value};
use crate::location::LocationPolicy;
use crate::model::Model;

/// Members of one location instance cut from a packed group
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    pub value: Value,
    pub members: Vec<AgentId>,
}

/// Partition a group by the class's `subsplit` keys
///
/// One subgroup per distinct key, in first-seen order. An agent returning
/// several keys belongs to several subgroups.
pub fn subgroups(model: &Model, policy: &dyn LocationPolicy, group: &[AgentId]) -> Vec<Subgroup> {
    let mut out: Vec<Subgroup> = Vec::new();

    for &id in group {
        let Some(agent) = model.agent(id) else {
            continue;
        };
        for value in policy.subsplit(agent) {
            match out.iter_mut().find(|sub| sub.value == value) {
                Some(sub) => {
                    if !sub.members.contains(&id) {
                        sub.members.push(id);
                    }
                }
                None => out.push(Subgroup {
                    value,
                    members: vec![id],
                }),
            }
        }
    }

    out
}
