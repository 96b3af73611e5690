//
//  attributes.rs
//  cbv
//

//! Attribute shadowing resolution.
//!
//! Reflection reports an inherited attribute on every class below the one
//! that set it. Within each group of candidates sharing a (name, value), a
//! candidate is dropped when its class descends from any class in the group,
//! which leaves the root(s) of each subtree. Independent redefinitions on
//! unrelated branches both survive.

use std::collections::HashMap;

use super::lattice::InheritanceGraph;
use crate::snapshot::{AttributeCandidate, KlassAttribute};

pub fn resolve_attributes(
    candidates: &[AttributeCandidate],
    graph: &mut InheritanceGraph,
) -> Vec<KlassAttribute> {
    // Groups in first-seen order.
    let mut groups: Vec<Vec<&AttributeCandidate>> = Vec::new();
    let mut group_index: HashMap<(&str, &str), usize> = HashMap::new();
    for candidate in candidates {
        let key = (candidate.name.as_str(), candidate.value.as_str());
        let slot = *group_index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(candidate);
    }

    let mut resolved = Vec::new();
    for group in groups {
        let descendants = graph.union_descendants(group.iter().map(|c| c.klass_path.as_str()));
        for candidate in group {
            let inherited = graph
                .node(&candidate.klass_path)
                .is_some_and(|node| descendants.contains(&node));
            if inherited {
                continue;
            }
            resolved.push(KlassAttribute {
                klass_path: candidate.klass_path.clone(),
                name: candidate.name.clone(),
                value: candidate.value.clone(),
                line_number: candidate.line_number,
            });
        }
    }
    resolved
}
