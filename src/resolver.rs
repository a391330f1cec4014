use std::collections::{BTreeMap, BTreeSet};

use super::topology::Topology;
use super::{ErrorKind, Result};

/// Compute a deterministic startup order for a set of enabled services
///
/// Edges run from dependency to dependent. Dependencies outside the enabled
/// set are ignored here; the validator reports dangling references
/// separately. Uses Kahn's algorithm with a lexicographic tiebreak: when
/// several services are ready, the first in name order is emitted. The
/// resulting order is a public contract.
pub fn dependency_order(topology: &Topology, enabled: &BTreeSet<String>) -> Result<Vec<String>> {
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    for name in enabled {
        indegree.insert(name.as_str(), 0);
    }
    for name in enabled {
        if let Some(svc) = topology.services().get(name) {
            for dep in &svc.infrastructure.requires {
                if enabled.contains(dep) {
                    dependents.entry(dep.as_str()).or_insert_with(Vec::new).push(name.as_str());
                    *indegree.get_mut(name.as_str()).unwrap() += 1;
                }
            }
        }
    }

    // the ready pool is a BTreeSet so equal candidates pop in name order
    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(enabled.len());

    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(next);
        order.push(next.to_string());
        if let Some(deps) = dependents.get(next) {
            for dependent in deps {
                let deg = indegree.get_mut(dependent).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != enabled.len() {
        let placed: BTreeSet<&str> = order.iter().map(|s| s.as_str()).collect();
        let leftover: Vec<&str> = enabled
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !placed.contains(s))
            .collect();
        bail!(ErrorKind::CircularDependency(find_cycle(topology, &leftover)));
    }
    Ok(order)
}

/// Enumerate one cycle among the nodes Kahn could not place
///
/// Every leftover node still waits on at least one leftover dependency, so
/// walking dependency links must revisit a node.
fn find_cycle(topology: &Topology, leftover: &[&str]) -> String {
    let mut path: Vec<&str> = Vec::new();
    let mut cur = leftover[0];
    loop {
        if let Some(pos) = path.iter().position(|n| *n == cur) {
            let mut cycle: Vec<&str> = path[pos..].to_vec();
            cycle.push(cur);
            return cycle.join(" -> ");
        }
        path.push(cur);
        let next = topology.services().get(cur).and_then(|svc| {
            svc.infrastructure
                .requires
                .iter()
                .find(|dep| leftover.contains(&dep.as_str()))
        });
        match next {
            Some(dep) => cur = dep,
            None => return path.join(" -> "),
        }
    }
}
