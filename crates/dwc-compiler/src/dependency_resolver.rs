// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dependency analysis over the workflow step graph.
//!
//! All functions are pure and deterministic: ids are kept in ordered
//! collections so every result is sorted or ordered the same way on every
//! invocation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use dwc_ir::WorkflowSpec;
use serde::{Deserialize, Serialize};

use crate::error::CycleError;

/// Step id to neighbour ids.
pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// Dependency facts stored under `metadata.dependency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyAnnotation {
    pub topological_order: Vec<String>,
    pub roots: Vec<String>,
    pub sinks: Vec<String>,
}

impl DependencyAnnotation {
    pub fn compute(spec: &WorkflowSpec) -> Result<Self, CycleError> {
        Ok(Self {
            topological_order: topological_order(spec)?,
            roots: roots(spec),
            sinks: sinks(spec),
        })
    }
}

/// Successors of every step. Isolated steps map to an empty set.
pub fn adjacency(spec: &WorkflowSpec) -> Adjacency {
    let mut graph: Adjacency = spec
        .steps
        .iter()
        .map(|s| (s.id.clone(), BTreeSet::new()))
        .collect();
    for edge in &spec.edges {
        graph
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone());
        graph.entry(edge.target.clone()).or_default();
    }
    graph
}

/// Predecessors of every step. Isolated steps map to an empty set.
pub fn reverse_adjacency(spec: &WorkflowSpec) -> Adjacency {
    let mut graph: Adjacency = spec
        .steps
        .iter()
        .map(|s| (s.id.clone(), BTreeSet::new()))
        .collect();
    for edge in &spec.edges {
        graph
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone());
        graph.entry(edge.source.clone()).or_default();
    }
    graph
}

/// Kahn's algorithm. Among ready steps the lexicographically smallest id
/// is always emitted first.
pub fn topological_order(spec: &WorkflowSpec) -> Result<Vec<String>, CycleError> {
    let graph = adjacency(spec);
    let mut in_degree: BTreeMap<&str, usize> = graph.keys().map(|k| (k.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *in_degree.entry(target.as_str()).or_default() += 1;
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for target in &graph[node] {
            if let Some(degree) = in_degree.get_mut(target.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(target.as_str());
                }
            }
        }
    }

    if order.len() != graph.len() {
        let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let unordered = graph
            .keys()
            .filter(|k| !placed.contains(k.as_str()))
            .cloned()
            .collect();
        return Err(CycleError { unordered });
    }
    Ok(order)
}

/// Steps with no incoming edges, sorted.
pub fn roots(spec: &WorkflowSpec) -> Vec<String> {
    reverse_adjacency(spec)
        .into_iter()
        .filter(|(_, parents)| parents.is_empty())
        .map(|(id, _)| id)
        .collect()
}

/// Steps with no outgoing edges, sorted.
pub fn sinks(spec: &WorkflowSpec) -> Vec<String> {
    adjacency(spec)
        .into_iter()
        .filter(|(_, children)| children.is_empty())
        .map(|(id, _)| id)
        .collect()
}

/// Steps that contribute to the workflow result: declared output sources,
/// or the sinks when no output names a source step. Sorted, deduplicated.
pub fn terminal_steps(spec: &WorkflowSpec) -> Vec<String> {
    let explicit: BTreeSet<String> = spec
        .outputs
        .iter()
        .filter_map(|o| o.source_step.clone())
        .filter(|s| !s.is_empty())
        .collect();
    if !explicit.is_empty() {
        return explicit.into_iter().collect();
    }
    sinks(spec)
}

/// BFS reachability. Unknown ids are never reachable.
pub fn has_path(spec: &WorkflowSpec, from: &str, to: &str) -> bool {
    reachable(&adjacency(spec), from, to)
}

fn reachable(graph: &Adjacency, from: &str, to: &str) -> bool {
    if !graph.contains_key(from) || !graph.contains_key(to) {
        return false;
    }

    let mut queue = VecDeque::from([from]);
    let mut visited = BTreeSet::new();
    while let Some(current) = queue.pop_front() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = graph.get(current) {
            queue.extend(next.iter().map(String::as_str).filter(|n| !visited.contains(n)));
        }
    }
    false
}

/// Every step reachable backwards (via predecessors) from `seeds`,
/// including the seeds themselves.
pub fn ancestors_of(spec: &WorkflowSpec, seeds: &[String]) -> BTreeSet<String> {
    let reverse = reverse_adjacency(spec);
    let mut useful: BTreeSet<String> = seeds.iter().cloned().collect();
    let mut queue: VecDeque<&str> = seeds.iter().map(String::as_str).collect();

    while let Some(node) = queue.pop_front() {
        let Some(parents) = reverse.get(node) else {
            continue;
        };
        for parent in parents {
            if useful.insert(parent.clone()) {
                queue.push_back(parent.as_str());
            }
        }
    }
    useful
}

/// Conservative sibling grouping.
///
/// For each parent (in id order) with two or more children, children are
/// admitted in id order into an independent set when no path connects them
/// to an already admitted member in either direction. Sets with at least
/// two members are reported.
pub fn find_parallel_groups(spec: &WorkflowSpec) -> Vec<Vec<String>> {
    let graph = adjacency(spec);
    let mut groups = Vec::new();

    for children in graph.values() {
        if children.len() < 2 {
            continue;
        }

        let mut independent: Vec<&str> = Vec::new();
        for child in children {
            let isolated = independent.iter().all(|other| {
                !reachable(&graph, child, other) && !reachable(&graph, other, child)
            });
            if isolated {
                independent.push(child);
            }
        }

        if independent.len() > 1 {
            groups.push(independent.into_iter().map(str::to_string).collect());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_ir::{EdgeSpec, OutputSpec, StepKind, StepSpec};

    fn graph(steps: &[&str], edges: &[(&str, &str)]) -> WorkflowSpec {
        let mut spec = WorkflowSpec::new("test");
        spec.steps = steps
            .iter()
            .map(|id| StepSpec::new(*id, StepKind::Transform))
            .collect();
        spec.edges = edges.iter().map(|(s, t)| EdgeSpec::new(*s, *t)).collect();
        spec
    }

    #[test]
    fn test_roots_and_sinks_fan_in() {
        let spec = graph(&["A", "B", "C"], &[("A", "C"), ("B", "C")]);
        assert_eq!(roots(&spec), vec!["A", "B"]);
        assert_eq!(sinks(&spec), vec!["C"]);
    }

    #[test]
    fn test_isolated_step_is_root_and_sink() {
        let spec = graph(&["lonely", "a", "b"], &[("a", "b")]);
        assert!(adjacency(&spec)["lonely"].is_empty());
        assert_eq!(roots(&spec), vec!["a", "lonely"]);
        assert_eq!(sinks(&spec), vec!["b", "lonely"]);
    }

    #[test]
    fn test_topological_order_lexicographic_ties() {
        let spec = graph(
            &["d", "c", "b", "a"],
            &[("b", "d"), ("a", "d"), ("c", "d")],
        );
        assert_eq!(topological_order(&spec).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_topological_order_respects_every_edge() {
        let edges = [("z", "a"), ("a", "m"), ("m", "b"), ("z", "b"), ("q", "m")];
        let spec = graph(&["a", "b", "m", "q", "z"], &edges);
        let order = topological_order(&spec).unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        for (u, v) in edges {
            assert!(pos(u) < pos(v), "{u} must precede {v}");
        }
    }

    #[test]
    fn test_cycle_reports_unordered_steps() {
        let spec = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "b"), ("c", "d")]);
        let err = topological_order(&spec).unwrap_err();
        assert_eq!(err.unordered, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_has_path() {
        let spec = graph(&["a", "b", "c", "x"], &[("a", "b"), ("b", "c")]);
        assert!(has_path(&spec, "a", "c"));
        assert!(!has_path(&spec, "c", "a"));
        assert!(!has_path(&spec, "a", "x"));
        assert!(!has_path(&spec, "a", "missing"));
        assert!(has_path(&spec, "a", "a"));
    }

    #[test]
    fn test_parallel_groups_exclude_connected_siblings() {
        // r fans out to a, b, c; a -> c, so c cannot join a's group.
        let spec = graph(
            &["r", "a", "b", "c"],
            &[("r", "a"), ("r", "b"), ("r", "c"), ("a", "c")],
        );
        assert_eq!(find_parallel_groups(&spec), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_parallel_groups_require_two_members() {
        let spec = graph(&["r", "a", "b"], &[("r", "a"), ("r", "b"), ("a", "b")]);
        assert!(find_parallel_groups(&spec).is_empty());
    }

    #[test]
    fn test_terminal_steps_prefers_outputs() {
        let mut spec = graph(&["a", "b", "c"], &[("a", "b")]);
        assert_eq!(terminal_steps(&spec), vec!["b", "c"]);

        spec.outputs = vec![
            OutputSpec {
                id: "o2".into(),
                name: "second".into(),
                data_type: "string".into(),
                source_step: Some("a".into()),
                description: None,
            },
            OutputSpec {
                id: "o1".into(),
                name: "first".into(),
                data_type: "string".into(),
                source_step: Some("a".into()),
                description: None,
            },
        ];
        assert_eq!(terminal_steps(&spec), vec!["a"]);
    }

    #[test]
    fn test_ancestors_of() {
        let spec = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("d", "c")]);
        let useful = ancestors_of(&spec, &["b".to_string()]);
        assert_eq!(useful.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
