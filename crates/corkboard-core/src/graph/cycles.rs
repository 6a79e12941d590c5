//! Reachability and cycle helpers for relationship graphs.
//!
//! # Edge Direction
//!
//! Edges point `antecedent → consequent`. Adding a new edge `from → to`
//! would create a cycle if `to` already reaches `from` through existing
//! edges.

use crate::model::TagName;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Check whether adding `from -> to` would introduce a cycle.
///
/// Returns a concrete cycle path when one would be created, formatted as
/// `from -> to -> ... -> from`.
///
/// If the edge already exists, this returns `None` (no *new* cycle is
/// created).
#[must_use]
pub fn would_create_cycle(
    graph: &DiGraph<TagName, ()>,
    from: NodeIndex,
    to: NodeIndex,
) -> Option<Vec<TagName>> {
    if from == to {
        let name = node_name(graph, from);
        return Some(vec![name.clone(), name]);
    }

    if graph.contains_edge(from, to) {
        return None;
    }

    // BFS from `to` looking for `from`.
    // If reachable, then adding `from -> to` closes a cycle.
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([to]);
    let mut visited: HashSet<NodeIndex> = HashSet::from([to]);
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    while let Some(current) = queue.pop_front() {
        if current == from {
            return Some(reconstruct_cycle_path(graph, from, to, &parent));
        }

        for edge in graph.edges(current) {
            let next = edge.target();
            if visited.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    None
}

/// Whether `to` is reachable from `from` over existing edges.
#[must_use]
pub fn reaches(graph: &DiGraph<TagName, ()>, from: NodeIndex, to: NodeIndex) -> bool {
    if from == to {
        return true;
    }

    let mut queue: VecDeque<NodeIndex> = VecDeque::from([from]);
    let mut visited: HashSet<NodeIndex> = HashSet::from([from]);

    while let Some(current) = queue.pop_front() {
        for edge in graph.edges(current) {
            let next = edge.target();
            if next == to {
                return true;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    false
}

fn reconstruct_cycle_path(
    graph: &DiGraph<TagName, ()>,
    from: NodeIndex,
    to: NodeIndex,
    parent: &HashMap<NodeIndex, NodeIndex>,
) -> Vec<TagName> {
    // Parent links represent a path: to -> ... -> from.
    // Rebuild that path and then prepend `from` to represent the newly
    // added edge `from -> to` that closes the cycle.
    let mut to_to_from: Vec<NodeIndex> = vec![from];
    let mut cursor = from;

    while cursor != to {
        if let Some(next) = parent.get(&cursor) {
            cursor = *next;
            to_to_from.push(cursor);
        } else {
            break;
        }
    }

    to_to_from.reverse();

    let mut cycle: Vec<TagName> = Vec::with_capacity(to_to_from.len() + 1);
    cycle.push(node_name(graph, from));
    cycle.extend(to_to_from.into_iter().map(|idx| node_name(graph, idx)));
    cycle
}

fn node_name(graph: &DiGraph<TagName, ()>, idx: NodeIndex) -> TagName {
    graph
        .node_weight(idx)
        .cloned()
        .unwrap_or_else(|| TagName::new("unknown").expect("static name is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph_with_edges(edges: &[(&str, &str)]) -> (DiGraph<TagName, ()>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::<TagName, ()>::new();
        let mut map: HashMap<String, NodeIndex> = HashMap::new();

        for &(from, to) in edges {
            let from_idx = *map
                .entry(from.to_string())
                .or_insert_with(|| graph.add_node(TagName::new(from).unwrap()));
            let to_idx = *map
                .entry(to.to_string())
                .or_insert_with(|| graph.add_node(TagName::new(to).unwrap()));
            graph.add_edge(from_idx, to_idx, ());
        }

        (graph, map)
    }

    fn names(path: &[TagName]) -> Vec<&str> {
        path.iter().map(TagName::as_str).collect()
    }

    #[test]
    fn detects_self_loop() {
        let (mut graph, _) = graph_with_edges(&[]);
        let a = graph.add_node(TagName::new("a").unwrap());

        let cycle = would_create_cycle(&graph, a, a).unwrap();
        assert_eq!(names(&cycle), vec!["a", "a"]);
    }

    #[test]
    fn detects_three_node_loop() {
        // Existing: a -> b -> c.  New edge: c -> a.
        let (graph, nodes) = graph_with_edges(&[("a", "b"), ("b", "c")]);

        let cycle = would_create_cycle(&graph, nodes["c"], nodes["a"]).unwrap();
        assert_eq!(names(&cycle), vec!["c", "a", "b", "c"]);
    }

    #[test]
    fn safe_edge_returns_none() {
        let (graph, nodes) = graph_with_edges(&[("a", "b"), ("b", "c")]);
        assert!(would_create_cycle(&graph, nodes["a"], nodes["c"]).is_none());
    }

    #[test]
    fn duplicate_edge_returns_none() {
        let (graph, nodes) = graph_with_edges(&[("a", "b")]);
        assert!(would_create_cycle(&graph, nodes["a"], nodes["b"]).is_none());
    }

    #[test]
    fn reaches_follows_chains() {
        let (graph, nodes) = graph_with_edges(&[("a", "b"), ("b", "c"), ("x", "y")]);

        assert!(reaches(&graph, nodes["a"], nodes["c"]));
        assert!(!reaches(&graph, nodes["c"], nodes["a"]));
        assert!(!reaches(&graph, nodes["a"], nodes["y"]));
        assert!(reaches(&graph, nodes["a"], nodes["a"]));
    }
}
