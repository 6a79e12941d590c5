//! The derived relationship graph view.
//!
//! Nodes are tag names; edges are all relationships in a *live* status
//! (pending, queued, processing, active). Aliases contribute "rename"
//! edges, implications contribute "requires" edges, and the two edge kinds
//! are kept in separate directed graphs because their invariants differ:
//! aliases are validated for antecedent uniqueness and chain circularity,
//! implications for cycles and transitive redundancy.
//!
//! Pending proposals count as live edges on purpose: two pending proposals
//! can conflict with each other before either is approved, and approval
//! re-validates against this same view.

pub mod cycles;
pub mod validate;

pub use validate::{ValidationError, Validator};

use crate::model::{RelationKind, RelationStatus, Relationship, TagName};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// One live alias edge, kept alongside the graph for uniqueness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEdge {
    pub relationship_id: i64,
    pub antecedent: TagName,
    pub consequent: TagName,
    pub status: RelationStatus,
}

/// One live implication edge, kept alongside the graph for closure walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicationEdge {
    pub relationship_id: i64,
    pub antecedent: TagName,
    pub consequent: TagName,
    pub status: RelationStatus,
}

/// Directed view over the live relationship set.
#[derive(Debug)]
pub struct RelationGraph {
    aliases: DiGraph<TagName, ()>,
    alias_nodes: HashMap<TagName, NodeIndex>,
    implications: DiGraph<TagName, ()>,
    implication_nodes: HashMap<TagName, NodeIndex>,
    alias_edges: Vec<AliasEdge>,
    implication_edges: Vec<ImplicationEdge>,
}

impl RelationGraph {
    /// Build the graph view from `relationships`, keeping only live rows
    /// and skipping `exclude_id` (used when re-validating an existing row
    /// so it does not conflict with itself).
    pub fn build<'a, I>(relationships: I, exclude_id: Option<i64>) -> Self
    where
        I: IntoIterator<Item = &'a Relationship>,
    {
        let mut graph = Self {
            aliases: DiGraph::new(),
            alias_nodes: HashMap::new(),
            implications: DiGraph::new(),
            implication_nodes: HashMap::new(),
            alias_edges: Vec::new(),
            implication_edges: Vec::new(),
        };

        for rel in relationships {
            if Some(rel.id) == exclude_id || !rel.status.is_live() {
                continue;
            }
            match rel.kind {
                RelationKind::Alias => {
                    let from = intern(&mut graph.aliases, &mut graph.alias_nodes, &rel.antecedent);
                    let to = intern(&mut graph.aliases, &mut graph.alias_nodes, &rel.consequent);
                    graph.aliases.add_edge(from, to, ());
                    graph.alias_edges.push(AliasEdge {
                        relationship_id: rel.id,
                        antecedent: rel.antecedent.clone(),
                        consequent: rel.consequent.clone(),
                        status: rel.status.clone(),
                    });
                }
                RelationKind::Implication => {
                    let from = intern(
                        &mut graph.implications,
                        &mut graph.implication_nodes,
                        &rel.antecedent,
                    );
                    let to = intern(
                        &mut graph.implications,
                        &mut graph.implication_nodes,
                        &rel.consequent,
                    );
                    graph.implications.add_edge(from, to, ());
                    graph.implication_edges.push(ImplicationEdge {
                        relationship_id: rel.id,
                        antecedent: rel.antecedent.clone(),
                        consequent: rel.consequent.clone(),
                        status: rel.status.clone(),
                    });
                }
            }
        }

        graph
    }

    /// Live alias edges sharing `antecedent`.
    pub fn aliases_from<'a>(
        &'a self,
        antecedent: &'a TagName,
    ) -> impl Iterator<Item = &'a AliasEdge> {
        self.alias_edges
            .iter()
            .filter(move |edge| edge.antecedent == *antecedent)
    }

    /// Whether adding the alias edge `antecedent -> consequent` would close
    /// a rename loop. Returns the loop path when it would.
    #[must_use]
    pub fn alias_cycle(
        &self,
        antecedent: &TagName,
        consequent: &TagName,
    ) -> Option<Vec<TagName>> {
        cycle_for_candidate(&self.aliases, &self.alias_nodes, antecedent, consequent)
    }

    /// Whether adding the implication edge `antecedent -> consequent` would
    /// close a requires loop. Returns the loop path when it would.
    #[must_use]
    pub fn implication_cycle(
        &self,
        antecedent: &TagName,
        consequent: &TagName,
    ) -> Option<Vec<TagName>> {
        cycle_for_candidate(
            &self.implications,
            &self.implication_nodes,
            antecedent,
            consequent,
        )
    }

    /// Whether `antecedent` already reaches `consequent` through existing
    /// requires edges (the candidate edge itself is never in the graph).
    #[must_use]
    pub fn already_implies(&self, antecedent: &TagName, consequent: &TagName) -> bool {
        let (Some(&from), Some(&to)) = (
            self.implication_nodes.get(antecedent),
            self.implication_nodes.get(consequent),
        ) else {
            return false;
        };
        cycles::reaches(&self.implications, from, to)
    }

    /// The tags a newly-applied implication of `consequent` must put on a
    /// post: `consequent` itself plus everything `consequent` transitively
    /// requires through *active* implications, in BFS order.
    ///
    /// This is what makes chain application order-independent: approving
    /// `a -> b` after `b -> c` is already active adds both `b` and `c`.
    #[must_use]
    pub fn implication_targets(&self, consequent: &TagName) -> Vec<TagName> {
        let mut targets = vec![consequent.clone()];
        let mut seen: std::collections::HashSet<TagName> =
            std::collections::HashSet::from([consequent.clone()]);
        let mut cursor = 0;

        while cursor < targets.len() {
            let current = targets[cursor].clone();
            cursor += 1;
            for edge in &self.implication_edges {
                if edge.antecedent == current
                    && edge.status == RelationStatus::Active
                    && seen.insert(edge.consequent.clone())
                {
                    targets.push(edge.consequent.clone());
                }
            }
        }

        targets
    }

    /// Follow the *active* alias chain starting at `name` and return the
    /// final consequent.
    ///
    /// Approving `a -> b` while an active alias `b -> c` exists moves posts
    /// to `c`, not `b`. Chains are bounded by the antecedent-uniqueness
    /// invariant, so the walk is linear; a defensive hop limit guards
    /// against corrupted data.
    #[must_use]
    pub fn resolve_alias_target(&self, name: &TagName) -> TagName {
        let mut current = name.clone();
        for _ in 0..MAX_ALIAS_CHAIN_HOPS {
            let next = self
                .alias_edges
                .iter()
                .find(|edge| edge.antecedent == current && edge.status == RelationStatus::Active)
                .map(|edge| edge.consequent.clone());
            match next {
                Some(consequent) if consequent != *name => current = consequent,
                _ => break,
            }
        }
        current
    }
}

/// Hop bound for alias chain resolution on corrupted data.
const MAX_ALIAS_CHAIN_HOPS: usize = 64;

fn intern(
    graph: &mut DiGraph<TagName, ()>,
    nodes: &mut HashMap<TagName, NodeIndex>,
    name: &TagName,
) -> NodeIndex {
    if let Some(&idx) = nodes.get(name) {
        return idx;
    }
    let idx = graph.add_node(name.clone());
    nodes.insert(name.clone(), idx);
    idx
}

/// Cycle check for a candidate edge whose endpoints may not yet be nodes.
fn cycle_for_candidate(
    graph: &DiGraph<TagName, ()>,
    nodes: &HashMap<TagName, NodeIndex>,
    antecedent: &TagName,
    consequent: &TagName,
) -> Option<Vec<TagName>> {
    if antecedent == consequent {
        return Some(vec![antecedent.clone(), antecedent.clone()]);
    }
    let (Some(&from), Some(&to)) = (nodes.get(antecedent), nodes.get(consequent)) else {
        // An endpoint with no existing edges cannot close a loop.
        return None;
    };
    cycles::would_create_cycle(graph, from, to)
}
