//! Free-text visibility filter over all nodes.
//!
//! The predicate is pure and re-evaluated in full on every query change.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{Graph, Node};

/// Case-insensitive substring match against label, tags, attachment
/// label+url, and notes. An empty (or whitespace) query matches everything.
pub fn node_matches(node: &Node, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    node.label.to_lowercase().contains(&q)
        || node.tags.iter().any(|t| t.to_lowercase().contains(&q))
        || node
            .attachments
            .iter()
            .any(|a| format!("{} {}", a.label, a.url).to_lowercase().contains(&q))
        || node.notes.to_lowercase().contains(&q)
}

/// Ids of nodes the query hides. Empty set means everything is visible.
pub fn hidden_ids(graph: &Graph, query: &str) -> HashSet<Uuid> {
    graph
        .nodes
        .iter()
        .filter(|n| !node_matches(n, query))
        .map(|n| n.id)
        .collect()
}
