//! JSON persistence for the board.
//!
//! The wire format is a document with two top-level arrays, `nodes` and
//! `edges`. Unknown extra fields are ignored on read; absent fields take
//! their model defaults. Loading builds and sanitizes a complete graph
//! before the caller swaps it in, so a failed import leaves the previous
//! board untouched.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

use crate::model::{dedup_tags, Graph};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed board document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serialize a graph to a pretty-printed JSON document. Serde writes every
/// field from owned data, so the document never shares state with the graph.
pub fn to_json(graph: &Graph) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Parse and sanitize a board document into a fresh graph.
pub fn from_json(text: &str) -> Result<Graph, PersistError> {
    let mut graph: Graph = serde_json::from_str(text)?;
    sanitize(&mut graph);
    Ok(graph)
}

pub fn save(graph: &Graph, path: &Path) -> Result<(), PersistError> {
    let json = to_json(graph)?;
    fs::write(path, json).map_err(|source| PersistError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn load(path: &Path) -> Result<Graph, PersistError> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.display().to_string(),
        source,
    })?;
    from_json(&text)
}

/// Apply the interactive-edit coercion rules to freshly parsed data:
/// duplicate node ids keep the first occurrence, tag lists are rebuilt
/// de-duplicated, and edges referencing a missing node or repeating a
/// (source, target, label) triple are dropped silently.
fn sanitize(graph: &mut Graph) {
    let mut seen_ids: HashSet<Uuid> = HashSet::new();
    graph.nodes.retain(|n| seen_ids.insert(n.id));

    for node in &mut graph.nodes {
        let tags = std::mem::take(&mut node.tags);
        node.tags = dedup_tags(tags);
    }

    let ids = seen_ids;
    let mut seen_edges: HashSet<(Uuid, Uuid, String)> = HashSet::new();
    graph.edges.retain(|e| {
        ids.contains(&e.source)
            && ids.contains(&e.target)
            && seen_edges.insert((e.source, e.target, e.label.clone()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attachment, Edge, Group, Node, Status};

    fn sample_graph() -> Graph {
        let mut graph = Graph::default();
        let mut hub = Node::new("Campaign Core", Group::Note).at(0.0, 0.0);
        hub.set_tags(vec!["hub".to_string()]);
        hub.status = Status::Confirmed;
        hub.confidence = 90;
        let village = Node::new("Hügelfurt", Group::Location).at(350.5, -60.25);
        let mut person = Node::new("Garin Windspiel", Group::Npc).at(350.0, 120.0);
        person
            .attachments
            .push(Attachment::new("portrait", "file:///tmp/garin.png"));
        let (hub_id, village_id, person_id) = (hub.id, village.id, person.id);
        graph.add_node(hub);
        graph.add_node(village);
        graph.add_node(person);
        graph.add_edge(Edge::new(hub_id, village_id, "starts in"));
        graph.add_edge(Edge::new(person_id, village_id, "lives in"));
        graph
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let graph = sample_graph();
        let json = to_json(&graph).unwrap();
        let restored = from_json(&json).unwrap();
        assert_eq!(restored, graph);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let graph = sample_graph();
        save(&graph, &path).unwrap();
        let restored = load(&path).unwrap();
        assert_eq!(restored, graph);
    }

    #[test]
    fn test_loaded_graph_shares_nothing_with_source() {
        let graph = sample_graph();
        let json = to_json(&graph).unwrap();
        let mut restored = from_json(&json).unwrap();
        restored.nodes[0].tags.push("added-after-load".to_string());
        restored.nodes[2].attachments[0].label = "edited".to_string();
        assert_eq!(graph.nodes[0].tags, vec!["hub"]);
        assert_eq!(graph.nodes[2].attachments[0].label, "portrait");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let doc = r#"{"nodes": [{"id": "6f2f3a54-9a3f-4a89-b22b-000000000001"}], "edges": []}"#;
        let graph = from_json(doc).unwrap();
        let node = &graph.nodes[0];
        assert_eq!(node.label, "Untitled");
        assert_eq!(node.group, Group::Note);
        assert_eq!(node.status, Status::Unknown);
        assert_eq!(node.confidence, 50);
        assert!(node.tags.is_empty());
        assert_eq!(node.x, 0.0);
    }

    #[test]
    fn test_unknown_fields_and_enum_values_tolerated() {
        let doc = r#"{
            "nodes": [{
                "id": "6f2f3a54-9a3f-4a89-b22b-000000000001",
                "label": "mystery",
                "group": "dragon",
                "status": "maybe",
                "confidence": 420,
                "favourite_color": "octarine"
            }],
            "edges": [],
            "version": 9
        }"#;
        let graph = from_json(doc).unwrap();
        let node = &graph.nodes[0];
        assert_eq!(node.group, Group::Note);
        assert_eq!(node.status, Status::Unknown);
        assert_eq!(node.confidence, 100);
    }

    #[test]
    fn test_dangling_edge_dropped_silently() {
        let doc = r#"{
            "nodes": [{"id": "6f2f3a54-9a3f-4a89-b22b-000000000001", "label": "a"}],
            "edges": [
                {"source": "6f2f3a54-9a3f-4a89-b22b-000000000001",
                 "target": "6f2f3a54-9a3f-4a89-b22b-00000000dead",
                 "label": "gone"}
            ]
        }"#;
        let graph = from_json(doc).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_duplicate_node_id_keeps_first() {
        let doc = r#"{
            "nodes": [
                {"id": "6f2f3a54-9a3f-4a89-b22b-000000000001", "label": "first"},
                {"id": "6f2f3a54-9a3f-4a89-b22b-000000000001", "label": "second"}
            ],
            "edges": []
        }"#;
        let graph = from_json(doc).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].label, "first");
    }

    #[test]
    fn test_imported_tags_deduped_into_fresh_list() {
        let doc = r#"{
            "nodes": [{
                "id": "6f2f3a54-9a3f-4a89-b22b-000000000001",
                "tags": ["a", "b", "a", ""]
            }],
            "edges": []
        }"#;
        let graph = from_json(doc).unwrap();
        assert_eq!(graph.nodes[0].tags, vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(from_json("{ not json").is_err());
        assert!(from_json(r#"{"nodes": [{"id": 7}], "edges": []}"#).is_err());
    }

    #[test]
    fn test_positions_survive_with_float_precision() {
        let mut graph = Graph::default();
        graph.add_node(Node::new("n", Group::Note).at(123.456789, -0.000125));
        let restored = from_json(&to_json(&graph).unwrap()).unwrap();
        assert!((restored.nodes[0].x - 123.456789).abs() < 1e-9);
        assert!((restored.nodes[0].y + 0.000125).abs() < 1e-9);
    }
}
