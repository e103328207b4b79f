//! Core graph data model: nodes, edges, attachments.
//!
//! The `Graph` is the single source of truth. Everything visual (canvas
//! items, inspector widgets) is a derived projection that must be
//! reconstructible from it at any time. Tag and attachment lists are owned
//! per node; every mutation path builds a fresh container so that no two
//! nodes or snapshots can ever observe each other's edits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const DEFAULT_LABEL: &str = "Untitled";
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Entity category. Drives enrichment behavior and (in a frontend) color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Group {
    Npc,
    Location,
    Quest,
    Item,
    Faction,
    Person,
    Org,
    Domain,
    Ip,
    Url,
    #[default]
    Note,
}

impl Group {
    pub const ALL: [Group; 11] = [
        Group::Npc,
        Group::Location,
        Group::Quest,
        Group::Item,
        Group::Faction,
        Group::Person,
        Group::Org,
        Group::Domain,
        Group::Ip,
        Group::Url,
        Group::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Npc => "npc",
            Group::Location => "location",
            Group::Quest => "quest",
            Group::Item => "item",
            Group::Faction => "faction",
            Group::Person => "person",
            Group::Org => "org",
            Group::Domain => "domain",
            Group::Ip => "ip",
            Group::Url => "url",
            Group::Note => "note",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "npc" => Some(Group::Npc),
            "location" => Some(Group::Location),
            "quest" => Some(Group::Quest),
            "item" => Some(Group::Item),
            "faction" => Some(Group::Faction),
            "person" => Some(Group::Person),
            "org" => Some(Group::Org),
            "domain" => Some(Group::Domain),
            "ip" => Some(Group::Ip),
            "url" => Some(Group::Url),
            "note" => Some(Group::Note),
            _ => None,
        }
    }
}

/// Investigation status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Unknown,
    Confirmed,
    Suspected,
    False,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Unknown,
        Status::Confirmed,
        Status::Suspected,
        Status::False,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Confirmed => "confirmed",
            Status::Suspected => "suspected",
            Status::False => "false",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Status::Unknown),
            "confirmed" => Some(Status::Confirmed),
            "suspected" => Some(Status::Suspected),
            "false" => Some(Status::False),
            _ => None,
        }
    }
}

/// Line style of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl EdgeStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStyle::Solid => "solid",
            EdgeStyle::Dashed => "dashed",
            EdgeStyle::Dotted => "dotted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "solid" => Some(EdgeStyle::Solid),
            "dashed" => Some(EdgeStyle::Dashed),
            "dotted" => Some(EdgeStyle::Dotted),
            _ => None,
        }
    }
}

// The three enums serialize as their lowercase wire strings. Unknown values
// coerce to the default on read instead of failing the whole document.
macro_rules! impl_wire_enum {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($ty::from_str(&s).unwrap_or_default())
            }
        }
    };
}

impl_wire_enum!(Group);
impl_wire_enum!(Status);
impl_wire_enum!(EdgeStyle);

/// A labelled URL (or file URL) attached to a node.
///
/// Attachments are value objects; the URL is the dedup key wherever one is
/// appended programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default = "default_attachment_label")]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

fn default_attachment_label() -> String {
    "link".to_string()
}

impl Attachment {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Attachment { label: label.into(), url: url.into() }
    }
}

/// Clamp an arbitrary numeric confidence into 0..=100. Non-finite input
/// resets to the default of 50.
pub fn clamp_confidence(value: f64) -> u8 {
    if !value.is_finite() {
        return DEFAULT_CONFIDENCE;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Parse a user-typed confidence string; anything unparseable resets to 50.
pub fn parse_confidence(text: &str) -> u8 {
    match text.trim().parse::<i64>() {
        Ok(v) => clamp_confidence(v as f64),
        Err(_) => DEFAULT_CONFIDENCE,
    }
}

/// Split a comma-separated tag string, trim entries, drop blanks, and
/// de-duplicate preserving first-seen order. Always returns a fresh list.
pub fn parse_tag_list(text: &str) -> Vec<String> {
    dedup_tags(text.split(',').map(|t| t.trim().to_string()))
}

/// De-duplicate tags preserving first-seen order, skipping empty entries.
pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if tag.is_empty() {
            continue;
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn de_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_confidence(value))
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_confidence() -> u8 {
    DEFAULT_CONFIDENCE
}

/// A board entity: person, domain, quest, location, free note, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub group: Group,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "default_confidence", deserialize_with = "de_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Node {
    pub fn new(label: impl Into<String>, group: Group) -> Self {
        Node {
            id: Uuid::new_v4(),
            label: label.into(),
            group,
            tags: Vec::new(),
            status: Status::Unknown,
            confidence: DEFAULT_CONFIDENCE,
            attachments: Vec::new(),
            notes: String::new(),
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Replace the tag list with a de-duplicated, freshly allocated copy.
    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = String>) {
        self.tags = dedup_tags(tags);
    }

    /// Append a tag if not already present (full-string equality).
    /// Returns true if the tag was added.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.is_empty() || self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Append an attachment unless one with the same URL already exists.
    /// Returns true if the attachment was added.
    pub fn add_attachment(&mut self, attachment: Attachment) -> bool {
        if self.attachments.iter().any(|a| a.url == attachment.url) {
            return false;
        }
        self.attachments.push(attachment);
        true
    }
}

/// A labelled, styled, directed relationship between two nodes.
///
/// Edges have no identity beyond the (source, target, label) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: Uuid,
    pub target: Uuid,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub style: EdgeStyle,
}

impl Edge {
    pub fn new(source: Uuid, target: Uuid, label: impl Into<String>) -> Self {
        Edge { source, target, label: label.into(), style: EdgeStyle::Solid }
    }
}

/// The persisted aggregate: ordered nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: Uuid) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: Uuid) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Add a node. A node whose id is already present is silently skipped,
    /// keeping ids unique within the graph. Returns true when added.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.contains_node(node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node and every edge incident to it. Returns true when the
    /// node existed.
    pub fn remove_node(&mut self, id: Uuid) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        true
    }

    /// Add an edge. Rejected when either endpoint is missing or an edge with
    /// the same (source, target, label) triple already exists. Returns true
    /// when added.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.contains_node(edge.source) || !self.contains_node(edge.target) {
            return false;
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == edge.source && e.target == edge.target && e.label == edge.label)
        {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Remove the edge matching the exact (source, target, label) triple.
    pub fn remove_edge(&mut self, source: Uuid, target: Uuid, label: &str) -> bool {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.source == source && e.target == target && e.label == label));
        self.edges.len() != before
    }

    /// Update the label of the first edge matching (source, target) in place.
    pub fn update_edge_label(&mut self, source: Uuid, target: Uuid, label: &str) -> bool {
        for edge in &mut self.edges {
            if edge.source == source && edge.target == target {
                edge.label = label.to_string();
                return true;
            }
        }
        false
    }

    pub fn edges_for_node(&self, id: Uuid) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_round_trip() {
        for g in Group::ALL {
            assert_eq!(Group::from_str(g.as_str()), Some(g));
        }
        assert_eq!(Group::from_str("banana"), None);
    }

    #[test]
    fn test_confidence_clamping() {
        assert_eq!(clamp_confidence(150.0), 100);
        assert_eq!(clamp_confidence(-3.0), 0);
        assert_eq!(clamp_confidence(62.4), 62);
        assert_eq!(clamp_confidence(f64::NAN), DEFAULT_CONFIDENCE);
        assert_eq!(parse_confidence("85"), 85);
        assert_eq!(parse_confidence(" 40 "), 40);
        assert_eq!(parse_confidence("abc"), DEFAULT_CONFIDENCE);
        assert_eq!(parse_confidence(""), DEFAULT_CONFIDENCE);
        assert_eq!(parse_confidence("9000"), 100);
    }

    #[test]
    fn test_parse_tag_list_dedup_and_order() {
        let tags = parse_tag_list("bard, village , bard,, hub ,village");
        assert_eq!(tags, vec!["bard", "village", "hub"]);
    }

    #[test]
    fn test_set_tags_always_unique() {
        let mut node = Node::new("n", Group::Note);
        node.set_tags(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(node.tags, vec!["a", "b"]);
        let unique: std::collections::HashSet<_> = node.tags.iter().collect();
        assert_eq!(unique.len(), node.tags.len());
    }

    #[test]
    fn test_tag_mutation_does_not_alias_sibling() {
        let shared = vec!["seed".to_string(), "shared".to_string()];
        let mut a = Node::new("a", Group::Note);
        let mut b = Node::new("b", Group::Note);
        a.set_tags(shared.clone());
        b.set_tags(shared.clone());

        a.add_tag("only-a");
        a.tags[0] = "mutated".to_string();

        assert_eq!(b.tags, vec!["seed", "shared"]);
        assert_eq!(shared, vec!["seed", "shared"]);
    }

    #[test]
    fn test_attachment_dedup_by_url_not_label() {
        let mut node = Node::new("n", Group::Person);
        assert!(node.add_attachment(Attachment::new("Google", "https://g.example/1")));
        assert!(!node.add_attachment(Attachment::new("Renamed", "https://g.example/1")));
        assert!(node.add_attachment(Attachment::new("Google", "https://g.example/2")));
        assert_eq!(node.attachments.len(), 2);
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        let mut graph = Graph::default();
        let a = Node::new("a", Group::Note);
        let a_id = a.id;
        graph.add_node(a);
        assert!(!graph.add_edge(Edge::new(a_id, Uuid::new_v4(), "dangling")));
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_add_edge_dedup_by_triple() {
        let mut graph = Graph::default();
        let a = Node::new("a", Group::Note);
        let b = Node::new("b", Group::Note);
        let (a_id, b_id) = (a.id, b.id);
        graph.add_node(a);
        graph.add_node(b);

        assert!(graph.add_edge(Edge::new(a_id, b_id, "knows")));
        assert!(!graph.add_edge(Edge::new(a_id, b_id, "knows")));
        // Different label is a different edge
        assert!(graph.add_edge(Edge::new(a_id, b_id, "works with")));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut graph = Graph::default();
        let a = Node::new("a", Group::Note);
        let b = Node::new("b", Group::Note);
        let c = Node::new("c", Group::Note);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        graph.add_node(a);
        graph.add_node(b);
        graph.add_node(c);
        graph.add_edge(Edge::new(a_id, b_id, ""));
        graph.add_edge(Edge::new(b_id, c_id, ""));
        graph.add_edge(Edge::new(c_id, a_id, ""));

        assert!(graph.remove_node(b_id));

        assert_eq!(graph.edges.len(), 1);
        assert!(graph
            .edges
            .iter()
            .all(|e| graph.contains_node(e.source) && graph.contains_node(e.target)));
    }

    #[test]
    fn test_update_edge_label_first_match() {
        let mut graph = Graph::default();
        let a = Node::new("a", Group::Note);
        let b = Node::new("b", Group::Note);
        let (a_id, b_id) = (a.id, b.id);
        graph.add_node(a);
        graph.add_node(b);
        graph.add_edge(Edge::new(a_id, b_id, "old"));

        assert!(graph.update_edge_label(a_id, b_id, "new"));
        assert_eq!(graph.edges[0].label, "new");
        assert!(!graph.update_edge_label(b_id, a_id, "nope"));
    }

    #[test]
    fn test_duplicate_node_id_skipped() {
        let mut graph = Graph::default();
        let a = Node::new("a", Group::Note);
        let mut twin = Node::new("twin", Group::Note);
        twin.id = a.id;
        assert!(graph.add_node(a));
        assert!(!graph.add_node(twin));
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].label, "a");
    }
}
