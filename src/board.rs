//! The board: single owner of the graph plus all interaction state.
//!
//! Every user-level operation (select, edit, connect, search, enrich,
//! import/export) routes through here so the graph stays the one source of
//! truth. Selection, the connect gesture, and visibility are explicit
//! fields rather than ambient globals.

use std::collections::HashSet;
use std::path::Path;

use uuid::Uuid;

use crate::connect::{ConnectGesture, GestureOutcome};
use crate::enrich::{enrich_node, Enrichment};
use crate::inspector::InspectorForm;
use crate::lookup::{is_valid_url, LookupProvider};
use crate::model::{Attachment, Edge, Graph, Group, Node, Status};
use crate::persist::{self, PersistError};
use crate::search;

/// Outcome summary of one enrichment run, for user feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichSummary {
    pub new_tags: usize,
    pub new_attachments: usize,
}

#[derive(Debug, Default)]
pub struct Board {
    pub graph: Graph,
    pub form: InspectorForm,
    selected: Option<Uuid>,
    gesture: ConnectGesture,
    hidden: HashSet<Uuid>,
    query: String,
    /// Nodes with an enrichment run in flight; at most one per node. In the
    /// synchronous flow a run always clears its own marker before returning,
    /// so the guard only rejects callers that move lookups off-thread and
    /// re-enter while a run is pending.
    enriching: HashSet<Uuid>,
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    /// Demo board: a campaign hub, a village, and a bard who lives there.
    pub fn seed_example() -> Self {
        let mut board = Board::new();
        let mut hub = Node::new("Campaign Core", Group::Note).at(0.0, 0.0);
        hub.set_tags(vec!["hub".to_string()]);
        hub.status = Status::Confirmed;
        hub.confidence = 90;
        let mut village = Node::new("Hügelfurt", Group::Location).at(350.0, -60.0);
        village.set_tags(vec!["village".to_string()]);
        let mut bard = Node::new("Garin Windspiel", Group::Npc).at(350.0, 120.0);
        bard.set_tags(vec!["bard".to_string()]);
        bard.status = Status::Suspected;
        bard.confidence = 60;

        let (hub_id, village_id, bard_id) = (hub.id, village.id, bard.id);
        board.graph.add_node(hub);
        board.graph.add_node(village);
        board.graph.add_node(bard);
        board.graph.add_edge(Edge::new(hub_id, village_id, "starts in"));
        board.graph.add_edge(Edge::new(bard_id, village_id, "lives in"));
        board
    }

    // ----- Selection / inspector sync -----

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|id| self.graph.node(id))
    }

    /// Change the selection. Selecting a node populates the inspector form
    /// under suppression; selecting nothing (or a missing id) clears it.
    pub fn select(&mut self, id: Option<Uuid>) {
        match id.and_then(|id| self.graph.node(id)) {
            Some(node) => {
                self.selected = Some(node.id);
                self.form.populate(node);
            }
            None => {
                self.selected = None;
                self.form.clear();
            }
        }
    }

    /// Called after any user edit of an inspector field: write the form
    /// back into the selected node. No-op while nothing is selected or the
    /// change came from population.
    pub fn form_changed(&mut self) {
        if !self.form.take_dirty() {
            return;
        }
        if let Some(id) = self.selected {
            let form = self.form.clone();
            if let Some(node) = self.graph.node_mut(id) {
                form.apply_to(node);
            }
        }
    }

    // ----- Node lifecycle -----

    /// Add a blank node at the given position and select it.
    pub fn add_node(&mut self, x: f64, y: f64) -> Uuid {
        let node = Node::new(crate::model::DEFAULT_LABEL, Group::Note).at(x, y);
        let id = node.id;
        self.graph.add_node(node);
        self.refresh_visibility();
        self.select(Some(id));
        id
    }

    /// Continuous position update during interactive drag. Touches nothing
    /// but the coordinates.
    pub fn move_node(&mut self, id: Uuid, x: f64, y: f64) {
        if let Some(node) = self.graph.node_mut(id) {
            node.x = x;
            node.y = y;
        }
    }

    /// Delete a node, cascading to its incident edges.
    pub fn delete_node(&mut self, id: Uuid) -> bool {
        if !self.graph.remove_node(id) {
            return false;
        }
        if self.selected == Some(id) {
            self.select(None);
        }
        if self.gesture.armed_source() == Some(id) {
            self.gesture.reset();
        }
        self.hidden.remove(&id);
        self.enriching.remove(&id);
        true
    }

    pub fn delete_edge(&mut self, source: Uuid, target: Uuid, label: &str) -> bool {
        self.graph.remove_edge(source, target, label)
    }

    /// Relabel the first edge matching (source, target) in place.
    pub fn update_edge_label(&mut self, source: Uuid, target: Uuid, label: &str) -> bool {
        self.graph.update_edge_label(source, target, label)
    }

    // ----- Attachments -----

    /// Attach a URL to the selected node after syntactic validation.
    /// Returns an error string suitable for a user-visible warning.
    pub fn add_attachment(&mut self, label: &str, url: &str) -> Result<(), String> {
        let id = self.selected.ok_or("No node selected")?;
        if !is_valid_url(url) {
            return Err(format!("That doesn't look like a valid URL: {}", url));
        }
        let node = self.graph.node_mut(id).ok_or("Selected node is gone")?;
        node.add_attachment(Attachment::new(label, url));
        self.form.populate(node);
        Ok(())
    }

    pub fn remove_attachment(&mut self, index: usize) -> Result<(), String> {
        let id = self.selected.ok_or("No node selected")?;
        let node = self.graph.node_mut(id).ok_or("Selected node is gone")?;
        if index >= node.attachments.len() {
            return Err(format!("No attachment at index {}", index));
        }
        node.attachments.remove(index);
        self.form.populate(node);
        Ok(())
    }

    // ----- Connection gesture -----

    /// Route a qualifying connect-click through the gesture machine. On
    /// `Armed` the source is selected as visual feedback. On `Completed`
    /// the caller prompts for a label and calls `finish_connection`.
    pub fn connect_click(&mut self, id: Uuid) -> Result<GestureOutcome, String> {
        if !self.graph.contains_node(id) {
            return Err("Unknown node".to_string());
        }
        let outcome = self.gesture.click(id);
        if let GestureOutcome::Armed(source) = outcome {
            self.select(Some(source));
        }
        Ok(outcome)
    }

    /// Create the edge for a completed gesture. A cancelled label prompt
    /// (`None`) still creates the edge, with an empty label. Returns true
    /// if a new edge was created (false when the triple already existed).
    pub fn finish_connection(
        &mut self,
        source: Uuid,
        target: Uuid,
        label: Option<String>,
    ) -> bool {
        let label = label.unwrap_or_default();
        self.graph.add_edge(Edge::new(source, target, label))
    }

    pub fn gesture_source(&self) -> Option<Uuid> {
        self.gesture.armed_source()
    }

    // ----- Search -----

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.refresh_visibility();
    }

    pub fn is_visible(&self, id: Uuid) -> bool {
        !self.hidden.contains(&id)
    }

    pub fn visible_nodes(&self) -> Vec<&Node> {
        self.graph
            .nodes
            .iter()
            .filter(|n| !self.hidden.contains(&n.id))
            .collect()
    }

    fn refresh_visibility(&mut self) {
        self.hidden = search::hidden_ids(&self.graph, &self.query);
    }

    // ----- Enrichment -----

    /// Enrich the selected node. Lookups run against an immutable snapshot;
    /// the resulting delta is applied as a single batch, so the node is
    /// never observable half-enriched.
    pub fn enrich_selected(&mut self, lookups: &dyn LookupProvider) -> Result<EnrichSummary, String> {
        let id = self.selected.ok_or("No node selected")?;
        self.enrich(id, lookups)
    }

    pub fn enrich(&mut self, id: Uuid, lookups: &dyn LookupProvider) -> Result<EnrichSummary, String> {
        let node = self.graph.node(id).ok_or("Unknown node")?;
        if !self.enriching.insert(id) {
            return Err(format!("Enrichment already running for '{}'", node.label));
        }

        println!("[Enrich] Looking up '{}' ({})", node.label, node.group.as_str());
        let delta: Enrichment = enrich_node(node, lookups);
        let summary = EnrichSummary {
            new_tags: delta.tags.len(),
            new_attachments: delta.attachments.len(),
        };

        if let Some(node) = self.graph.node_mut(id) {
            delta.apply_to(node);
        }
        self.enriching.remove(&id);

        println!(
            "[Enrich] '{}': {} new tag(s), {} new attachment(s)",
            self.graph.node(id).map(|n| n.label.as_str()).unwrap_or("?"),
            summary.new_tags,
            summary.new_attachments
        );

        // Mirror the fresh state into the inspector.
        if self.selected == Some(id) {
            if let Some(node) = self.graph.node(id) {
                self.form.populate(node);
            }
        }
        self.refresh_visibility();
        Ok(summary)
    }

    // ----- Persistence -----

    /// Export the board. Positions live in the model, so there is nothing
    /// to flush from a visual layer here.
    pub fn save_to(&self, path: &Path) -> Result<(), PersistError> {
        persist::save(&self.graph, path)
    }

    /// Import a board file. The document is parsed and sanitized fully
    /// before the live graph is replaced; on error the current board is
    /// left untouched. Derived state (selection, gesture, search) resets.
    pub fn load_from(&mut self, path: &Path) -> Result<usize, PersistError> {
        let graph = persist::load(path)?;
        let count = graph.nodes.len();
        self.graph = graph;
        self.select(None);
        self.gesture.reset();
        self.query.clear();
        self.hidden.clear();
        self.enriching.clear();
        println!("[Import] Loaded {} node(s) from {}", count, path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{DnsRecords, WhoisInfo};

    struct NoLookup;

    impl LookupProvider for NoLookup {
        fn whois(&self, _domain: &str) -> Option<WhoisInfo> {
            None
        }
        fn dns(&self, _domain: &str) -> DnsRecords {
            DnsRecords::default()
        }
        fn url_reachable(&self, _url: &str) -> bool {
            false
        }
    }

    fn two_node_board() -> (Board, Uuid, Uuid) {
        let mut board = Board::new();
        let a = Node::new("a", Group::Note);
        let b = Node::new("b", Group::Note);
        let (a_id, b_id) = (a.id, b.id);
        board.graph.add_node(a);
        board.graph.add_node(b);
        (board, a_id, b_id)
    }

    #[test]
    fn test_gesture_cancel_creates_no_edge() {
        let (mut board, a, _) = two_node_board();
        assert_eq!(board.connect_click(a).unwrap(), GestureOutcome::Armed(a));
        assert_eq!(board.selected(), Some(a));
        assert_eq!(board.connect_click(a).unwrap(), GestureOutcome::Cancelled);
        assert!(board.graph.edges.is_empty());
    }

    #[test]
    fn test_gesture_creates_exactly_one_edge() {
        let (mut board, a, b) = two_node_board();
        board.connect_click(a).unwrap();
        let outcome = board.connect_click(b).unwrap();
        assert_eq!(outcome, GestureOutcome::Completed { source: a, target: b });
        assert!(board.finish_connection(a, b, Some("knows".to_string())));

        // Exact same gesture again: no duplicate edge.
        board.connect_click(a).unwrap();
        board.connect_click(b).unwrap();
        assert!(!board.finish_connection(a, b, Some("knows".to_string())));
        assert_eq!(board.graph.edges.len(), 1);
    }

    #[test]
    fn test_cancelled_label_prompt_still_creates_edge() {
        let (mut board, a, b) = two_node_board();
        board.connect_click(a).unwrap();
        board.connect_click(b).unwrap();
        assert!(board.finish_connection(a, b, None));
        assert_eq!(board.graph.edges[0].label, "");
    }

    #[test]
    fn test_delete_selected_node_clears_state() {
        let (mut board, a, b) = two_node_board();
        board.graph.add_edge(Edge::new(a, b, ""));
        board.select(Some(a));
        board.connect_click(b).unwrap(); // arm on b

        assert!(board.delete_node(b));

        assert!(board.graph.edges.is_empty());
        assert_eq!(board.gesture_source(), None);
        // arming selected b as feedback, so deleting b clears the selection
        assert_eq!(board.selected(), None);
        assert!(!board.graph.contains_node(b));
    }

    #[test]
    fn test_form_round_trip_through_board() {
        let (mut board, a, _) = two_node_board();
        board.select(Some(a));
        board.form.set_label("renamed");
        board.form.set_tags("x, y, x");
        board.form_changed();

        let node = board.graph.node(a).unwrap();
        assert_eq!(node.label, "renamed");
        assert_eq!(node.tags, vec!["x", "y"]);

        // Without a new edit, form_changed is a no-op.
        board.form_changed();
        assert_eq!(board.graph.node(a).unwrap().label, "renamed");
    }

    #[test]
    fn test_search_drives_visibility() {
        let mut board = Board::seed_example();
        board.set_query("bard");
        let visible: Vec<&str> = board.visible_nodes().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(visible, vec!["Garin Windspiel"]);

        board.set_query("");
        assert_eq!(board.visible_nodes().len(), 3);
    }

    #[test]
    fn test_attachment_validation() {
        let (mut board, a, _) = two_node_board();
        board.select(Some(a));
        assert!(board.add_attachment("link", "https://example.com/x").is_ok());
        assert!(board.add_attachment("bad", "definitely not a url").is_err());
        assert_eq!(board.graph.node(a).unwrap().attachments.len(), 1);
        assert_eq!(board.form.attachments.len(), 1);

        board.remove_attachment(0).unwrap();
        assert!(board.graph.node(a).unwrap().attachments.is_empty());
        assert!(board.remove_attachment(0).is_err());
    }

    #[test]
    fn test_edge_relabel_through_board() {
        let (mut board, a, b) = two_node_board();
        board.connect_click(a).unwrap();
        board.connect_click(b).unwrap();
        board.finish_connection(a, b, Some("old".to_string()));

        assert!(board.update_edge_label(a, b, "new"));
        assert_eq!(board.graph.edges[0].label, "new");
        // Direction matters: no reverse edge exists to relabel.
        assert!(!board.update_edge_label(b, a, "backwards"));
    }

    #[test]
    fn test_enrich_rejected_while_run_in_flight() {
        let (mut board, a, _) = two_node_board();

        // Simulate an off-thread run that has not finished yet.
        board.enriching.insert(a);
        assert!(board.enrich(a, &NoLookup).is_err());

        // Once the pending run clears its marker, enrichment works again,
        // and a synchronous run never leaves its own marker behind.
        board.enriching.clear();
        assert!(board.enrich(a, &NoLookup).is_ok());
        assert!(board.enrich(a, &NoLookup).is_ok());
        assert!(board.enriching.is_empty());
    }

    #[test]
    fn test_enrich_updates_inspector_form() {
        let mut board = Board::new();
        let mut node = Node::new("drop", Group::Note);
        node.notes = "ping agent@example.com".to_string();
        let id = node.id;
        board.graph.add_node(node);
        board.select(Some(id));

        let summary = board.enrich_selected(&NoLookup).unwrap();
        assert_eq!(summary.new_tags, 1);
        assert!(board.form.tags.contains("email:agent@example.com"));
        assert!(!board.form.is_dirty());
    }

    #[test]
    fn test_failed_import_leaves_board_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();

        let mut board = Board::seed_example();
        board.select(Some(board.graph.nodes[0].id));
        assert!(board.load_from(&path).is_err());
        assert_eq!(board.graph.nodes.len(), 3);
        assert!(board.selected().is_some());
    }

    #[test]
    fn test_import_resets_derived_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        Board::seed_example().save_to(&path).unwrap();

        let mut board = Board::new();
        let id = board.add_node(0.0, 0.0);
        board.set_query("no-match-at-all");
        assert!(!board.is_visible(id));

        let count = board.load_from(&path).unwrap();
        assert_eq!(count, 3);
        assert_eq!(board.selected(), None);
        assert!(board.graph.nodes.iter().all(|n| board.is_visible(n.id)));
    }
}
