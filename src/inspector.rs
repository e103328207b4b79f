//! Inspector form state and the selection sync protocol.
//!
//! Populating the form from a freshly selected node must not be mistaken for
//! a user edit: every field write during `populate` happens under a
//! suppression flag that covers the whole sequence, and the dirty marker is
//! cleared only after all fields are in place. Only edits made afterwards
//! propagate back into the model via `apply_to`.

use crate::model::{
    parse_confidence, parse_tag_list, Attachment, Group, Node, Status, DEFAULT_LABEL,
};

/// Raw form field values, as a user would type them. Confidence and tags are
/// kept as text; parsing happens at write-back.
#[derive(Debug, Clone, Default)]
pub struct InspectorForm {
    pub label: String,
    pub group: Group,
    pub status: Status,
    pub confidence: String,
    pub tags: String,
    pub notes: String,
    /// Display-only copy of the node's attachments.
    pub attachments: Vec<Attachment>,
    suppress: bool,
    dirty: bool,
}

impl InspectorForm {
    /// Copy a node's current values into every field as one scoped
    /// operation. Change notifications are suppressed for the whole
    /// sequence so population is never re-interpreted as a user edit.
    pub fn populate(&mut self, node: &Node) {
        self.suppress = true;
        self.label = node.label.clone();
        self.group = node.group;
        self.status = node.status;
        self.confidence = node.confidence.to_string();
        self.tags = node.tags.join(", ");
        self.notes = node.notes.clone();
        self.attachments = node.attachments.clone();
        self.suppress = false;
        self.dirty = false;
    }

    /// Reset to blank fields (nothing selected).
    pub fn clear(&mut self) {
        *self = InspectorForm::default();
    }

    pub fn set_label(&mut self, value: &str) {
        self.label = value.to_string();
        self.mark_changed();
    }

    pub fn set_group(&mut self, value: Group) {
        self.group = value;
        self.mark_changed();
    }

    pub fn set_status(&mut self, value: Status) {
        self.status = value;
        self.mark_changed();
    }

    pub fn set_confidence(&mut self, value: &str) {
        self.confidence = value.to_string();
        self.mark_changed();
    }

    pub fn set_tags(&mut self, value: &str) {
        self.tags = value.to_string();
        self.mark_changed();
    }

    pub fn set_notes(&mut self, value: &str) {
        self.notes = value.to_string();
        self.mark_changed();
    }

    fn mark_changed(&mut self) {
        if !self.suppress {
            self.dirty = true;
        }
    }

    /// True when a user edit is pending; clears the marker.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the form back into a node, applying the field coercion rules:
    /// a cleared label falls back to the placeholder, confidence parses and
    /// clamps (or resets to 50), tags are split on comma, trimmed,
    /// de-duplicated and replace the node's list wholesale.
    pub fn apply_to(&self, node: &mut Node) {
        let label = self.label.trim();
        node.label = if label.is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            label.to_string()
        };
        node.group = self.group;
        node.status = self.status;
        node.confidence = parse_confidence(&self.confidence);
        node.set_tags(parse_tag_list(&self.tags));
        node.notes = self.notes.clone();
    }
}
