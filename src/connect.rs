//! Two-step connection gesture as an explicit state machine.
//!
//! One gesture is in flight per board at a time. The state is transient and
//! never persisted.

use uuid::Uuid;

/// Gesture state: either nothing is armed, or a source node awaits a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectGesture {
    #[default]
    Idle,
    Armed {
        source: Uuid,
    },
}

/// What a qualifying connect-click did to the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// First click: the node became the pending edge source.
    Armed(Uuid),
    /// Clicked the armed source again: gesture cancelled, no edge.
    Cancelled,
    /// Clicked a different node: caller should prompt for a label and
    /// create the edge. The gesture is already back to Idle.
    Completed { source: Uuid, target: Uuid },
}

impl ConnectGesture {
    /// Feed a qualifying connect-click on `node` through the transition
    /// table. Non-qualifying interactions (plain select, drag) never reach
    /// this function.
    pub fn click(&mut self, node: Uuid) -> GestureOutcome {
        match *self {
            ConnectGesture::Idle => {
                *self = ConnectGesture::Armed { source: node };
                GestureOutcome::Armed(node)
            }
            ConnectGesture::Armed { source } if source == node => {
                *self = ConnectGesture::Idle;
                GestureOutcome::Cancelled
            }
            ConnectGesture::Armed { source } => {
                *self = ConnectGesture::Idle;
                GestureOutcome::Completed { source, target: node }
            }
        }
    }

    /// Drop any armed state, e.g. when the armed node is deleted.
    pub fn reset(&mut self) {
        *self = ConnectGesture::Idle;
    }

    pub fn armed_source(&self) -> Option<Uuid> {
        match self {
            ConnectGesture::Armed { source } => Some(*source),
            ConnectGesture::Idle => None,
        }
    }
}
