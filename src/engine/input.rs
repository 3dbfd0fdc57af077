use crate::gesture::{GestureEdit, TouchPoint};
use crate::placement::PlacementOutcome;
use crate::registry::InstanceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragPhase {
    Start,
    Move,
    End,
}

/// Input delivered by the host. Touch events carry every touch still active
/// after the event, mirroring platform touch lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd { touches: Vec<TouchPoint> },
    Tap { point: [f32; 2], timestamp_ms: u64 },
    DoubleActivate,
    /// Confirm-placement action from the platform controller.
    PrimarySelect,
    GizmoDrag { phase: DragPhase, point: [f32; 2] },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputOutcome {
    Ignored,
    Placement(PlacementOutcome),
    Edited(GestureEdit),
    Reselected(InstanceId),
    Rotated,
    GizmoDragging,
    GizmoEdited,
    GizmoReleased,
}
