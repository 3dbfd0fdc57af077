//! Direct-manipulation handles bound to the selected instance.

use crate::config::EngineConfig;
use crate::host::TrackingControl;
use crate::registry::{InstanceId, InstanceRegistry};
use crate::spatial::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone)]
pub struct ManipulationGizmo {
    attached: Option<InstanceId>,
    mode: GizmoMode,
    drag_from: Option<[f32; 2]>,
    translate_sensitivity: f32,
    rotate_sensitivity: f32,
    scale_sensitivity: f32,
}

impl ManipulationGizmo {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            attached: None,
            mode: GizmoMode::default(),
            drag_from: None,
            translate_sensitivity: config.drag_sensitivity,
            rotate_sensitivity: config.gizmo_rotate_sensitivity,
            scale_sensitivity: config.gizmo_scale_sensitivity,
        }
    }

    pub fn attached(&self) -> Option<InstanceId> {
        self.attached
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GizmoMode) {
        self.mode = mode;
    }

    /// Binds the handles to `instance`, releasing whatever was attached
    /// before (including an in-progress drag).
    pub fn attach<T: TrackingControl + ?Sized>(&mut self, instance: InstanceId, tracking: &mut T) {
        if self.attached == Some(instance) {
            return;
        }
        self.end_drag(tracking);
        self.attached = Some(instance);
        log::debug!("[gizmo] attached to {:?}", instance);
    }

    pub fn detach<T: TrackingControl + ?Sized>(&mut self, tracking: &mut T) {
        self.end_drag(tracking);
        if let Some(previous) = self.attached.take() {
            log::debug!("[gizmo] detached from {:?}", previous);
        }
    }

    /// Starts a handle drag and suspends host tracking for its duration.
    /// Ignored while nothing is attached.
    pub fn begin_drag<T: TrackingControl + ?Sized>(
        &mut self,
        point: [f32; 2],
        tracking: &mut T,
    ) -> bool {
        if self.attached.is_none() {
            return false;
        }
        if self.drag_from.is_none() {
            tracking.set_tracking_suspended(true);
        }
        self.drag_from = Some(point);
        true
    }

    /// Applies the motion since the previous drag point according to the
    /// current mode. Returns whether an edit was applied.
    pub fn drag_to(&mut self, point: [f32; 2], registry: &mut InstanceRegistry) -> bool {
        let (Some(attached), Some(from)) = (self.attached, self.drag_from) else {
            return false;
        };
        if registry.selected_id() != Some(attached) {
            log::warn!("[gizmo] attached {:?} is not the selection; drag ignored", attached);
            return false;
        }

        let dx = point[0] - from[0];
        let dy = point[1] - from[1];
        self.drag_from = Some(point);

        let mode = self.mode;
        let translate = self.translate_sensitivity;
        let rotate = self.rotate_sensitivity;
        let scale = self.scale_sensitivity;
        registry.edit_selected(|pose| match mode {
            GizmoMode::Translate => {
                pose.position += Vec3::new(dx, 0.0, dy) * translate;
            }
            GizmoMode::Rotate => {
                *pose = pose.rotated_about_up(-dx * rotate);
            }
            GizmoMode::Scale => {
                pose.scale *= (-dy * scale).exp();
            }
        })
    }

    /// Ends a drag and hands tracking back to the host. No-op when idle.
    pub fn end_drag<T: TrackingControl + ?Sized>(&mut self, tracking: &mut T) {
        if self.drag_from.take().is_some() {
            tracking.set_tracking_suspended(false);
        }
    }
}
