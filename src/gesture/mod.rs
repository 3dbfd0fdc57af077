//! Touch gesture state machine: one-finger drag translates, two-finger pinch
//! scales, a quick tap pair reselects, double-activate rotates.

use crate::config::{EngineConfig, ManipulationStrategy};
use crate::gizmo::ManipulationGizmo;
use crate::host::ArHost;
use crate::registry::{InstanceId, InstanceRegistry};
use crate::spatial::Vec3;
use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: u32,
    pub position: [f32; 2],
}

impl TouchPoint {
    pub fn new(id: u32, position: [f32; 2]) -> Self {
        Self { id, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging { touch: u32, last: [f32; 2] },
    Pinching { baseline: f32 },
}

/// Edit applied to the selected instance by a single move event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEdit {
    Translated(Vec3),
    Scaled(f32),
}

#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    state: GestureState,
    last_tap_ms: Option<u64>,
    strategy: ManipulationStrategy,
    drag_sensitivity: f32,
    double_tap_window_ms: u64,
    rotate_step: f32,
}

fn separation(a: &TouchPoint, b: &TouchPoint) -> f32 {
    Vec2::from(a.position).distance(Vec2::from(b.position))
}

impl GestureInterpreter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: GestureState::Idle,
            last_tap_ms: None,
            strategy: config.strategy,
            drag_sensitivity: config.drag_sensitivity,
            double_tap_window_ms: config.double_tap_window_ms,
            rotate_step: config.rotate_step,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn strategy(&self) -> ManipulationStrategy {
        self.strategy
    }

    /// `touches` is the full set of touches active after the event.
    pub fn touch_start(&mut self, touches: &[TouchPoint]) {
        self.transition(touches);
    }

    pub fn touch_end(&mut self, remaining: &[TouchPoint]) {
        self.transition(remaining);
    }

    /// Clears gesture-local state without touching tap history.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    fn transition(&mut self, touches: &[TouchPoint]) {
        let next = match touches {
            [only] => match self.state {
                GestureState::Dragging { touch, last } if touch == only.id => {
                    GestureState::Dragging { touch, last }
                }
                _ => GestureState::Dragging {
                    touch: only.id,
                    last: only.position,
                },
            },
            [a, b] => GestureState::Pinching {
                baseline: separation(a, b),
            },
            _ => GestureState::Idle,
        };
        if next != self.state {
            log::trace!("[gesture] {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Applies an incremental drag or pinch edit. Raw edits are suppressed
    /// while the gizmo owns the selection, and are no-ops without one.
    pub fn touch_move(
        &mut self,
        touches: &[TouchPoint],
        registry: &mut InstanceRegistry,
        gizmo: &ManipulationGizmo,
    ) -> Option<GestureEdit> {
        let edit = match (self.state, touches) {
            (GestureState::Dragging { touch, last }, [only]) => {
                if only.id != touch {
                    self.state = GestureState::Dragging {
                        touch: only.id,
                        last: only.position,
                    };
                    return None;
                }
                let delta = Vec2::from(only.position) - Vec2::from(last);
                self.state = GestureState::Dragging {
                    touch,
                    last: only.position,
                };
                GestureEdit::Translated(Vec3::new(delta.x, 0.0, delta.y) * self.drag_sensitivity)
            }
            (GestureState::Pinching { baseline }, [a, b]) => {
                let current = separation(a, b);
                self.state = GestureState::Pinching { baseline: current };
                if baseline <= f32::EPSILON || current <= f32::EPSILON {
                    log::debug!("[gesture] degenerate pinch distance; re-baselined");
                    return None;
                }
                GestureEdit::Scaled(current / baseline)
            }
            _ => return None,
        };

        if gizmo.is_attached() {
            return None;
        }

        let applied = registry.edit_selected(|pose| match edit {
            GestureEdit::Translated(delta) => pose.position += delta,
            GestureEdit::Scaled(ratio) => pose.scale *= ratio,
        });
        applied.then_some(edit)
    }

    /// Records a discrete tap. The second tap of a pair inside the window casts
    /// a ray through the scene and selects the instance it hits; in gizmo mode
    /// the gizmo follows the new selection.
    pub fn tap<H: ArHost + ?Sized>(
        &mut self,
        point: [f32; 2],
        timestamp_ms: u64,
        host: &mut H,
        registry: &mut InstanceRegistry,
        gizmo: &mut ManipulationGizmo,
    ) -> Option<InstanceId> {
        let is_pair = self.last_tap_ms.is_some_and(|previous| {
            timestamp_ms >= previous && timestamp_ms - previous <= self.double_tap_window_ms
        });
        if !is_pair {
            self.last_tap_ms = Some(timestamp_ms);
            return None;
        }
        self.last_tap_ms = None;

        let ray = host.view_ray(point)?;
        let hit = registry.scene().raycast(&ray)?;
        let Some(instance) = registry.find_root(hit.node) else {
            log::debug!("[gesture] tap hit unowned node {:?}", hit.node);
            return None;
        };
        if let Err(err) = registry.select(instance) {
            log::warn!("[gesture] reselect failed: {err}");
            return None;
        }
        if self.strategy == ManipulationStrategy::GizmoAssisted {
            gizmo.attach(instance, host);
        }
        log::debug!("[gesture] reselected {:?}", instance);
        Some(instance)
    }

    /// Quarter-turn about the vertical axis; only in the raw-gesture strategy.
    pub fn double_activate(&mut self, registry: &mut InstanceRegistry) -> bool {
        if self.strategy != ManipulationStrategy::RawGestures {
            return false;
        }
        let step = self.rotate_step;
        registry.edit_selected(|pose| *pose = pose.rotated_about_up(step))
    }
}
