use crate::catalog::Catalog;
use crate::config::{EngineConfig, ManipulationStrategy};
use crate::gizmo::ManipulationGizmo;
use crate::host::TrackingControl;
use crate::registry::{InstanceId, InstanceRegistry};
use crate::spatial::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed(InstanceId),
    /// The tracker has no surface under the reticle.
    NoAnchor,
    /// The anchor pose had non-finite or collapsed components.
    DegenerateAnchor,
    /// The chosen catalog slot is still loading or failed to load.
    TemplateUnavailable,
}

impl PlacementOutcome {
    pub fn placed(self) -> Option<InstanceId> {
        match self {
            PlacementOutcome::Placed(id) => Some(id),
            _ => None,
        }
    }
}

/// Spawns the chosen catalog template at the current anchor on confirm.
#[derive(Debug, Clone)]
pub struct PlacementController {
    strategy: ManipulationStrategy,
    placed: u64,
}

impl PlacementController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            strategy: config.strategy,
            placed: 0,
        }
    }

    pub fn placed_count(&self) -> u64 {
        self.placed
    }

    pub fn confirm<T: TrackingControl + ?Sized>(
        &mut self,
        anchor: Option<Pose>,
        catalog: &Catalog,
        registry: &mut InstanceRegistry,
        gizmo: &mut ManipulationGizmo,
        tracking: &mut T,
    ) -> PlacementOutcome {
        let Some(anchor) = anchor else {
            return PlacementOutcome::NoAnchor;
        };
        if !anchor.is_placeable() {
            log::warn!("[placement] ignoring degenerate anchor {:?}", anchor);
            return PlacementOutcome::DegenerateAnchor;
        }
        let Some(template) = catalog.chosen_template() else {
            log::debug!(
                "[placement] catalog slot {} has no loaded template",
                catalog.chosen()
            );
            return PlacementOutcome::TemplateUnavailable;
        };

        let pose = anchor.with_uniform_factor(template.base_scale());
        let id = registry.spawn(template, pose);
        self.placed += 1;

        if self.strategy == ManipulationStrategy::GizmoAssisted {
            gizmo.attach(id, tracking);
        }
        PlacementOutcome::Placed(id)
    }
}
