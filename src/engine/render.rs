use crate::scene::SceneGraph;
use crate::spatial::{Mat4, Pose};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub frame_index: u64,
    pub delta_seconds: f32,
    pub elapsed_seconds: f32,
}

/// Ring drawn at the current anchor; hidden whenever there is no surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reticle {
    pub visible: bool,
    pub pose: Pose,
}

impl Reticle {
    pub fn show_at(&mut self, pose: Pose) {
        self.visible = true;
        self.pose = pose;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn matrix(&self) -> Mat4 {
        self.pose.to_matrix()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("renderer expected frame {expected} but got {got}")]
    FrameOutOfOrder { expected: u64, got: u64 },
    #[error("render backend failure: {0}")]
    Backend(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Draws the placed scene plus reticle. Implemented by the rendering host.
pub trait SceneRenderer {
    fn label(&self) -> &'static str;
    fn render(
        &mut self,
        inputs: &FrameInputs,
        scene: &SceneGraph,
        reticle: &Reticle,
    ) -> RenderResult<()>;
}

/// Renderer that draws nothing and records what it was asked to draw.
#[derive(Debug, Default)]
pub struct NullRenderer {
    frame_index: u64,
    last_node_count: usize,
    last_reticle: Option<Reticle>,
    fail_on_frame: Option<u64>,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the given frame report a backend failure.
    pub fn failing_on(mut self, frame_index: u64) -> Self {
        self.fail_on_frame = Some(frame_index);
        self
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    pub fn last_node_count(&self) -> usize {
        self.last_node_count
    }

    pub fn last_reticle(&self) -> Option<&Reticle> {
        self.last_reticle.as_ref()
    }
}

impl SceneRenderer for NullRenderer {
    fn label(&self) -> &'static str {
        "Null Scene Renderer"
    }

    fn render(
        &mut self,
        inputs: &FrameInputs,
        scene: &SceneGraph,
        reticle: &Reticle,
    ) -> RenderResult<()> {
        let expected = self.frame_index + 1;
        if inputs.frame_index != expected {
            return Err(RenderError::FrameOutOfOrder {
                expected,
                got: inputs.frame_index,
            });
        }
        self.frame_index = expected;

        if self.fail_on_frame == Some(inputs.frame_index) {
            return Err(RenderError::Backend("simulated device loss".to_string()));
        }

        self.last_node_count = scene.len();
        self.last_reticle = Some(*reticle);
        log::trace!(
            "[renderer] frame {} ({:.3} s) - {} nodes, reticle {}",
            inputs.frame_index,
            inputs.delta_seconds,
            scene.len(),
            if reticle.visible { "shown" } else { "hidden" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Vec3;

    fn inputs(frame_index: u64) -> FrameInputs {
        FrameInputs {
            frame_index,
            delta_seconds: 1.0 / 60.0,
            elapsed_seconds: frame_index as f32 / 60.0,
        }
    }

    #[test]
    fn null_renderer_validates_frame_order() {
        let mut renderer = NullRenderer::new();
        let scene = SceneGraph::new();
        let reticle = Reticle::default();

        assert!(renderer.render(&inputs(1), &scene, &reticle).is_ok());
        let err = renderer
            .render(&inputs(3), &scene, &reticle)
            .expect_err("skipped frame");
        assert_eq!(err, RenderError::FrameOutOfOrder { expected: 2, got: 3 });
    }

    #[test]
    fn reticle_tracks_visibility() {
        let mut reticle = Reticle::default();
        assert!(!reticle.visible);
        reticle.show_at(Pose::from_position(Vec3::new(0.0, 0.0, -1.0)));
        assert!(reticle.visible);
        assert_eq!(reticle.matrix().w_axis.z, -1.0);
        reticle.hide();
        assert!(!reticle.visible);
    }
}
