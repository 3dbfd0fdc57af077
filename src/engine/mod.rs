pub mod input;
pub mod render;

pub use input::{DragPhase, InputEvent, InputOutcome};
pub use render::{FrameInputs, NullRenderer, RenderError, RenderResult, Reticle, SceneRenderer};

use crate::catalog::{AssetLoader, Catalog};
use crate::config::{CatalogConfig, EngineConfig, SelectionOnSessionEnd};
use crate::gesture::GestureInterpreter;
use crate::gizmo::ManipulationGizmo;
use crate::host::{ArHost, Capability, HostResult, SessionId, SessionRequest};
use crate::placement::{PlacementController, PlacementOutcome};
use crate::registry::InstanceRegistry;
use crate::tracking::SurfaceTracker;
use std::time::Instant;

/// Every piece of placement state, passed explicitly instead of living in
/// globals. Hosts reach in here for UI collaborators such as the catalog
/// picker (`catalog.select`) and the gizmo mode picker (`gizmo.set_mode`).
pub struct PlacementContext {
    pub config: EngineConfig,
    pub catalog: Catalog,
    pub registry: InstanceRegistry,
    pub tracker: SurfaceTracker,
    pub gestures: GestureInterpreter,
    pub gizmo: ManipulationGizmo,
    pub placement: PlacementController,
}

impl PlacementContext {
    pub fn new(config: EngineConfig, catalog: Catalog) -> Self {
        Self {
            gestures: GestureInterpreter::new(&config),
            gizmo: ManipulationGizmo::new(&config),
            placement: PlacementController::new(&config),
            tracker: SurfaceTracker::new(),
            registry: InstanceRegistry::new(),
            catalog,
            config,
        }
    }
}

/// Capabilities the host actually granted for the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureSet {
    pub hit_testing: bool,
    pub overlay_ui: bool,
    pub light_estimation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: SessionId,
    pub features: FeatureSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub anchored_frames: u64,
    pub placements: u64,
    pub render_failures: u64,
}

/// Per-frame driver: collect asset loads, refresh the surface anchor, move
/// the reticle, render. Input events are routed between frames on the same
/// thread.
pub struct FrameLoop<H: ArHost, L: AssetLoader, R: SceneRenderer> {
    host: H,
    loader: L,
    renderer: R,
    ctx: PlacementContext,
    session: Option<ActiveSession>,
    reticle: Reticle,
    frame_index: u64,
    elapsed_seconds: f32,
    target_frame_time: f32,
    stats: FrameStats,
}

impl<H: ArHost, L: AssetLoader, R: SceneRenderer> FrameLoop<H, L, R> {
    /// Builds the loop and fires off one asset load per catalog entry.
    pub fn new(
        host: H,
        mut loader: L,
        renderer: R,
        config: EngineConfig,
        catalog: &CatalogConfig,
    ) -> Self {
        let mut catalog = Catalog::from_config(catalog);
        catalog.request_loads(&mut loader);
        log::info!(
            "[frame] {} with {} on {}; {} catalog entries, {:?}",
            renderer.label(),
            host.label(),
            std::any::type_name::<L>(),
            catalog.len(),
            config.strategy
        );

        Self {
            host,
            loader,
            renderer,
            ctx: PlacementContext::new(config, catalog),
            session: None,
            reticle: Reticle::default(),
            frame_index: 0,
            elapsed_seconds: 0.0,
            target_frame_time: 1.0 / 60.0,
            stats: FrameStats::default(),
        }
    }

    pub fn context(&self) -> &PlacementContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut PlacementContext {
        &mut self.ctx
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn reticle(&self) -> &Reticle {
        &self.reticle
    }

    pub fn session(&self) -> Option<ActiveSession> {
        self.session
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Requests an immersive session. A session without hit testing still
    /// starts, but placement stays inert for its lifetime.
    pub fn start_session(&mut self) -> HostResult<SessionId> {
        let grant = self.host.request_session(&SessionRequest::placement())?;
        let features = FeatureSet {
            hit_testing: grant.has(Capability::SurfaceHitTesting),
            overlay_ui: grant.has(Capability::OverlayUi),
            light_estimation: grant.has(Capability::LightEstimation),
        };
        if !features.hit_testing {
            log::warn!(
                "[frame] {} started without surface hit testing; placement disabled",
                grant.session
            );
        } else {
            log::info!("[frame] {} started with {:?}", grant.session, features);
        }

        self.session = Some(ActiveSession {
            id: grant.session,
            features,
        });
        Ok(grant.session)
    }

    /// Handles the platform's session-end event. Late events for sessions
    /// that are no longer current only reach the tracker, which ignores them.
    pub fn end_session(&mut self, session: SessionId) {
        self.ctx.tracker.end_session(session);
        if self.session.map(|active| active.id) != Some(session) {
            return;
        }

        self.session = None;
        self.reticle.hide();
        self.ctx.gestures.cancel();
        self.ctx.gizmo.end_drag(&mut self.host);
        if self.ctx.config.selection_on_session_end == SelectionOnSessionEnd::Clear {
            self.ctx.registry.deselect();
            self.ctx.gizmo.detach(&mut self.host);
        }
    }

    pub fn frame(&mut self, delta_seconds: f32) {
        self.ctx.catalog.poll_loads(&mut self.loader);

        // host tracking is suspended while the gizmo owns the transform
        if !self.ctx.gizmo.is_dragging() {
            self.refresh_anchor();
        }

        let next_index = self.frame_index + 1;
        let inputs = FrameInputs {
            frame_index: next_index,
            delta_seconds,
            elapsed_seconds: self.elapsed_seconds + delta_seconds,
        };
        self.frame_index = next_index;
        self.elapsed_seconds = inputs.elapsed_seconds;
        self.stats.frames += 1;

        if let Err(err) = self
            .renderer
            .render(&inputs, self.ctx.registry.scene(), &self.reticle)
        {
            self.stats.render_failures += 1;
            log::warn!("[frame] render error on frame {next_index}: {err}");
        }
    }

    fn refresh_anchor(&mut self) {
        match self.session {
            Some(active) if active.features.hit_testing => {
                self.ctx.tracker.refresh(&mut self.host, active.id);
            }
            _ => {}
        }

        match self.ctx.tracker.current_anchor() {
            Some(anchor) if self.session.is_some() => {
                self.reticle.show_at(anchor);
                self.stats.anchored_frames += 1;
            }
            _ => self.reticle.hide(),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) -> InputOutcome {
        let ctx = &mut self.ctx;
        match event {
            InputEvent::PrimarySelect if ctx.gizmo.is_dragging() => {
                // the anchor is frozen for the drag
                log::debug!("[frame] placement ignored during gizmo drag");
                InputOutcome::Ignored
            }
            InputEvent::PrimarySelect => {
                let anchor = self.session.and(ctx.tracker.current_anchor());
                let outcome = ctx.placement.confirm(
                    anchor,
                    &ctx.catalog,
                    &mut ctx.registry,
                    &mut ctx.gizmo,
                    &mut self.host,
                );
                if let PlacementOutcome::Placed(_) = outcome {
                    self.stats.placements += 1;
                }
                InputOutcome::Placement(outcome)
            }
            InputEvent::TouchStart { touches } => {
                ctx.gestures.touch_start(&touches);
                InputOutcome::Ignored
            }
            InputEvent::TouchMove { touches } => ctx
                .gestures
                .touch_move(&touches, &mut ctx.registry, &ctx.gizmo)
                .map_or(InputOutcome::Ignored, InputOutcome::Edited),
            InputEvent::TouchEnd { touches } => {
                ctx.gestures.touch_end(&touches);
                InputOutcome::Ignored
            }
            InputEvent::Tap {
                point,
                timestamp_ms,
            } => ctx
                .gestures
                .tap(
                    point,
                    timestamp_ms,
                    &mut self.host,
                    &mut ctx.registry,
                    &mut ctx.gizmo,
                )
                .map_or(InputOutcome::Ignored, InputOutcome::Reselected),
            InputEvent::DoubleActivate => {
                if ctx.gestures.double_activate(&mut ctx.registry) {
                    InputOutcome::Rotated
                } else {
                    InputOutcome::Ignored
                }
            }
            InputEvent::GizmoDrag { phase, point } => {
                let handled = match phase {
                    DragPhase::Start => ctx.gizmo.begin_drag(point, &mut self.host),
                    DragPhase::Move => ctx.gizmo.drag_to(point, &mut ctx.registry),
                    DragPhase::End => {
                        let was_dragging = ctx.gizmo.is_dragging();
                        ctx.gizmo.end_drag(&mut self.host);
                        was_dragging
                    }
                };
                match (handled, phase) {
                    (false, _) => InputOutcome::Ignored,
                    (true, DragPhase::Start) => InputOutcome::GizmoDragging,
                    (true, DragPhase::Move) => InputOutcome::GizmoEdited,
                    (true, DragPhase::End) => InputOutcome::GizmoReleased,
                }
            }
        }
    }

    /// Drives `frames` frames with wall-clock deltas.
    pub fn run(&mut self, frames: u32) {
        let mut last_frame = Instant::now();
        for _ in 0..frames {
            let now = Instant::now();
            let raw_delta = now.duration_since(last_frame).as_secs_f32();
            let delta_seconds = if raw_delta == 0.0 {
                self.target_frame_time
            } else {
                raw_delta
            };
            last_frame = now;
            self.frame(delta_seconds);
        }
        log::debug!("[frame] ran {frames} frames; stats {:?}", self.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SimulatedAssetLoader;
    use crate::config::CatalogEntry;
    use crate::host::SimulatedHost;
    use crate::spatial::{Pose, Vec3};

    type TestLoop = FrameLoop<SimulatedHost, SimulatedAssetLoader, NullRenderer>;

    fn frame_loop(host: SimulatedHost, config: EngineConfig) -> TestLoop {
        let catalog = CatalogConfig::new(vec![CatalogEntry::new("chair.glb", 0.5)])
            .expect("catalog");
        FrameLoop::new(
            host.with_subscription_latency(0),
            SimulatedAssetLoader::new().with_latency(0),
            NullRenderer::new(),
            config,
            &catalog,
        )
    }

    #[test]
    fn reticle_follows_anchor_once_subscribed() {
        let mut frames = frame_loop(SimulatedHost::new(), EngineConfig::default());
        frames.start_session().expect("session");
        frames
            .host_mut()
            .set_surface_pose(Some(Pose::from_position(Vec3::new(0.0, 0.0, -1.0))));

        frames.frame(1.0 / 60.0);
        assert!(frames.reticle().visible);
        assert_eq!(frames.reticle().pose.position, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(
            frames.renderer().last_reticle().map(|reticle| reticle.visible),
            Some(true)
        );

        frames.host_mut().set_surface_pose(None);
        frames.frame(1.0 / 60.0);
        assert!(!frames.reticle().visible);
        assert_eq!(frames.stats().anchored_frames, 1);
    }

    #[test]
    fn missing_hit_testing_keeps_placement_inert() {
        let host = SimulatedHost::new().with_capabilities(vec![Capability::OverlayUi]);
        let mut frames = frame_loop(host, EngineConfig::default());
        let session = frames.start_session().expect("session");
        frames
            .host_mut()
            .set_surface_pose(Some(Pose::IDENTITY));

        frames.run(3);
        assert_eq!(frames.host().requests_for(session), 0);
        assert_eq!(
            frames.handle_input(InputEvent::PrimarySelect),
            InputOutcome::Placement(PlacementOutcome::NoAnchor)
        );
        assert!(!frames.session().expect("active").features.hit_testing);
    }

    #[test]
    fn render_failures_do_not_stop_the_loop() {
        let catalog = CatalogConfig::new(vec![CatalogEntry::new("chair.glb", 1.0)])
            .expect("catalog");
        let mut frames = FrameLoop::new(
            SimulatedHost::new(),
            SimulatedAssetLoader::new(),
            NullRenderer::new().failing_on(2),
            EngineConfig::default(),
            &catalog,
        );
        frames.run(4);

        assert_eq!(frames.stats().frames, 4);
        assert_eq!(frames.stats().render_failures, 1);
        assert_eq!(frames.renderer().frames_rendered(), 4);
    }

    #[test]
    fn session_end_can_clear_selection_when_configured() {
        let config = EngineConfig {
            selection_on_session_end: SelectionOnSessionEnd::Clear,
            ..EngineConfig::default()
        };
        let mut frames = frame_loop(SimulatedHost::new(), config);
        let session = frames.start_session().expect("session");
        frames.host_mut().set_surface_pose(Some(Pose::IDENTITY));
        frames.frame(1.0 / 60.0);
        let placed = frames.handle_input(InputEvent::PrimarySelect);
        assert!(matches!(
            placed,
            InputOutcome::Placement(PlacementOutcome::Placed(_))
        ));

        frames.host_mut().end_session();
        frames.end_session(session);

        assert!(frames.context().registry.selected().is_none());
        assert_eq!(frames.context().registry.len(), 1);
        assert!(!frames.reticle().visible);
    }

    #[test]
    fn gizmo_drag_freezes_anchor_refresh() {
        let config = EngineConfig::default()
            .with_strategy(crate::config::ManipulationStrategy::GizmoAssisted);
        let mut frames = frame_loop(SimulatedHost::new(), config);
        frames.start_session().expect("session");
        frames.host_mut().set_surface_pose(Some(Pose::IDENTITY));
        frames.frame(1.0 / 60.0);
        frames.handle_input(InputEvent::PrimarySelect);

        assert_eq!(
            frames.handle_input(InputEvent::GizmoDrag {
                phase: DragPhase::Start,
                point: [0.0, 0.0],
            }),
            InputOutcome::GizmoDragging
        );
        let queries = frames.host().query_count();
        frames.frame(1.0 / 60.0);
        assert_eq!(frames.host().query_count(), queries);
        assert!(frames.host().is_tracking_suspended());

        frames.handle_input(InputEvent::GizmoDrag {
            phase: DragPhase::End,
            point: [0.0, 0.0],
        });
        frames.frame(1.0 / 60.0);
        assert_eq!(frames.host().query_count(), queries + 1);
        assert!(!frames.host().is_tracking_suspended());
    }
}
