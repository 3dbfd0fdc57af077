pub mod catalog;
pub mod config;
pub mod engine;
pub mod gesture;
pub mod gizmo;
pub mod host;
pub mod placement;
pub mod registry;
pub mod scene;
pub mod spatial;
pub mod tracking;

pub use config::{CatalogConfig, EngineConfig, ManipulationStrategy};
pub use engine::{FrameLoop, InputEvent, InputOutcome, PlacementContext};
pub use placement::PlacementOutcome;
pub use registry::InstanceId;

/// Frame loop wired to the simulated host, loader and renderer.
pub type SimulatedLoop =
    FrameLoop<host::SimulatedHost, catalog::SimulatedAssetLoader, engine::NullRenderer>;

/// Bootstraps a placement loop against simulated collaborators.
pub fn simulated(config: EngineConfig, catalog: &CatalogConfig) -> SimulatedLoop {
    FrameLoop::new(
        host::SimulatedHost::new(),
        catalog::SimulatedAssetLoader::new(),
        engine::NullRenderer::new(),
        config,
        catalog,
    )
}
