use super::AssetRef;
use crate::scene::SceneSubtree;
use crate::spatial::Pose;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Handle for an in-flight asset load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(String),
    #[error("asset {asset} could not be decoded: {reason}")]
    Decode { asset: String, reason: String },
    #[error("unknown load ticket {0:?}")]
    UnknownTicket(LoadTicket),
}

#[derive(Debug)]
pub enum LoadPoll {
    Pending,
    Loaded(SceneSubtree),
    Failed(AssetError),
}

/// Fire-and-forget asset loading. `begin_load` never blocks; results are
/// picked up by polling on later frames.
pub trait AssetLoader {
    fn begin_load(&mut self, asset: &AssetRef) -> LoadTicket;
    fn poll(&mut self, ticket: LoadTicket) -> LoadPoll;
}

struct InFlight {
    asset: AssetRef,
    remaining_polls: u32,
}

/// Loader that fabricates a two-node prototype (root plus bounded mesh) for
/// every asset after a fixed number of polls. Individual assets can be made to
/// go missing, arrive corrupt, or never resolve.
pub struct SimulatedAssetLoader {
    latency_polls: u32,
    bounds_radius: f32,
    failing: HashSet<String>,
    corrupt: HashSet<String>,
    stalled: HashSet<String>,
    in_flight: HashMap<LoadTicket, InFlight>,
    next_ticket: u64,
    started: usize,
}

impl Default for SimulatedAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAssetLoader {
    pub fn new() -> Self {
        Self {
            latency_polls: 1,
            // model units; furniture assets are authored in centimetres
            bounds_radius: 50.0,
            failing: HashSet::new(),
            corrupt: HashSet::new(),
            stalled: HashSet::new(),
            in_flight: HashMap::new(),
            next_ticket: 1,
            started: 0,
        }
    }

    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency_polls = polls;
        self
    }

    pub fn with_bounds_radius(mut self, radius: f32) -> Self {
        self.bounds_radius = radius;
        self
    }

    pub fn failing(mut self, asset: impl Into<String>) -> Self {
        self.failing.insert(asset.into());
        self
    }

    /// The asset is found but its payload fails to decode.
    pub fn corrupt(mut self, asset: impl Into<String>) -> Self {
        self.corrupt.insert(asset.into());
        self
    }

    pub fn stalled(mut self, asset: impl Into<String>) -> Self {
        self.stalled.insert(asset.into());
        self
    }

    pub fn loads_started(&self) -> usize {
        self.started
    }

    fn prototype(&self, asset: &AssetRef) -> SceneSubtree {
        SceneSubtree::new(asset.as_str()).with_child(
            SceneSubtree::new("mesh")
                .with_local(Pose::IDENTITY)
                .with_bounds(self.bounds_radius),
        )
    }
}

impl AssetLoader for SimulatedAssetLoader {
    fn begin_load(&mut self, asset: &AssetRef) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.started += 1;
        self.in_flight.insert(
            ticket,
            InFlight {
                asset: asset.clone(),
                remaining_polls: self.latency_polls,
            },
        );
        ticket
    }

    fn poll(&mut self, ticket: LoadTicket) -> LoadPoll {
        let Some(load) = self.in_flight.get_mut(&ticket) else {
            return LoadPoll::Failed(AssetError::UnknownTicket(ticket));
        };
        if self.stalled.contains(load.asset.as_str()) {
            return LoadPoll::Pending;
        }
        if load.remaining_polls > 0 {
            load.remaining_polls -= 1;
            return LoadPoll::Pending;
        }

        let asset = load.asset.clone();
        self.in_flight.remove(&ticket);
        if self.failing.contains(asset.as_str()) {
            LoadPoll::Failed(AssetError::NotFound(asset.as_str().to_string()))
        } else if self.corrupt.contains(asset.as_str()) {
            LoadPoll::Failed(AssetError::Decode {
                asset: asset.as_str().to_string(),
                reason: "truncated binary chunk".to_string(),
            })
        } else {
            LoadPoll::Loaded(self.prototype(&asset))
        }
    }
}
