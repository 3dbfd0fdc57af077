pub mod simulated;

pub use simulated::SimulatedHost;

use crate::spatial::{Mat4, Ray};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of one immersive session. Hosts never reuse an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Outstanding hit-test subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionTicket(pub u64);

/// Resolved hit-test source, valid for the session it was requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitTestSource(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    SurfaceHitTesting,
    OverlayUi,
    LightEstimation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub required: Vec<Capability>,
    pub optional: Vec<Capability>,
}

impl SessionRequest {
    /// Hit testing is required; overlay UI and light estimation are optional.
    pub fn placement() -> Self {
        Self {
            required: vec![Capability::SurfaceHitTesting],
            optional: vec![Capability::OverlayUi, Capability::LightEstimation],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub session: SessionId,
    pub granted: Vec<Capability>,
}

impl SessionGrant {
    pub fn has(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }
}

#[derive(Debug)]
pub enum SubscriptionPoll {
    Pending,
    Ready(HitTestSource),
    Failed(HostError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("immersive session refused: {0}")]
    SessionRefused(String),
    #[error("{0} is not active")]
    SessionInactive(SessionId),
    #[error("hit-test subscription rejected: {0}")]
    SubscriptionRejected(String),
    #[error("unknown subscription ticket {0:?}")]
    UnknownTicket(SubscriptionTicket),
    #[error("hit-test query failed: {0}")]
    QueryFailed(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Lets direct-manipulation tools pause the host's motion-tracking-driven
/// camera and reticle updates while they own the transform.
pub trait TrackingControl {
    fn set_tracking_suspended(&mut self, suspended: bool);
}

/// Capabilities consumed from the AR platform. The engine never implements
/// these; a rendering host wires them to the real runtime.
pub trait ArHost: TrackingControl {
    fn label(&self) -> &'static str;

    fn request_session(&mut self, request: &SessionRequest) -> HostResult<SessionGrant>;

    /// Starts an asynchronous hit-test subscription for the viewer space.
    fn request_hit_test_source(&mut self, session: SessionId) -> HostResult<SubscriptionTicket>;

    fn poll_hit_test_source(&mut self, ticket: SubscriptionTicket) -> SubscriptionPoll;

    /// Zero or one surface intersection for this frame.
    fn hit_test(&mut self, source: HitTestSource) -> HostResult<Option<Mat4>>;

    /// World-space ray through a screen point, if the camera is known.
    fn view_ray(&self, screen: [f32; 2]) -> Option<Ray>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_request_requires_hit_testing_only() {
        let request = SessionRequest::placement();
        assert_eq!(request.required, vec![Capability::SurfaceHitTesting]);
        assert!(request.optional.contains(&Capability::OverlayUi));
        assert!(request.optional.contains(&Capability::LightEstimation));
    }

    #[test]
    fn host_errors_render_context() {
        let err = HostError::SessionInactive(SessionId(4));
        assert_eq!(err.to_string(), "session#4 is not active");
    }
}
