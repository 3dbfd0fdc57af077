use super::{
    ArHost, Capability, HitTestSource, HostError, HostResult, SessionGrant, SessionId,
    SessionRequest, SubscriptionPoll, SubscriptionTicket, TrackingControl,
};
use crate::spatial::{Mat4, Pose, Ray, Vec3};
use std::collections::HashMap;

const DEFAULT_PIXELS_PER_METER: f32 = 100.0;
const DEFAULT_CAMERA_HEIGHT: f32 = 10.0;

struct PendingTicket {
    session: SessionId,
    remaining_polls: u32,
}

/// Scripted in-process host. Sessions, subscriptions and surface hits are
/// driven by the caller; the view ray is a straight-down projection where one
/// screen pixel maps to `1 / pixels_per_meter` metres on the x/z plane.
pub struct SimulatedHost {
    supported: Vec<Capability>,
    refuse_sessions: bool,
    reject_subscriptions: bool,
    subscription_latency: u32,
    next_session: u64,
    next_ticket: u64,
    active_session: Option<SessionId>,
    tickets: HashMap<SubscriptionTicket, PendingTicket>,
    sources: HashMap<HitTestSource, SessionId>,
    subscription_requests: Vec<SessionId>,
    surface: Option<Mat4>,
    fail_queries: bool,
    queries: u64,
    tracking_suspended: bool,
    suspension_changes: u32,
    pixels_per_meter: f32,
    camera_height: f32,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            supported: vec![
                Capability::SurfaceHitTesting,
                Capability::OverlayUi,
                Capability::LightEstimation,
            ],
            refuse_sessions: false,
            reject_subscriptions: false,
            subscription_latency: 1,
            next_session: 1,
            next_ticket: 1,
            active_session: None,
            tickets: HashMap::new(),
            sources: HashMap::new(),
            subscription_requests: Vec::new(),
            surface: None,
            fail_queries: false,
            queries: 0,
            tracking_suspended: false,
            suspension_changes: 0,
            pixels_per_meter: DEFAULT_PIXELS_PER_METER,
            camera_height: DEFAULT_CAMERA_HEIGHT,
        }
    }

    pub fn with_capabilities(mut self, supported: Vec<Capability>) -> Self {
        self.supported = supported;
        self
    }

    /// Number of polls a subscription stays pending before it resolves.
    pub fn with_subscription_latency(mut self, polls: u32) -> Self {
        self.subscription_latency = polls;
        self
    }

    pub fn refusing_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    pub fn rejecting_subscriptions(mut self) -> Self {
        self.reject_subscriptions = true;
        self
    }

    pub fn with_pixels_per_meter(mut self, pixels_per_meter: f32) -> Self {
        self.pixels_per_meter = pixels_per_meter;
        self
    }

    pub fn set_surface(&mut self, hit: Option<Mat4>) {
        self.surface = hit;
    }

    pub fn set_surface_pose(&mut self, hit: Option<Pose>) {
        self.surface = hit.map(|pose| pose.to_matrix());
    }

    pub fn set_fail_queries(&mut self, fail: bool) {
        self.fail_queries = fail;
    }

    /// Ends the active session on the host side and returns its id so the
    /// caller can forward the end event.
    pub fn end_session(&mut self) -> Option<SessionId> {
        let ended = self.active_session.take()?;
        self.sources.retain(|_, session| *session != ended);
        Some(ended)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active_session
    }

    pub fn subscription_requests(&self) -> &[SessionId] {
        &self.subscription_requests
    }

    pub fn requests_for(&self, session: SessionId) -> usize {
        self.subscription_requests
            .iter()
            .filter(|requested| **requested == session)
            .count()
    }

    pub fn query_count(&self) -> u64 {
        self.queries
    }

    pub fn is_tracking_suspended(&self) -> bool {
        self.tracking_suspended
    }

    pub fn suspension_changes(&self) -> u32 {
        self.suspension_changes
    }

    /// Screen point that projects onto the given world x/z position.
    pub fn screen_point_for(&self, world: Vec3) -> [f32; 2] {
        [
            world.x * self.pixels_per_meter,
            world.z * self.pixels_per_meter,
        ]
    }
}

impl TrackingControl for SimulatedHost {
    fn set_tracking_suspended(&mut self, suspended: bool) {
        if self.tracking_suspended != suspended {
            self.tracking_suspended = suspended;
            self.suspension_changes += 1;
        }
    }
}

impl ArHost for SimulatedHost {
    fn label(&self) -> &'static str {
        "Simulated AR Host"
    }

    fn request_session(&mut self, request: &SessionRequest) -> HostResult<SessionGrant> {
        if self.refuse_sessions {
            return Err(HostError::SessionRefused(
                "immersive-ar not supported".to_string(),
            ));
        }

        let session = SessionId(self.next_session);
        self.next_session += 1;
        self.active_session = Some(session);

        let granted = request
            .required
            .iter()
            .chain(request.optional.iter())
            .copied()
            .filter(|capability| self.supported.contains(capability))
            .collect();
        Ok(SessionGrant { session, granted })
    }

    fn request_hit_test_source(&mut self, session: SessionId) -> HostResult<SubscriptionTicket> {
        if self.active_session != Some(session) {
            return Err(HostError::SessionInactive(session));
        }
        self.subscription_requests.push(session);
        if self.reject_subscriptions {
            return Err(HostError::SubscriptionRejected(
                "viewer space unavailable".to_string(),
            ));
        }

        let ticket = SubscriptionTicket(self.next_ticket);
        self.next_ticket += 1;
        self.tickets.insert(
            ticket,
            PendingTicket {
                session,
                remaining_polls: self.subscription_latency,
            },
        );
        Ok(ticket)
    }

    fn poll_hit_test_source(&mut self, ticket: SubscriptionTicket) -> SubscriptionPoll {
        let Some(pending) = self.tickets.get_mut(&ticket) else {
            return SubscriptionPoll::Failed(HostError::UnknownTicket(ticket));
        };
        if self.active_session != Some(pending.session) {
            let session = pending.session;
            self.tickets.remove(&ticket);
            return SubscriptionPoll::Failed(HostError::SessionInactive(session));
        }
        if pending.remaining_polls > 0 {
            pending.remaining_polls -= 1;
            return SubscriptionPoll::Pending;
        }

        let session = pending.session;
        self.tickets.remove(&ticket);
        let source = HitTestSource(ticket.0);
        self.sources.insert(source, session);
        SubscriptionPoll::Ready(source)
    }

    fn hit_test(&mut self, source: HitTestSource) -> HostResult<Option<Mat4>> {
        self.queries += 1;
        let Some(session) = self.sources.get(&source).copied() else {
            return Err(HostError::QueryFailed(format!(
                "hit-test source {} is not live",
                source.0
            )));
        };
        if self.active_session != Some(session) {
            return Err(HostError::SessionInactive(session));
        }
        if self.fail_queries {
            return Err(HostError::QueryFailed("tracking lost".to_string()));
        }
        Ok(self.surface)
    }

    fn view_ray(&self, screen: [f32; 2]) -> Option<Ray> {
        if self.pixels_per_meter <= 0.0 {
            return None;
        }
        Ray::new(
            Vec3::new(
                screen[0] / self.pixels_per_meter,
                self.camera_height,
                screen[1] / self.pixels_per_meter,
            ),
            Vec3::NEG_Y,
        )
    }
}
