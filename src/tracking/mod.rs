//! Per-frame surface anchor derived from the host's hit-test stream.

use crate::host::{ArHost, HitTestSource, SessionId, SubscriptionPoll, SubscriptionTicket};
use crate::spatial::Pose;

/// Hit-test subscription lifecycle, keyed by the session that owns it so a
/// late end event from an old session can never clobber a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Pending {
        session: SessionId,
        ticket: SubscriptionTicket,
    },
    Active {
        session: SessionId,
        source: HitTestSource,
    },
    /// Subscription was refused for this session; hit testing stays inert
    /// until a different session starts.
    Failed { session: SessionId },
}

impl SubscriptionState {
    pub fn session(&self) -> Option<SessionId> {
        match *self {
            SubscriptionState::Unsubscribed => None,
            SubscriptionState::Pending { session, .. }
            | SubscriptionState::Active { session, .. }
            | SubscriptionState::Failed { session } => Some(session),
        }
    }
}

#[derive(Debug)]
pub struct SurfaceTracker {
    state: SubscriptionState,
    anchor: Option<Pose>,
}

impl Default for SurfaceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTracker {
    pub fn new() -> Self {
        Self {
            state: SubscriptionState::Unsubscribed,
            anchor: None,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn current_anchor(&self) -> Option<Pose> {
        self.anchor
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor.is_some()
    }

    /// Advances the subscription and, once active, runs this frame's query.
    pub fn refresh<H: ArHost + ?Sized>(&mut self, host: &mut H, session: SessionId) {
        if let Some(owner) = self.state.session() {
            if owner != session {
                log::debug!("[tracker] discarding stale subscription from {owner}");
                self.state = SubscriptionState::Unsubscribed;
                self.anchor = None;
            }
        }

        match self.state {
            SubscriptionState::Unsubscribed => self.subscribe(host, session),
            SubscriptionState::Pending { ticket, .. } => self.poll(host, session, ticket),
            SubscriptionState::Active { .. } | SubscriptionState::Failed { .. } => {}
        }

        match self.state {
            SubscriptionState::Active { source, .. } => self.query(host, source),
            _ => self.anchor = None,
        }
    }

    /// Session-scoped reset. Events for sessions other than the one that owns
    /// the current state are ignored, so repeated or late deliveries are safe.
    pub fn end_session(&mut self, session: SessionId) {
        if self.state.session() == Some(session) {
            log::info!("[tracker] {session} ended; hit testing unsubscribed");
            self.state = SubscriptionState::Unsubscribed;
            self.anchor = None;
        } else {
            log::debug!("[tracker] ignoring end event for {session}");
        }
    }

    fn subscribe<H: ArHost + ?Sized>(&mut self, host: &mut H, session: SessionId) {
        match host.request_hit_test_source(session) {
            Ok(ticket) => {
                log::debug!("[tracker] requested hit-test source for {session}");
                self.state = SubscriptionState::Pending { session, ticket };
                self.poll(host, session, ticket);
            }
            Err(err) => {
                log::warn!("[tracker] hit testing unavailable for {session}: {err}");
                self.state = SubscriptionState::Failed { session };
            }
        }
    }

    fn poll<H: ArHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: SessionId,
        ticket: SubscriptionTicket,
    ) {
        match host.poll_hit_test_source(ticket) {
            SubscriptionPoll::Pending => {}
            SubscriptionPoll::Ready(source) => {
                log::info!("[tracker] hit-test source active for {session}");
                self.state = SubscriptionState::Active { session, source };
            }
            SubscriptionPoll::Failed(err) => {
                log::warn!("[tracker] hit-test subscription failed for {session}: {err}");
                self.state = SubscriptionState::Failed { session };
            }
        }
    }

    fn query<H: ArHost + ?Sized>(&mut self, host: &mut H, source: HitTestSource) {
        self.anchor = match host.hit_test(source) {
            Ok(Some(matrix)) => Some(Pose::from_matrix(&matrix)),
            Ok(None) => None,
            Err(err) => {
                log::debug!("[tracker] hit-test query failed: {err}");
                None
            }
        };
    }
}
