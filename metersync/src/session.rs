use chrono::{DateTime, Utc};

use metersync_core::{AccessToken, PersistedState, PollPhase, SyncWindow};

/// Mutable state of one meter session.
///
/// Owned by the cycle: it is only mutated while the session guard is held and
/// only after the store accepted the cycle's commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Most recent hour successfully processed.
    pub watermark: Option<DateTime<Utc>>,
    /// Token used for the next fetch; `None` forces an authentication first.
    pub token: Option<AccessToken>,
    /// Current poll phase.
    pub phase: PollPhase,
    /// Window planned by the most recent cycle.
    pub last_window: Option<SyncWindow>,
    /// Lookback recorded in the store, if it was loaded from there.
    pub persisted_days_back: Option<u32>,
}

impl SessionState {
    /// Restore a session from persisted state. The phase starts out as
    /// catching up until the first cycle has looked at the frontier.
    #[must_use]
    pub fn restore(persisted: Option<PersistedState>) -> Self {
        let Some(p) = persisted else {
            return Self::default();
        };
        Self {
            watermark: p.last_update,
            token: p.stored_token,
            phase: PollPhase::CatchingUp,
            last_window: None,
            persisted_days_back: Some(p.days_back),
        }
    }

    /// Snapshot to hand to the store.
    #[must_use]
    pub fn to_persisted(&self, days_back: u32) -> PersistedState {
        PersistedState {
            last_update: self.watermark,
            stored_token: self.token.clone(),
            days_back,
        }
    }
}
