use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};

use metersync_core::connector::{Authenticator, MeterConnector};
use metersync_core::store::{CycleCommit, SessionStore};
use metersync_core::{
    AuthError, PersistedState, PollConfig, StatisticMetadata, SyncConfig, SyncError, SyncStatus,
    WatermarkPolicy,
};

use crate::session::SessionState;

/// One meter's sync session.
///
/// Owns the collaborators, the immutable configuration and the mutable
/// [`SessionState`]. Cycles are serialized by a session guard; see
/// [`MeterSync::run_cycle`].
pub struct MeterSync {
    pub(crate) connector: Arc<dyn MeterConnector>,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) cfg: SyncConfig,
    pub(crate) poll: PollConfig,
    pub(crate) metadata: StatisticMetadata,
    pub(crate) session: Mutex<SessionState>,
    pub(crate) status: watch::Sender<SyncStatus>,
}

impl std::fmt::Debug for MeterSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterSync")
            .field("connector", &self.connector.name())
            .field("meter_id", &self.cfg.meter_id)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`MeterSync`] session.
pub struct MeterSyncBuilder {
    connector: Option<Arc<dyn MeterConnector>>,
    store: Option<Arc<dyn SessionStore>>,
    cfg: Option<SyncConfig>,
    poll: PollConfig,
    persisted: Option<PersistedState>,
}

impl Default for MeterSyncBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterSyncBuilder {
    /// Create a new builder with default poll cadence and no collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connector: None,
            store: None,
            cfg: None,
            poll: PollConfig::default(),
            persisted: None,
        }
    }

    /// Register the metering API connector.
    ///
    /// The connector must advertise both period values and authentication.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn MeterConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Register the persistence collaborator.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the per-meter configuration.
    #[must_use]
    pub fn config(mut self, cfg: SyncConfig) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Replace the whole poll configuration.
    #[must_use]
    pub const fn poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Delay between cycles while catching up.
    #[must_use]
    pub const fn catch_up_interval(mut self, interval: Duration) -> Self {
        self.poll.catch_up_interval = interval;
        self
    }

    /// Delay between cycles once caught up.
    #[must_use]
    pub const fn steady_interval(mut self, interval: Duration) -> Self {
        self.poll.steady_interval = interval;
        self
    }

    /// Random jitter percentage applied to each poll delay.
    ///
    /// Spreads wake-ups of many meters sharing one upstream at the cost of
    /// less predictable poll times.
    #[must_use]
    pub const fn jitter_percent(mut self, pct: u8) -> Self {
        self.poll.jitter_percent = pct;
        self
    }

    /// Start from an already loaded persisted state instead of an empty session.
    #[must_use]
    pub fn persisted_state(mut self, state: PersistedState) -> Self {
        self.persisted = Some(state);
        self
    }

    fn validate(&self) -> Result<(), SyncError> {
        let connector = self.connector.as_ref().ok_or_else(|| {
            SyncError::invalid_config("no connector registered; add one via with_connector(...)")
        })?;
        if connector.as_period_values_provider().is_none() {
            return Err(SyncError::invalid_config(format!(
                "connector {} does not provide period values",
                connector.name()
            )));
        }
        if connector.as_authenticator().is_none() {
            return Err(SyncError::invalid_config(format!(
                "connector {} does not provide authentication",
                connector.name()
            )));
        }
        if self.store.is_none() {
            return Err(SyncError::invalid_config(
                "no session store registered; add one via with_store(...)",
            ));
        }
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SyncError::invalid_config("no sync configuration; set one via config(...)"))?;
        if cfg.lookback_days == 0 {
            return Err(SyncError::invalid_config("lookback_days must be at least 1"));
        }
        if cfg.credentials.username.trim().is_empty() {
            return Err(SyncError::invalid_config("username must not be empty"));
        }
        if cfg.fetch_timeout.is_zero() {
            return Err(SyncError::invalid_config("fetch_timeout must be non-zero"));
        }
        if self.poll.catch_up_interval.is_zero() || self.poll.steady_interval.is_zero() {
            return Err(SyncError::invalid_config("poll intervals must be non-zero"));
        }
        if self.poll.jitter_percent > 100 {
            return Err(SyncError::invalid_config("jitter_percent must be within 0..=100"));
        }
        Ok(())
    }

    /// Build the session.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when a collaborator or the configuration is
    /// missing, the connector lacks a required capability, the lookback is 0,
    /// the username is empty, or a timeout or interval is zero.
    pub fn build(self) -> Result<MeterSync, SyncError> {
        self.validate()?;
        let (Some(connector), Some(store), Some(cfg)) = (self.connector, self.store, self.cfg) else {
            return Err(SyncError::invalid_config("incomplete builder"));
        };
        let session = SessionState::restore(self.persisted);
        let metadata = StatisticMetadata::for_meter(&cfg.meter_id, &cfg.alias);
        let (status, _) = watch::channel(SyncStatus {
            meter_id: cfg.meter_id.clone(),
            alias: cfg.alias.clone(),
            days_back: cfg.lookback_days,
            last_update: session.watermark,
            phase: session.phase,
            next_poll: None,
        });
        Ok(MeterSync {
            connector,
            store,
            cfg,
            poll: self.poll,
            metadata,
            session: Mutex::new(session),
            status,
        })
    }

    /// Restore the persisted state from the store, then build the session.
    ///
    /// # Errors
    /// Returns the same errors as [`MeterSyncBuilder::build`], or the store's
    /// error if loading fails.
    pub async fn load(mut self) -> Result<MeterSync, SyncError> {
        self.validate()?;
        if let (Some(store), Some(cfg)) = (&self.store, &self.cfg) {
            self.persisted = store.load(&cfg.meter_id).await?;
        }
        self.build()
    }
}

/// Bound a collaborator future with a timeout, mapping expiry through `on_timeout`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "metersync::core::call_with_timeout",
        level = "debug",
        skip(operation, timeout, fut, on_timeout),
        fields(
            operation = operation,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        ),
    )
)]
pub(crate) async fn call_with_timeout<T, E, Fut>(
    operation: &'static str,
    timeout: Duration,
    fut: Fut,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    (tokio::time::timeout(timeout, fut).await).unwrap_or_else(|_| Err(on_timeout()))
}

impl MeterSync {
    /// Start building a new session.
    ///
    /// ```rust,ignore
    /// let sync = metersync::MeterSync::builder()
    ///     .with_connector(connector)
    ///     .with_store(store)
    ///     .config(cfg)
    ///     .steady_interval(std::time::Duration::from_secs(3600))
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> MeterSyncBuilder {
        MeterSyncBuilder::new()
    }

    /// Immutable configuration of this session.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.cfg
    }

    /// Poll cadence of this session.
    #[must_use]
    pub const fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Metadata of the statistic series this session publishes to.
    #[must_use]
    pub const fn metadata(&self) -> &StatisticMetadata {
        &self.metadata
    }

    /// Current host-visible status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes; a new value is published after every cycle.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Copy of the session state. Waits for an in-flight cycle to finish.
    pub async fn session_snapshot(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    pub(crate) fn authenticator(&self) -> Result<&dyn Authenticator, SyncError> {
        self.connector.as_authenticator().ok_or_else(|| {
            SyncError::invalid_config(format!(
                "connector {} does not provide authentication",
                self.connector.name()
            ))
        })
    }

    pub(crate) fn publish_status(&self, session: &SessionState) {
        self.status.send_modify(|s| {
            s.last_update = session.watermark;
            s.phase = session.phase;
        });
    }

    pub(crate) fn set_next_poll(&self, next_poll: Option<DateTime<Utc>>) {
        self.status.send_modify(|s| s.next_poll = next_poll);
    }

    /// Invalidate the session token with the upstream, best-effort.
    ///
    /// Waits for an in-flight cycle, then forgets the token in memory so the
    /// next cycle authenticates again.
    pub async fn logout(&self) {
        let mut session = self.session.lock().await;
        let Some(token) = session.token.take() else {
            return;
        };
        let Ok(auth) = self.authenticator() else {
            return;
        };
        let res = call_with_timeout("logout", self.cfg.fetch_timeout, auth.logout(&token), || {
            AuthError::Timeout
        })
        .await;
        #[cfg(feature = "tracing")]
        if let Err(e) = &res {
            tracing::warn!(meter = %self.cfg.meter_id, error = %e, "logout failed");
        }
        let _ = res;
    }

    /// Build a replacement session from a new configuration.
    ///
    /// Credentials are verified by authenticating once. With
    /// [`WatermarkPolicy::Carry`] the new session continues from this session's
    /// watermark; with [`WatermarkPolicy::Reset`] it re-plans from its lookback.
    /// The new state is committed to the store before it is returned.
    ///
    /// Stop this session's poller first; a cycle of the old session running
    /// after the commit would overwrite the new state.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an invalid configuration or when carrying a
    /// watermark to a different meter, `Auth` when the credentials are
    /// rejected, or the store's error if the commit fails.
    pub async fn reconfigure(
        &self,
        cfg: SyncConfig,
        policy: WatermarkPolicy,
    ) -> Result<Self, SyncError> {
        if policy == WatermarkPolicy::Carry && cfg.meter_id != self.cfg.meter_id {
            return Err(SyncError::invalid_config(format!(
                "cannot carry the watermark of meter {} to meter {}",
                self.cfg.meter_id, cfg.meter_id
            )));
        }
        let mut next = Self::builder()
            .with_connector(Arc::clone(&self.connector))
            .with_store(Arc::clone(&self.store))
            .config(cfg)
            .poll_config(self.poll)
            .build()?;

        let auth = next.authenticator()?;
        let token = call_with_timeout(
            "authenticate",
            next.cfg.fetch_timeout,
            auth.authenticate(&next.cfg.credentials),
            || AuthError::Timeout,
        )
        .await?;

        let watermark = match policy {
            WatermarkPolicy::Reset => None,
            _ => self.session.lock().await.watermark,
        };
        let state = PersistedState {
            last_update: watermark,
            stored_token: Some(token),
            days_back: next.cfg.lookback_days,
        };
        next.store
            .commit(
                &next.cfg.meter_id,
                CycleCommit {
                    state: state.clone(),
                    metadata: next.metadata.clone(),
                    points: Vec::new(),
                },
            )
            .await?;

        *next.session.get_mut() = SessionState::restore(Some(state));
        let restored = next.session.get_mut().clone();
        next.publish_status(&restored);
        #[cfg(feature = "tracing")]
        tracing::info!(meter = %next.cfg.meter_id, ?policy, "session reconfigured");
        Ok(next)
    }
}
