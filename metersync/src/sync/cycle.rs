use chrono::{DateTime, Utc};

use metersync_core::connector::PeriodRequest;
use metersync_core::store::CycleCommit;
use metersync_core::{
    AccessToken, CycleOutcome, CycleReport, FetchFailure, Normalized, PeriodValues,
    PersistedState, PollPhase, StatisticPoint, SyncError, SyncWindow, accumulate, advance,
    advance_to_window_end, normalize_records, plan,
};

use super::reauth::ReauthCoordinator;
use super::scheduler::next_phase;
use crate::core::MeterSync;
use crate::session::SessionState;

/// Work of a cycle that is ready to be committed.
struct Staged {
    watermark: Option<DateTime<Utc>>,
    readings: usize,
    points: Vec<StatisticPoint>,
    dropped: Vec<SyncError>,
}

impl MeterSync {
    /// Run one sync cycle against the current time.
    ///
    /// # Errors
    /// Returns `CycleInProgress` if another cycle holds the session. Every
    /// other failure is reported as [`CycleOutcome::Failed`] in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one sync cycle as if the current time were `now`.
    ///
    /// Plans a window from the watermark, fetches it (reauthenticating once
    /// on access denied), normalizes the records, accumulates statistic
    /// points and commits points plus session state in one store call. The
    /// in-memory watermark and token change only after that commit succeeded;
    /// dropping the returned future before then leaves the session untouched.
    ///
    /// # Errors
    /// Returns `CycleInProgress` if another cycle holds the session.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "metersync::cycle",
            skip(self),
            fields(meter = %self.cfg.meter_id),
        )
    )]
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, SyncError> {
        let mut session = self
            .session
            .try_lock()
            .map_err(|_| SyncError::CycleInProgress {
                meter: self.cfg.meter_id.to_string(),
            })?;

        let before = session.watermark;
        let window = plan(before, &self.cfg, now);
        let mut report = CycleReport {
            meter_id: self.cfg.meter_id.clone(),
            window,
            watermark_before: before,
            watermark_after: before,
            reauthenticated: false,
            dropped: Vec::new(),
            phase: PollPhase::CatchingUp,
            outcome: CycleOutcome::UpToDate,
        };

        if !window.is_empty() {
            report.outcome = self.sync_window(&mut session, &window, &mut report).await;
        }

        session.last_window = Some(window);
        // A failed cycle did not cover its window; keep polling at the old pace.
        if report.outcome.is_success() {
            session.phase = next_phase(session.watermark, &window, now, self.cfg.timezone);
        }
        report.phase = session.phase;
        report.watermark_after = session.watermark;
        self.publish_status(&session);

        #[cfg(feature = "tracing")]
        match &report.outcome {
            CycleOutcome::Failed(e @ SyncError::Auth(_)) => {
                tracing::error!(error = %e, "sync cycle failed to authenticate");
            }
            CycleOutcome::Failed(e) => tracing::warn!(error = %e, "sync cycle failed"),
            outcome => tracing::debug!(?outcome, phase = ?report.phase, "sync cycle finished"),
        }

        Ok(report)
    }

    async fn sync_window(
        &self,
        session: &mut SessionState,
        window: &SyncWindow,
        report: &mut CycleReport,
    ) -> CycleOutcome {
        let Some(provider) = self.connector.as_period_values_provider() else {
            return CycleOutcome::Failed(SyncError::invalid_config(
                "connector does not provide period values",
            ));
        };
        let req = PeriodRequest::hourly_energy(self.cfg.meter_id.clone(), window, self.cfg.timezone);
        let fetched = ReauthCoordinator::new(self)
            .fetch(provider, session.token.clone(), &req)
            .await;
        report.reauthenticated = fetched.refreshed.is_some();

        let staged = match fetched.result {
            Ok(values) => self.stage(session.watermark, window, values).await,
            Err(e) => Err(e),
        };
        let staged = match staged {
            Ok(s) => s,
            Err(err) => {
                if let Some(token) = fetched.refreshed {
                    self.keep_token(session, token).await;
                }
                return CycleOutcome::Failed(err);
            }
        };
        report.dropped = staged.dropped;

        let token = fetched.refreshed.or_else(|| session.token.clone());
        let days_back = self.cfg.lookback_days;
        let dirty = staged.watermark != session.watermark
            || token != session.token
            || session.persisted_days_back != Some(days_back);
        if dirty {
            let commit = CycleCommit {
                state: PersistedState {
                    last_update: staged.watermark,
                    stored_token: token.clone(),
                    days_back,
                },
                metadata: self.metadata.clone(),
                points: staged.points.clone(),
            };
            if let Err(e) = self.store.commit(&self.cfg.meter_id, commit).await {
                // Keep a refreshed token in memory; the next commit persists it.
                if report.reauthenticated {
                    session.token = token;
                }
                return CycleOutcome::Failed(e);
            }
            session.watermark = staged.watermark;
            session.token = token;
            session.persisted_days_back = Some(days_back);
        }

        match staged.points.last() {
            Some(last) => CycleOutcome::Synced {
                readings: staged.readings,
                last_sum: last.sum,
            },
            None => CycleOutcome::NoNewData,
        }
    }

    /// Turn a successful response into the watermark and points to commit.
    async fn stage(
        &self,
        watermark: Option<DateTime<Utc>>,
        window: &SyncWindow,
        values: PeriodValues,
    ) -> Result<Staged, SyncError> {
        if !values.is_ok() {
            let message = format!("unexpected response status {:?}", values.status);
            return Err(SyncError::Fetch(FetchFailure::classify(values.status, message)));
        }
        let Normalized { readings, rejected } =
            normalize_records(&values.records, watermark, self.cfg.timezone);
        // Nothing new and nothing unreadable: the window is covered.
        if readings.is_empty() && rejected.is_empty() {
            if !values.records.is_empty() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    records = values.records.len(),
                    "window returned only already imported hours"
                );
            }
            let (watermark, _) = advance_to_window_end(watermark, window);
            return Ok(Staged {
                watermark,
                readings: 0,
                points: Vec::new(),
                dropped: Vec::new(),
            });
        }
        if readings.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                rejected = rejected.len(),
                "no readable records in window; watermark unchanged"
            );
        }

        let (next, _) = advance(watermark, &readings);
        let points = match readings.first() {
            Some(first) => {
                let seed = self.store.latest_sum(&self.metadata, first.timestamp).await?;
                accumulate(&readings, seed)
            }
            None => Vec::new(),
        };
        Ok(Staged {
            watermark: next,
            readings: readings.len(),
            points,
            dropped: rejected,
        })
    }

    /// Persist a token obtained by a cycle that failed afterwards, so the
    /// next cycle does not authenticate again.
    async fn keep_token(&self, session: &mut SessionState, token: AccessToken) {
        let mut state = session.to_persisted(self.cfg.lookback_days);
        state.stored_token = Some(token.clone());
        let commit = CycleCommit {
            state,
            metadata: self.metadata.clone(),
            points: Vec::new(),
        };
        match self.store.commit(&self.cfg.meter_id, commit).await {
            Ok(()) => {
                session.token = Some(token);
                session.persisted_days_back = Some(self.cfg.lookback_days);
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "could not persist refreshed token");
            }
        }
    }
}
