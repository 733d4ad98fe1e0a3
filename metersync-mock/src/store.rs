use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use metersync_core::store::{CycleCommit, SessionStore};
use metersync_core::{MeterId, PersistedState, StatisticMetadata, StatisticPoint, SyncError};

#[derive(Default)]
struct StoreState {
    sessions: HashMap<MeterId, PersistedState>,
    series: HashMap<String, BTreeMap<DateTime<Utc>, StatisticPoint>>,
    metadata: HashMap<String, StatisticMetadata>,
    commits: usize,
    fail_commits: bool,
}

/// In-memory [`SessionStore`].
///
/// Points are upserted by `start`, mirroring how long-term statistic stores
/// import external statistics. Commits can be forced to fail to exercise
/// error paths.
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<StoreState>,
}

impl MemorySessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the persisted state of `meter`.
    pub async fn seed_state(&self, meter: MeterId, state: PersistedState) {
        self.state.lock().await.sessions.insert(meter, state);
    }

    /// Seed existing points for a series.
    pub async fn seed_points(&self, metadata: &StatisticMetadata, points: Vec<StatisticPoint>) {
        let mut guard = self.state.lock().await;
        let series = guard
            .series
            .entry(metadata.statistic_id.clone())
            .or_default();
        for p in points {
            series.insert(p.start, p);
        }
    }

    /// Make every subsequent commit fail (or succeed again).
    pub async fn set_fail_commits(&self, fail: bool) {
        self.state.lock().await.fail_commits = fail;
    }

    /// Persisted state of `meter`, if any.
    pub async fn state(&self, meter: &MeterId) -> Option<PersistedState> {
        self.state.lock().await.sessions.get(meter).cloned()
    }

    /// All stored points of a series, ascending.
    pub async fn points(&self, statistic_id: &str) -> Vec<StatisticPoint> {
        self.state
            .lock()
            .await
            .series
            .get(statistic_id)
            .map(|s| s.values().copied().collect())
            .unwrap_or_default()
    }

    /// Metadata last committed for a series.
    pub async fn metadata(&self, statistic_id: &str) -> Option<StatisticMetadata> {
        self.state.lock().await.metadata.get(statistic_id).cloned()
    }

    /// Number of successful commits.
    pub async fn commits(&self) -> usize {
        self.state.lock().await.commits
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, meter: &MeterId) -> Result<Option<PersistedState>, SyncError> {
        Ok(self.state.lock().await.sessions.get(meter).cloned())
    }

    async fn latest_sum(
        &self,
        metadata: &StatisticMetadata,
        before: DateTime<Utc>,
    ) -> Result<Option<f64>, SyncError> {
        let guard = self.state.lock().await;
        Ok(guard
            .series
            .get(&metadata.statistic_id)
            .and_then(|s| s.range(..before).next_back())
            .map(|(_, p)| p.sum))
    }

    async fn commit(&self, meter: &MeterId, commit: CycleCommit) -> Result<(), SyncError> {
        let mut guard = self.state.lock().await;
        if guard.fail_commits {
            return Err(SyncError::store("commit rejected by test store"));
        }
        let id = commit.metadata.statistic_id.clone();
        let series = guard.series.entry(id.clone()).or_default();
        for p in commit.points {
            series.insert(p.start, p);
        }
        guard.metadata.insert(id, commit.metadata);
        guard.sessions.insert(meter.clone(), commit.state);
        guard.commits += 1;
        Ok(())
    }
}
