use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{MeterId, PersistedState, StatisticMetadata, StatisticPoint, SyncError};

/// Everything a successful cycle publishes, handed to the store in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleCommit {
    /// Session state to persist (watermark, token, lookback).
    pub state: PersistedState,
    /// Series the points belong to.
    pub metadata: StatisticMetadata,
    /// New statistic points, ascending by `start`. May be empty when only the
    /// watermark or token changed.
    pub points: Vec<StatisticPoint>,
}

/// Persistence collaborator for session state and long-term statistics.
///
/// Implementations must apply [`SessionStore::commit`] atomically: either the
/// points and the persisted state are both stored, or neither is. Points with
/// a `start` that is already stored replace the stored point.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted state of `meter`, if any.
    async fn load(&self, meter: &MeterId) -> Result<Option<PersistedState>, SyncError>;

    /// Cumulative sum of the latest stored point of the series that starts
    /// strictly before `before`, if any.
    async fn latest_sum(
        &self,
        metadata: &StatisticMetadata,
        before: DateTime<Utc>,
    ) -> Result<Option<f64>, SyncError>;

    /// Atomically store points and session state for `meter`.
    async fn commit(&self, meter: &MeterId, commit: CycleCommit) -> Result<(), SyncError>;
}
