use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use metersync_core::{CycleReport, MeterId, SyncConfig, SyncError, SyncStatus, WatermarkPolicy};

use crate::core::MeterSync;
use crate::sync::poller::{SyncHandle, spawn};

struct Entry {
    sync: Arc<MeterSync>,
    handle: SyncHandle,
}

/// Owns the sessions and pollers of every configured meter.
///
/// Sessions are independent: each has its own watermark, token and poller,
/// and a failure in one never affects another.
#[derive(Default)]
pub struct MeterRegistry {
    entries: BTreeMap<MeterId, Entry>,
}

impl MeterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and start polling it.
    ///
    /// # Errors
    /// Returns `DuplicateMeter` if a session for the same meter is registered.
    pub fn insert(&mut self, sync: MeterSync) -> Result<Arc<MeterSync>, SyncError> {
        let id = sync.config().meter_id.clone();
        if self.entries.contains_key(&id) {
            return Err(SyncError::DuplicateMeter {
                meter: id.to_string(),
            });
        }
        let sync = Arc::new(sync);
        let handle = spawn(Arc::clone(&sync));
        self.entries.insert(
            id,
            Entry {
                sync: Arc::clone(&sync),
                handle,
            },
        );
        Ok(sync)
    }

    /// Stop and remove a session. Returns `false` if it was not registered.
    pub async fn remove(&mut self, id: &MeterId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                entry.handle.stop().await;
                true
            }
            None => false,
        }
    }

    /// Session registered for `id`.
    #[must_use]
    pub fn get(&self, id: &MeterId) -> Option<Arc<MeterSync>> {
        self.entries.get(id).map(|e| Arc::clone(&e.sync))
    }

    /// Whether a session is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &MeterId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status of every session, ordered by meter id.
    #[must_use]
    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.entries.values().map(|e| e.sync.status()).collect()
    }

    /// Run a cycle for `id` right away, outside the poll cadence.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an unknown meter and `CycleInProgress` if
    /// the poller is running a cycle for it at the moment.
    pub async fn run_cycle_now(&self, id: &MeterId) -> Result<CycleReport, SyncError> {
        let sync = self
            .get(id)
            .ok_or_else(|| SyncError::invalid_config(format!("no session for meter {id}")))?;
        sync.run_cycle().await
    }

    /// Replace the session of `id` with one built from `cfg`.
    ///
    /// The old poller is stopped first. If the new session cannot be built the
    /// old one is polled again and the error is returned.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an unknown meter or an invalid
    /// configuration, `DuplicateMeter` if `cfg` names a different meter that is
    /// already registered, and any error of [`MeterSync::reconfigure`].
    pub async fn reconfigure(
        &mut self,
        id: &MeterId,
        cfg: SyncConfig,
        policy: WatermarkPolicy,
    ) -> Result<Arc<MeterSync>, SyncError> {
        if cfg.meter_id != *id && self.entries.contains_key(&cfg.meter_id) {
            return Err(SyncError::DuplicateMeter {
                meter: cfg.meter_id.to_string(),
            });
        }
        let Entry { sync: old, handle } = self
            .entries
            .remove(id)
            .ok_or_else(|| SyncError::invalid_config(format!("no session for meter {id}")))?;
        handle.stop().await;

        match old.reconfigure(cfg, policy).await {
            Ok(next) => {
                let next = Arc::new(next);
                let handle = spawn(Arc::clone(&next));
                self.entries.insert(
                    next.config().meter_id.clone(),
                    Entry {
                        sync: Arc::clone(&next),
                        handle,
                    },
                );
                Ok(next)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(meter = %id, error = %e, "reconfigure failed; keeping the old session");
                let handle = spawn(Arc::clone(&old));
                self.entries.insert(id.clone(), Entry { sync: old, handle });
                Err(e)
            }
        }
    }

    /// Stop every poller and wait for all sessions to log out.
    pub async fn shutdown(self) {
        join_all(self.entries.into_values().map(|e| e.handle.stop())).await;
    }
}
