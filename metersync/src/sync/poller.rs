//! Background polling of one session.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use super::backoff::jitter_wait;
use super::scheduler::{PollScheduler, SchedulerAction, SchedulerEvent};
use crate::core::MeterSync;

/// Handle to a running poller.
///
/// Dropping the handle requests a stop and aborts the task if it is still
/// running; use [`SyncHandle::stop`] for an orderly shutdown that waits for
/// the logout.
pub struct SyncHandle {
    join: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl SyncHandle {
    /// Whether the poller task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop polling, cancel an in-flight cycle and wait until the session has
    /// logged out.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(join) = self.join.take()
            && !join.is_finished()
        {
            join.abort();
        }
    }
}

/// Drive `sync` from a background task.
///
/// The first cycle runs immediately. Afterwards the poller waits one minute
/// while catching up and two hours once steady (see [`PollConfig`]), stretched
/// by the configured jitter. Cycle failures never end the poller.
///
/// Must be called from within a tokio runtime.
///
/// [`PollConfig`]: metersync_core::PollConfig
#[must_use]
pub fn spawn(sync: Arc<MeterSync>) -> SyncHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let join = tokio::spawn(run(sync, stop_rx));
    SyncHandle {
        join: Some(join),
        stop_tx: Some(stop_tx),
    }
}

/// Resolves once a stop was requested or every sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(t) => t.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn run(sync: Arc<MeterSync>, mut stop: watch::Receiver<bool>) {
    let poll = *sync.poll_config();
    let mut scheduler = PollScheduler::new(poll, sync.status().phase);
    let mut pending = VecDeque::from([SchedulerEvent::Tick]);
    let mut timer: Option<Pin<Box<Sleep>>> = None;

    #[cfg(feature = "tracing")]
    tracing::debug!(meter = %sync.config().meter_id, "poller started");

    loop {
        let event = match pending.pop_front() {
            Some(event) => event,
            None => tokio::select! {
                biased;
                () = stop_requested(&mut stop) => SchedulerEvent::Shutdown,
                () = fire(&mut timer) => {
                    timer = None;
                    SchedulerEvent::Tick
                }
            },
        };

        let (next, actions) = scheduler.handle(event);
        scheduler = next;
        for action in actions {
            match action {
                SchedulerAction::RunCycle => {
                    let done = tokio::select! {
                        biased;
                        () = stop_requested(&mut stop) => SchedulerEvent::Shutdown,
                        res = sync.run_cycle() => match res {
                            Ok(report) => SchedulerEvent::CycleFinished { phase: report.phase },
                            Err(_e) => {
                                #[cfg(feature = "tracing")]
                                tracing::debug!(error = %_e, "cycle skipped");
                                SchedulerEvent::CycleRejected
                            }
                        },
                    };
                    pending.push_back(done);
                }
                SchedulerAction::ScheduleTick { delay } => {
                    let delay = jitter_wait(delay, poll.jitter_percent);
                    let at = TimeDelta::from_std(delay)
                        .ok()
                        .and_then(|d| Utc::now().checked_add_signed(d));
                    sync.set_next_poll(at);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        meter = %sync.config().meter_id,
                        phase = ?scheduler.phase(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "next poll scheduled"
                    );
                    timer = Some(Box::pin(tokio::time::sleep(delay)));
                }
                SchedulerAction::Stop => {
                    sync.set_next_poll(None);
                    sync.logout().await;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(meter = %sync.config().meter_id, "poller stopped");
                    return;
                }
            }
        }
    }
}
