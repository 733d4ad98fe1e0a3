//! Poll scheduling as a pure state machine.
//!
//! The poller feeds events in and executes the returned actions; all timing
//! decisions live here so they can be tested without a runtime.

use std::time::Duration;

use chrono::{DateTime, Utc};

use metersync_core::{PollConfig, PollPhase, SyncWindow, Tz, reaches_frontier};

/// Phase to use after a successful cycle that planned `window` at `now`.
///
/// Catching up while no watermark exists or while the window stopped short of
/// the most recent complete hour; steady otherwise.
#[must_use]
pub fn next_phase(
    watermark: Option<DateTime<Utc>>,
    window: &SyncWindow,
    now: DateTime<Utc>,
    tz: Tz,
) -> PollPhase {
    if watermark.is_some() && reaches_frontier(window, now, tz) {
        PollPhase::Steady
    } else {
        PollPhase::CatchingUp
    }
}

/// Inputs to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The poll timer fired (or the poller just started).
    Tick,
    /// A cycle completed; `phase` is the phase it computed.
    CycleFinished {
        /// Phase computed by the cycle.
        phase: PollPhase,
    },
    /// A cycle could not start because another one holds the session.
    CycleRejected,
    /// The session is being torn down.
    Shutdown,
}

/// Work the poller must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Run one sync cycle now.
    RunCycle,
    /// Arm the poll timer.
    ScheduleTick {
        /// Base delay before jitter.
        delay: Duration,
    },
    /// Stop polling and log out.
    Stop,
}

/// Poll scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollScheduler {
    cfg: PollConfig,
    phase: PollPhase,
    in_flight: bool,
    stopped: bool,
}

impl PollScheduler {
    /// Scheduler starting in `phase`.
    #[must_use]
    pub const fn new(cfg: PollConfig, phase: PollPhase) -> Self {
        Self {
            cfg,
            phase,
            in_flight: false,
            stopped: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Whether a cycle is running.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the scheduler has shut down.
    #[must_use]
    pub const fn stopped(&self) -> bool {
        self.stopped
    }

    /// Apply `event`, returning the next state and the actions to perform.
    #[must_use]
    pub fn handle(mut self, event: SchedulerEvent) -> (Self, Vec<SchedulerAction>) {
        if self.stopped {
            return (self, Vec::new());
        }
        let actions = match event {
            SchedulerEvent::Shutdown => {
                self.stopped = true;
                vec![SchedulerAction::Stop]
            }
            SchedulerEvent::Tick if self.in_flight => Vec::new(),
            SchedulerEvent::Tick => {
                self.in_flight = true;
                vec![SchedulerAction::RunCycle]
            }
            SchedulerEvent::CycleFinished { phase } => {
                self.in_flight = false;
                self.phase = phase;
                vec![SchedulerAction::ScheduleTick {
                    delay: phase.interval(&self.cfg),
                }]
            }
            // A manual cycle holds the session; look again shortly.
            SchedulerEvent::CycleRejected => {
                self.in_flight = false;
                vec![SchedulerAction::ScheduleTick {
                    delay: self.cfg.catch_up_interval,
                }]
            }
        };
        (self, actions)
    }
}
