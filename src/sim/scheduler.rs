//! 调度器状态机：`Idle`、`SteppingManually`（瞬态）与 `Running`。
//!
//! 连续运行时每次只挂起一个待发生迁移 [`PendingFiring`]，由调用方推进逻辑时钟触发。
//! `pause` / `cancel` 同步丢弃挂起项并递增代号，旧代号的挂起项永远不会发生。
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::net::firing::{FireError, FireOutcome};
use crate::net::ids::TransitionId;
use crate::net::model::Net;
use crate::sim::clock::{Clock, LogicalClock, SimTime, TimerToken};
use crate::sim::delay::firing_delay;
use crate::sim::history::{HistoryEntry, MarkingHistory};
use crate::sim::policy::SelectionPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    SteppingManually,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingFiring {
    pub transition: TransitionId,
    pub due: SimTime,
    pub token: TimerToken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Scheduled {
        transition: TransitionId,
        due: SimTime,
    },
    Fired {
        time: SimTime,
        outcome: FireOutcome,
    },
    /// A pending firing was no longer enabled when its time came.
    FireRejected {
        time: SimTime,
        transition: TransitionId,
        reason: FireError,
    },
    /// Manual step or run start on a net with nothing enabled and no transitions.
    NothingEnabled { time: SimTime },
    Deadlock { time: SimTime },
    ZeroTimeLimit { time: SimTime, firings: usize },
}

impl SimEvent {
    pub fn fired(&self) -> Option<TransitionId> {
        match self {
            SimEvent::Fired { outcome, .. } => Some(outcome.transition),
            _ => None,
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::Scheduled { transition, due } => {
                write!(f, "scheduled {} at t={:.3}", transition, due)
            }
            SimEvent::Fired { time, outcome } => {
                write!(f, "t={:.3} fired {}", time, outcome.transition)?;
                for change in &outcome.changes {
                    write!(f, " {}:{}->{}", change.place, change.before, change.after)?;
                }
                if !outcome.clamped.is_empty() {
                    write!(f, " (clamped)")?;
                }
                Ok(())
            }
            SimEvent::FireRejected {
                time,
                transition,
                reason,
            } => write!(f, "t={:.3} rejected {}: {}", time, transition, reason),
            SimEvent::NothingEnabled { time } => write!(f, "t={:.3} nothing enabled", time),
            SimEvent::Deadlock { time } => write!(f, "t={:.3} deadlock", time),
            SimEvent::ZeroTimeLimit { time, firings } => write!(
                f,
                "t={:.3} stopped after {} firings without time advancing",
                time, firings
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("the scheduler is running; pause it before stepping manually")]
    Busy,
}

pub struct Scheduler<C: Clock = LogicalClock> {
    config: SimulationConfig,
    state: SchedulerState,
    clock: C,
    rng: StdRng,
    pending: Option<PendingFiring>,
    generation: TimerToken,
    /// Consecutive firings that did not advance the clock.
    zero_time_streak: usize,
    firings: usize,
    history: MarkingHistory,
}

impl Scheduler<LogicalClock> {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_clock(config, LogicalClock::new())
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(config: SimulationConfig, clock: C) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let history = MarkingHistory::new(config.history_limit);
        Self {
            config,
            state: SchedulerState::Idle,
            clock,
            rng,
            pending: None,
            generation: TimerToken::default(),
            zero_time_streak: 0,
            firings: 0,
            history,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn pending(&self) -> Option<PendingFiring> {
        self.pending
    }

    /// Whether a firing stamped with `token` could still happen.
    pub fn is_current(&self, token: TimerToken) -> bool {
        token == self.generation && self.pending.is_some_and(|p| p.token == token)
    }

    pub fn firings(&self) -> usize {
        self.firings
    }

    pub fn history(&self) -> &MarkingHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut MarkingHistory {
        &mut self.history
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.config.policy
    }

    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.config.policy = policy;
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// `Idle → Running`. Arms the first pending firing; no-op while running.
    pub fn play(&mut self, net: &Net) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.state == SchedulerState::Running {
            return events;
        }
        log::info!(
            "simulation started at t={} (policy {})",
            self.clock.now(),
            self.config.policy
        );
        self.state = SchedulerState::Running;
        self.zero_time_streak = 0;
        self.schedule_next(net, &mut events);
        events
    }

    /// `Running → Idle`. Drops the pending firing; applied firings stay.
    pub fn pause(&mut self) {
        self.generation = self.generation.next();
        if let Some(pending) = self.pending.take() {
            log::debug!(
                "dropped pending firing of {} due at {}",
                pending.transition,
                pending.due
            );
        }
        if self.state == SchedulerState::Running {
            log::info!(
                "simulation paused at t={} after {} firings",
                self.clock.now(),
                self.firings
            );
        }
        self.state = SchedulerState::Idle;
    }

    /// Pause and rewind the clock to zero. The marking is left as is.
    pub fn cancel(&mut self) {
        self.pause();
        self.clock.reset();
        self.zero_time_streak = 0;
        log::info!("simulation cancelled");
    }

    /// Fires exactly one transition chosen by the policy. A timed transition
    /// still moves the clock forward by its sampled delay.
    pub fn step(&mut self, net: &mut Net) -> Result<SimEvent, SchedulerError> {
        if self.state == SchedulerState::Running {
            return Err(SchedulerError::Busy);
        }
        self.state = SchedulerState::SteppingManually;
        let enabled = net.enabled_transitions();
        let event = match self.config.policy.select(net, &enabled, &mut self.rng) {
            Some(transition) => {
                let due = self.clock.now() + self.delay_of(net, transition);
                self.clock.advance_to(due);
                self.fire(net, transition)
            }
            None => {
                log::info!("step: no transition is enabled");
                SimEvent::NothingEnabled {
                    time: self.clock.now(),
                }
            }
        };
        self.state = SchedulerState::Idle;
        Ok(event)
    }

    /// Processes every pending firing due at or before `until`, then moves the
    /// clock to `until` if the run is still going.
    pub fn advance_to(&mut self, net: &mut Net, until: SimTime) -> Vec<SimEvent> {
        let mut events = Vec::new();
        while self.state == SchedulerState::Running {
            match self.pending {
                Some(pending) if pending.due <= until => self.fire_pending(net, &mut events),
                _ => break,
            }
        }
        if self.state == SchedulerState::Running {
            self.clock.advance_to(until);
        }
        events
    }

    /// Runs event to event until deadlock, pause or `max_firings` firings.
    /// Starts the run if the scheduler is idle.
    pub fn run(&mut self, net: &mut Net, max_firings: usize) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.state != SchedulerState::Running {
            events.extend(self.play(net));
        }
        let start = self.firings;
        while self.state == SchedulerState::Running && self.firings - start < max_firings {
            self.fire_pending(net, &mut events);
        }
        events
    }

    fn fire_pending(&mut self, net: &mut Net, events: &mut Vec<SimEvent>) {
        let Some(pending) = self.pending.take() else {
            self.state = SchedulerState::Idle;
            return;
        };
        if pending.token != self.generation {
            log::debug!("discarding stale firing of {}", pending.transition);
            self.schedule_next(net, events);
            return;
        }

        let zero_time = pending.due <= self.clock.now();
        let limit = self.config.max_zero_time_firings;
        if zero_time && limit > 0 && self.zero_time_streak >= limit {
            log::warn!(
                "{} consecutive firings at t={} without time advancing, stopping",
                self.zero_time_streak,
                self.clock.now()
            );
            events.push(SimEvent::ZeroTimeLimit {
                time: self.clock.now(),
                firings: self.zero_time_streak,
            });
            self.pause();
            return;
        }

        self.clock.advance_to(pending.due);
        let event = self.fire(net, pending.transition);
        if event.fired().is_some() {
            self.zero_time_streak = if zero_time {
                self.zero_time_streak + 1
            } else {
                0
            };
        }
        events.push(event);
        self.schedule_next(net, events);
    }

    fn schedule_next(&mut self, net: &Net, events: &mut Vec<SimEvent>) {
        let enabled = net.enabled_transitions();
        let Some(transition) = self.config.policy.select(net, &enabled, &mut self.rng) else {
            let time = self.clock.now();
            if net.transitions_len() > 0 {
                log::info!("deadlock at t={} after {} firings", time, self.firings);
                events.push(SimEvent::Deadlock { time });
            } else {
                events.push(SimEvent::NothingEnabled { time });
            }
            self.state = SchedulerState::Idle;
            return;
        };
        let due = self.clock.now() + self.delay_of(net, transition);
        log::debug!("scheduled {} at t={}", transition, due);
        self.pending = Some(PendingFiring {
            transition,
            due,
            token: self.generation,
        });
        events.push(SimEvent::Scheduled { transition, due });
    }

    fn fire(&mut self, net: &mut Net, transition: TransitionId) -> SimEvent {
        let time = self.clock.now();
        let previous = net.marking().clone();
        match net.fire(transition) {
            Ok(outcome) => {
                self.firings += 1;
                self.history.record(HistoryEntry {
                    time,
                    transition,
                    previous,
                    marking: net.marking().clone(),
                });
                SimEvent::Fired { time, outcome }
            }
            Err(reason) => {
                log::warn!("firing of {} rejected at t={}: {}", transition, time, reason);
                SimEvent::FireRejected {
                    time,
                    transition,
                    reason,
                }
            }
        }
    }

    fn delay_of(&mut self, net: &Net, transition: TransitionId) -> SimTime {
        net.transition(transition)
            .map(|t| firing_delay(&mut self.rng, t, self.config.min_timed_delay))
            .unwrap_or(0.0)
    }
}
