//! Synchronization engine: the state machine and wait/fire loop that
//! consumes a compiled schedule and emits active/passive edges.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use pulsegen_schedule::{compile, CompileError, Domain, DomainPreference, Group, Schedule};

use crate::dispatch::{EdgeKind, EventSink};
use crate::position::PositionFeed;

/// Upper bound on a single uninterruptible wait. Cancellation latency
/// is bounded by this granularity.
pub const MAX_NAP: Duration = Duration::from_millis(100);

const PHASE_IDLE: u8 = 0;
const PHASE_STARTED: u8 = 1;
const PHASE_RUNNING: u8 = 2;

/// Where the generator is in its lifecycle. A stop request is a
/// cooperative flag observed at wait points, not a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Started,
    Running,
}

#[derive(Debug, Default)]
struct Shared {
    phase: AtomicU8,
    stop_requested: AtomicBool,
}

impl Shared {
    fn phase(&self) -> Phase {
        match self.phase.load(Ordering::Acquire) {
            PHASE_STARTED => Phase::Started,
            PHASE_RUNNING => Phase::Running,
            _ => Phase::Idle,
        }
    }

    fn set_phase(&self, phase: Phase) {
        let raw = match phase {
            Phase::Idle => PHASE_IDLE,
            Phase::Started => PHASE_STARTED,
            Phase::Running => PHASE_RUNNING,
        };
        self.phase.store(raw, Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Cancellation and observation handle, cheap to clone and hand to
/// other threads while the generator itself is busy in `run`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Request cooperative cancellation; returns immediately. The run
    /// loop observes the request within one `MAX_NAP` at its wait
    /// points.
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.shared.phase() != Phase::Idle
    }

    pub fn is_running(&self) -> bool {
        self.shared.phase() == Phase::Running
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Dispatch(#[from] crate::dispatch::DispatchError),
}

/// Software trigger/gate pulse generator.
///
/// Lifecycle: `configure` compiles and installs a schedule, `start`
/// records the run's start time, `run` drives the wait/fire loop until
/// the active sequence is exhausted or a stop is requested. The loop
/// always resets the lifecycle on exit, so the same instance can be
/// configured and run again.
pub struct PulseGenerator<S> {
    sink: S,
    shared: Arc<Shared>,
    feed: Arc<PositionFeed>,
    active_preference: DomainPreference,
    passive_preference: DomainPreference,
    schedule: Option<Schedule>,
    start_time: Option<Instant>,
    sequence_id: u64,
}

impl<S: EventSink> PulseGenerator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            shared: Arc::new(Shared::default()),
            feed: Arc::new(PositionFeed::new()),
            active_preference: DomainPreference::Default,
            passive_preference: DomainPreference::Default,
            schedule: None,
            start_time: None,
            sequence_id: 0,
        }
    }

    /// Preference for the domain governing active edges.
    pub fn set_active_domain(&mut self, preference: DomainPreference) {
        self.active_preference = preference;
    }

    pub fn active_domain(&self) -> DomainPreference {
        self.active_preference
    }

    /// Preference for the domain governing passive edges.
    pub fn set_passive_domain(&mut self, preference: DomainPreference) {
        self.passive_preference = preference;
    }

    pub fn passive_domain(&self) -> DomainPreference {
        self.passive_preference
    }

    /// Compile a configuration and install the resulting schedule.
    ///
    /// On error the previously installed schedule is left untouched.
    pub fn configure(&mut self, configuration: &[Group]) -> Result<(), CompileError> {
        let schedule = compile(
            configuration,
            self.active_preference,
            self.passive_preference,
        )?;
        self.schedule = Some(schedule);
        Ok(())
    }

    /// The currently installed schedule, if any.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Handle for requesting cancellation from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Handle the external position source feeds readings into.
    pub fn position_feed(&self) -> Arc<PositionFeed> {
        Arc::clone(&self.feed)
    }

    pub fn is_started(&self) -> bool {
        self.shared.phase() != Phase::Idle
    }

    pub fn is_running(&self) -> bool {
        self.shared.phase() == Phase::Running
    }

    /// Arm the generator: record the start time, forget stale position
    /// readings and reset the sequence id. The compiled schedule is not
    /// touched.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.sequence_id = 0;
        self.feed.reset();
        self.shared.set_phase(Phase::Started);
    }

    /// Drive the wait/fire loop until the active sequence is exhausted
    /// or a stop is requested. Always resets the lifecycle on exit,
    /// whatever the outcome.
    pub fn run(&mut self) -> Result<(), RunError> {
        self.shared.set_phase(Phase::Running);
        let result = self.run_loop();
        self.shared.set_phase(Phase::Idle);
        self.shared.stop_requested.store(false, Ordering::Release);
        result
    }

    fn run_loop(&mut self) -> Result<(), RunError> {
        while self.has_active_events() && !self.stop_requested() {
            self.wait_active();
            if self.stop_requested() {
                break;
            }
            self.fire_active()?;
            self.wait_passive();
            self.fire_passive()?;
        }
        debug!("run loop finished, {} active edge(s) left", self.remaining());
        Ok(())
    }

    fn has_active_events(&self) -> bool {
        self.schedule
            .as_ref()
            .map(|s| !s.active_events.is_empty())
            .unwrap_or(false)
    }

    fn remaining(&self) -> usize {
        self.schedule
            .as_ref()
            .map(|s| s.active_events.len())
            .unwrap_or(0)
    }

    fn stop_requested(&self) -> bool {
        self.shared.stop_requested()
    }

    /// Seconds elapsed since `start`; time-domain candidates are
    /// offsets from that instant.
    fn elapsed(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Sleep for `period` seconds in chunks no longer than `MAX_NAP`,
    /// checking for a stop request between chunks. Non-positive periods
    /// are a no-op.
    fn bounded_sleep(&self, period: f64) {
        if period <= 0.0 {
            return;
        }
        let naps = (period / MAX_NAP.as_secs_f64()).ceil() as u64;
        if naps == 0 {
            return;
        }
        let nap = Duration::from_secs_f64(period / naps as f64);
        for _ in 0..naps {
            if self.stop_requested() {
                break;
            }
            thread::sleep(nap);
        }
    }

    /// Block until the next active edge is satisfied or a stop is
    /// requested.
    fn wait_active(&self) {
        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };
        let Some(&candidate) = schedule.active_events.first() else {
            return;
        };
        match schedule.active_domain {
            Domain::Time => {
                self.bounded_sleep(candidate - self.elapsed());
            }
            Domain::Position => loop {
                if self.stop_requested() {
                    break;
                }
                if let Some(position) = self.feed.consume_fresh() {
                    if schedule.direction.satisfied(position, candidate) {
                        break;
                    }
                } else {
                    self.feed.wait_fresh(MAX_NAP);
                }
            },
        }
    }

    /// Consume every already-satisfied active edge as one catch-up
    /// batch and emit a single Active event for it.
    ///
    /// The batch's interior passive edges pair with superseded active
    /// edges and never fire; only the final one is kept.
    fn fire_active(&mut self) -> Result<(), RunError> {
        let start_time = self.start_time;
        let feed = Arc::clone(&self.feed);
        let Some(schedule) = self.schedule.as_mut() else {
            return Ok(());
        };

        let mut consumed = 0;
        while consumed < schedule.active_events.len() {
            let candidate = schedule.active_events[consumed];
            let observed = match schedule.active_domain {
                Domain::Time => start_time.map(|t| t.elapsed().as_secs_f64()),
                Domain::Position => feed.latest(),
            };
            let satisfied = observed
                .map(|now| schedule.direction.satisfied(now, candidate))
                .unwrap_or(false);
            if !satisfied {
                break;
            }
            consumed += 1;
        }

        if consumed == 0 {
            // Unreachable through the run loop: the stop check between
            // wait and fire guarantees the head entry is satisfied.
            warn!("no active edge satisfied at fire time; nothing emitted");
            return Ok(());
        }

        self.sequence_id += consumed as u64;
        let id = self.sequence_id - 1;
        trace!("fire active {id} (batch of {consumed})");
        self.sink.fire(EdgeKind::Active, id)?;
        schedule.active_events.drain(..consumed);
        schedule.passive_events.drain(..consumed - 1);
        Ok(())
    }

    /// Block until the next passive edge is satisfied.
    ///
    /// Position branch: the stop flag is checked after the timed wait,
    /// not at the top of the loop, so a stop request still interrupts
    /// an idle wait but a stream of unsatisfying updates is drained
    /// first.
    fn wait_passive(&self) {
        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };
        let Some(&candidate) = schedule.passive_events.first() else {
            return;
        };
        match schedule.passive_domain {
            Domain::Time => {
                self.bounded_sleep(candidate - self.elapsed());
            }
            Domain::Position => loop {
                if let Some(position) = self.feed.consume_fresh() {
                    if schedule.direction.satisfied(position, candidate) {
                        break;
                    }
                } else {
                    self.feed.wait_fresh(MAX_NAP);
                    if self.stop_requested() {
                        break;
                    }
                }
            },
        }
    }

    /// Emit exactly one Passive event carrying the id of the most
    /// recently fired active edge. Never batches.
    fn fire_passive(&mut self) -> Result<(), RunError> {
        let id = self.sequence_id.saturating_sub(1);
        trace!("fire passive {id}");
        self.sink.fire(EdgeKind::Passive, id)?;
        if let Some(schedule) = self.schedule.as_mut() {
            if !schedule.passive_events.is_empty() {
                schedule.passive_events.remove(0);
            }
        }
        Ok(())
    }
}
