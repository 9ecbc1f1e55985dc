use crate::state::{PipelineKind, PipelineOutcome, PipelinePhase, PipelineStatus};
use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debounce: every edit pushes the deadline out by `debounce`.
#[derive(Debug)]
struct DebounceState {
    debounce: Duration,
    dirty: bool,
    last_event: Option<Instant>,
    force_immediate: bool,
}

impl DebounceState {
    const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            dirty: false,
            last_event: None,
            force_immediate: false,
        }
    }

    fn record_event(&mut self) {
        self.last_event = Some(Instant::now());
        self.dirty = true;
    }

    fn force_run(&mut self) {
        self.force_immediate = true;
        self.dirty = true;
    }

    const fn should_run(&self) -> bool {
        self.dirty
    }

    fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(Instant::now());
        }
        self.last_event.map(|last| last + self.debounce)
    }

    fn reset(&mut self) {
        self.dirty = false;
        self.last_event = None;
        self.force_immediate = false;
    }
}

/// One debounced, generation-tagged pipeline.
///
/// Requests are never aborted. Each issued request takes the next generation, and only a
/// response carrying the latest generation is accepted; guards that answer locally also bump
/// the generation so responses still in flight become inert.
#[derive(Debug)]
pub(crate) struct Pipeline {
    kind: PipelineKind,
    debounce: DebounceState,
    generation: u64,
    awaiting: Option<u64>,
    last_outcome: Option<PipelineOutcome>,
    requests_issued: u64,
}

impl Pipeline {
    pub(crate) const fn new(kind: PipelineKind, debounce: Duration) -> Self {
        Self {
            kind,
            debounce: DebounceState::new(debounce),
            generation: 0,
            awaiting: None,
            last_outcome: None,
            requests_issued: 0,
        }
    }

    pub(crate) const fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Restarts the debounce window.
    pub(crate) fn schedule(&mut self) {
        self.debounce.record_event();
    }

    /// Runs on the next loop turn, bypassing the debounce.
    pub(crate) fn schedule_now(&mut self) {
        self.debounce.force_run();
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.debounce.next_deadline()
    }

    /// Called when the deadline fires; clears the timer.
    pub(crate) fn take_due(&mut self) -> bool {
        let due = self.debounce.should_run();
        self.debounce.reset();
        due
    }

    /// Tags a new request with the next generation.
    pub(crate) fn begin(&mut self) -> u64 {
        self.debounce.reset();
        self.generation += 1;
        self.awaiting = Some(self.generation);
        self.requests_issued += 1;
        self.last_outcome = Some(PipelineOutcome::Issued);
        self.generation
    }

    /// Answers locally without a request; anything still in flight becomes stale.
    pub(crate) fn skip(&mut self) -> u64 {
        self.debounce.reset();
        self.generation += 1;
        self.awaiting = None;
        self.last_outcome = Some(PipelineOutcome::Skipped);
        self.generation
    }

    /// Whether a response tagged `generation` may be applied.
    pub(crate) fn accepts(&self, generation: u64) -> bool {
        self.awaiting == Some(generation)
    }

    pub(crate) fn finish(&mut self, generation: u64, outcome: PipelineOutcome) {
        if self.awaiting == Some(generation) {
            self.awaiting = None;
        }
        self.last_outcome = Some(outcome);
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn phase(&self) -> PipelinePhase {
        if self.debounce.should_run() {
            PipelinePhase::Scheduled
        } else if self.awaiting.is_some() {
            PipelinePhase::InFlight
        } else {
            PipelinePhase::Idle
        }
    }

    pub(crate) fn status(&self) -> PipelineStatus {
        PipelineStatus {
            phase: self.phase(),
            generation: self.generation,
            last_outcome: self.last_outcome,
            requests_issued: self.requests_issued,
        }
    }
}
