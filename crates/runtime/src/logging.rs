use portfolio::TradeReason;
use strategy::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLogEventKind {
    StepMarked,
    RiskExitTriggered(TradeReason),
    /// A Buy or Sell signal that changed the position.
    SignalApplied(Signal),
    EndOfBacktestLiquidated,
    MisalignedSignals,
    ReplayArtifactWritten,
}

/// One entry of the run journal. `step` is 1-based; run-level events use
/// the number of the last step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEvent {
    pub step: u64,
    pub kind: RunLogEventKind,
}

impl RunLogEvent {
    pub fn new(step: u64, kind: RunLogEventKind) -> Self {
        Self { step, kind }
    }
}

pub trait RunLogWriter {
    fn write(&mut self, event: RunLogEvent);
}

#[derive(Debug, Default)]
pub struct InMemoryRunLogWriter {
    events: Vec<RunLogEvent>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunLogEvent] {
        &self.events
    }

    pub fn kinds_at(&self, step: u64) -> Vec<RunLogEventKind> {
        self.events
            .iter()
            .filter(|event| event.step == step)
            .map(|event| event.kind)
            .collect()
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        self.events.push(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunLogWriter;

impl RunLogWriter for NoopRunLogWriter {
    fn write(&mut self, _event: RunLogEvent) {}
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLogWriter;

impl RunLogWriter for TracingRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        tracing::debug!(step = event.step, kind = ?event.kind, "run journal");
    }
}
