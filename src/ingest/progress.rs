use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

/// States of one ingestion run
///
/// Transitions are strictly sequential:
/// `Received → Validating → Extracting → StructureDetected → Splitting → Finalizing → Committed`,
/// with `Failed` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Received,
    Validating,
    Extracting,
    StructureDetected,
    Splitting,
    Finalizing,
    Committed,
    Failed,
}

impl PipelineStage {
    /// Progress percentage reported when the stage is entered
    pub fn percentage(self) -> u8 {
        match self {
            PipelineStage::Received => 0,
            PipelineStage::Validating => 5,
            PipelineStage::Extracting => 20,
            PipelineStage::StructureDetected => 40,
            PipelineStage::Splitting => 50,
            PipelineStage::Finalizing => 85,
            PipelineStage::Committed | PipelineStage::Failed => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Validating => "validating",
            PipelineStage::Extracting => "extracting",
            PipelineStage::StructureDetected => "structure_detected",
            PipelineStage::Splitting => "splitting",
            PipelineStage::Finalizing => "finalizing",
            PipelineStage::Committed => "committed",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Committed | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub percentage: u8,
    pub message: String,
}

/// Receives progress events at every pipeline transition
///
/// Implementations must return quickly; the pipeline calls `report` inline and does not
/// wait for any work the sink schedules.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events into an unbounded channel; a dropped receiver is ignored
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub Sender<ProgressEvent>);

impl ProgressSink for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Cooperative cancellation flag, checked before every stage transition
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
