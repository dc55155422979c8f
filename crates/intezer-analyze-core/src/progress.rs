/// Trait for reporting batch progress.
///
/// CLI implements with indicatif bars; tests count ticks.
/// All methods have default no-op implementations.
pub trait ProgressReporter {
    /// A batch of `len` items is about to be processed (one per directory level in walks).
    fn on_batch_start(&self, _label: &str, _len: usize) {}
    /// Called exactly once per processed item, whatever the outcome.
    fn on_item_done(&self) {}
    fn on_batch_complete(&self) {}
    /// Poll pass over `len` pending operations.
    fn on_wait_start(&self, _len: usize) {}
    fn on_wait_progress(&self, _resolved: usize) {}
    fn on_wait_complete(&self) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
