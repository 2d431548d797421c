//! Progress reporting for pipeline stages.
//!
//! [`ProgressCallback`] decouples stage reporting (load, clean, cluster,
//! bound, render) from any rendering backend. The `indicatif` implementation
//! lives in `patrol_map_cli_utils`.

/// Trait for reporting progress through the pipeline stages.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// [`std::sync::Arc`] across tasks.
pub trait ProgressCallback: Send + Sync {
    /// Advance by `delta` stages.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
