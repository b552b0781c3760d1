//! Fire-and-forget notification seam for audio/haptic feedback.
//!
//! The runner reports transitions through this trait and never looks at the
//! result; implementations must not block the tick path.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerEvent {
    Started,
    Paused,
    PhaseChanged,
    SetRecorded,
    Finished,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: RunnerEvent);
}

/// Default notifier that discards every event.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: RunnerEvent) {}
}
