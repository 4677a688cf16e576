use crate::domain::value_objects::Timestamp;
use chrono::Duration;

/// Basic clock trait - provides current time
///
/// Injected wherever the core stamps or records time so tests can pin it.
pub trait Clock: Send + Sync {
    /// Get current time from this clock's perspective
    fn now(&self) -> Timestamp;

    /// Get current time as milliseconds since Unix epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Get current time as whole seconds since Unix epoch
    fn now_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// A clock that can be controlled (for tests and replays)
pub trait ControllableClock: Clock {
    /// Advance time by a duration
    fn advance(&self, duration: Duration);

    /// Set time to a specific value
    fn set_time(&self, time: Timestamp);
}
