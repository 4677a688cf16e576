use crate::domain::{Clock, ControllableClock, Timestamp};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Clock shared by the control plane and its tests
///
/// Runs in real time by default. A frozen clock only moves through
/// `advance`/`set_time`, which keeps emitted timestamps predictable in tests.
#[derive(Debug)]
pub struct SimulationClock {
    inner: Arc<RwLock<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    /// The reference point in simulated time
    simulated_time: DateTime<Utc>,
    /// Wall clock time when `simulated_time` was last set
    wall_clock_reference: DateTime<Utc>,
    frozen: bool,
}

impl ClockState {
    fn current(&self) -> DateTime<Utc> {
        if self.frozen {
            self.simulated_time
        } else {
            self.simulated_time + (Utc::now() - self.wall_clock_reference)
        }
    }
}

impl SimulationClock {
    pub fn new() -> Self {
        let now = Utc::now();
        SimulationClock {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_time: now,
                wall_clock_reference: now,
                frozen: false,
            })),
        }
    }

    /// Create a frozen clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        SimulationClock {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_time: time,
                wall_clock_reference: Utc::now(),
                frozen: true,
            })),
        }
    }

    /// Create a frozen clock at the current time
    pub fn fixed() -> Self {
        Self::at(Utc::now())
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SimulationClock {
    fn clone(&self) -> Self {
        SimulationClock {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> Timestamp {
        self.inner.read().current()
    }
}

impl ControllableClock for SimulationClock {
    fn advance(&self, duration: Duration) {
        let mut state = self.inner.write();
        state.simulated_time = state.current() + duration;
        state.wall_clock_reference = Utc::now();
    }

    fn set_time(&self, time: Timestamp) {
        let mut state = self.inner.write();
        state.simulated_time = time;
        state.wall_clock_reference = Utc::now();
    }
}
