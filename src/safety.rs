//! Overcurrent safety evaluation
//!
//! The safety monitor is a pure function of the latest current reading and a
//! fixed threshold: cooling is active when the magnitude strictly exceeds
//! the limit, with no hysteresis and no debouncing. Cooling toggles
//! instantaneously at the threshold on every tick.

/// Verdict produced for a single current reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyVerdict {
    /// Whether the cooling output should be driven this tick
    pub cooling_active: bool,
}

/// Stateless overcurrent monitor
#[derive(Debug, Clone, Copy)]
pub struct SafetyMonitor {
    limit: f32,
}

impl SafetyMonitor {
    /// Create a monitor with the given current limit in amperes
    pub fn new(limit: f32) -> Self {
        Self { limit }
    }

    /// Evaluate one current magnitude. Strict greater-than: a reading
    /// exactly at the limit does not trigger cooling.
    pub fn evaluate(&self, magnitude: f32) -> SafetyVerdict {
        SafetyVerdict {
            cooling_active: magnitude > self.limit,
        }
    }

    /// Configured limit in amperes
    pub fn limit(&self) -> f32 {
        self.limit
    }
}

/// Fault latch over sustained overcurrent.
///
/// Trips after `threshold_ticks` consecutive over-limit ticks and stays
/// latched until `reset()` is called. A threshold of 0 disables the latch
/// entirely, so the Fault state is never entered.
#[derive(Debug, Clone, Copy)]
pub struct FaultLatch {
    threshold_ticks: u32,
    consecutive: u32,
    latched: bool,
}

impl FaultLatch {
    pub fn new(threshold_ticks: u32) -> Self {
        Self {
            threshold_ticks,
            consecutive: 0,
            latched: false,
        }
    }

    /// Feed one tick's over-limit observation. Returns the latched state.
    pub fn observe(&mut self, over_limit: bool) -> bool {
        if self.threshold_ticks == 0 {
            return false;
        }
        if self.latched {
            return true;
        }
        if over_limit {
            self.consecutive += 1;
            if self.consecutive >= self.threshold_ticks {
                self.latched = true;
            }
        } else {
            self.consecutive = 0;
        }
        self.latched
    }

    /// Whether the latch has tripped
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Explicitly clear the latch
    pub fn reset(&mut self) {
        self.latched = false;
        self.consecutive = 0;
    }
}
