//! Shared estimate state for inter-task communication
//!
//! The estimation loop is the single writer. Any number of tasks (control,
//! telemetry) read copies without blocking the loop for longer than a
//! struct copy.

use core::cell::UnsafeCell;

use kestrel_core::estimation::EstimatorPhase;

/// Combined attitude and altitude estimate published once per loop tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateSnapshot {
    /// Roll, pitch, yaw in radians
    pub angles: [f32; 3],
    /// Altitude above the ground reference in centimeters
    pub altitude_cm: i32,
    /// Climb rate in cm/s
    pub velocity_cm_s: i32,
    /// Attitude estimator lifecycle
    pub attitude_phase: EstimatorPhase,
    /// Altitude estimator lifecycle
    pub altitude_phase: EstimatorPhase,
    /// Armed flag passed to the last tick
    pub armed: bool,
    /// Clock reading of the tick that produced this snapshot (µs, wrapping)
    pub timestamp_us: u32,
    /// Ticks published so far; zero until the loop first runs
    pub sequence: u32,
}

impl EstimateSnapshot {
    /// Snapshot before any tick has run
    pub const EMPTY: Self = Self {
        angles: [0.0; 3],
        altitude_cm: 0,
        velocity_cm_s: 0,
        attitude_phase: EstimatorPhase::Calibrating { remaining: 0 },
        altitude_phase: EstimatorPhase::Calibrating { remaining: 0 },
        armed: false,
        timestamp_us: 0,
        sequence: 0,
    };

    /// Both estimators have finished calibrating
    pub fn is_ready(&self) -> bool {
        self.attitude_phase.is_stable() && self.altitude_phase.is_stable()
    }

    /// Roll in degrees
    pub fn roll_deg(&self) -> f32 {
        self.angles[0].to_degrees()
    }

    /// Pitch in degrees
    pub fn pitch_deg(&self) -> f32 {
        self.angles[1].to_degrees()
    }

    /// Yaw in degrees
    pub fn yaw_deg(&self) -> f32 {
        self.angles[2].to_degrees()
    }
}

impl Default for EstimateSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Thread-safe wrapper for the estimate snapshot
///
/// Uses critical sections for atomic read/write operations.
pub struct SharedEstimateState {
    state: UnsafeCell<EstimateSnapshot>,
}

// Safety: EstimateSnapshot is plain Copy data. Every access goes through a
// critical section in the accessor methods.
unsafe impl Sync for SharedEstimateState {}
unsafe impl Send for SharedEstimateState {}

impl SharedEstimateState {
    /// Create new shared state holding [`EstimateSnapshot::EMPTY`]
    pub const fn new() -> Self {
        Self {
            state: UnsafeCell::new(EstimateSnapshot::EMPTY),
        }
    }

    /// Read current snapshot (thread-safe)
    pub fn read(&self) -> EstimateSnapshot {
        critical_section::with(|_cs| unsafe { *self.state.get() })
    }

    /// Publish a new snapshot (thread-safe)
    pub fn write(&self, snapshot: EstimateSnapshot) {
        critical_section::with(|_cs| unsafe {
            *self.state.get() = snapshot;
        });
    }

    /// Get roll, pitch, yaw (thread-safe)
    pub fn angles(&self) -> [f32; 3] {
        critical_section::with(|_cs| unsafe { (*self.state.get()).angles })
    }

    /// Get altitude in centimeters (thread-safe)
    pub fn altitude_cm(&self) -> i32 {
        critical_section::with(|_cs| unsafe { (*self.state.get()).altitude_cm })
    }
}

impl Default for SharedEstimateState {
    fn default() -> Self {
        Self::new()
    }
}
