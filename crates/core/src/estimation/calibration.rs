//! Startup calibration countdown and bias accumulation
//!
//! A `CalibrationTracker` counts down a fixed number of samples taken while
//! the vehicle sits still after power-up, summing each axis as it goes. When
//! the counter reaches zero the sums freeze and the per-axis mean becomes the
//! bias (gyro zero-rate offset, accelerometer zero, ground pressure sample).
//!
//! Calibration results live in RAM only. Sensor offsets drift from one boot
//! to the next, so every boot calibrates again.

/// Result of feeding one sample to a [`CalibrationTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Still collecting; samples left before completion
    Calibrating(u16),
    /// Countdown finished, bias is frozen
    Done,
}

impl CalibrationStatus {
    /// Samples still required (zero once done)
    pub fn remaining(&self) -> u16 {
        match self {
            CalibrationStatus::Calibrating(remaining) => *remaining,
            CalibrationStatus::Done => 0,
        }
    }

    /// True once the countdown has finished
    pub fn is_done(&self) -> bool {
        matches!(self, CalibrationStatus::Done)
    }
}

/// Lifecycle shared by the attitude and altitude estimators
///
/// Construction performs initialization, so there is no uninitialized
/// state to observe. `Stable` is terminal until the estimator is
/// re-initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorPhase {
    /// Startup window still running
    Calibrating {
        /// Samples or calibrate cycles left
        remaining: u16,
    },
    /// Bias and reference values are fixed; output is trustworthy
    Stable,
}

impl EstimatorPhase {
    /// Return phase name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorPhase::Calibrating { .. } => "Calibrating",
            EstimatorPhase::Stable => "Stable",
        }
    }

    /// True once calibration has completed
    pub fn is_stable(&self) -> bool {
        matches!(self, EstimatorPhase::Stable)
    }

    /// Samples or cycles left (zero once stable)
    pub fn remaining(&self) -> u16 {
        match self {
            EstimatorPhase::Calibrating { remaining } => *remaining,
            EstimatorPhase::Stable => 0,
        }
    }
}

impl From<CalibrationStatus> for EstimatorPhase {
    fn from(status: CalibrationStatus) -> Self {
        match status {
            CalibrationStatus::Calibrating(remaining) => EstimatorPhase::Calibrating { remaining },
            CalibrationStatus::Done => EstimatorPhase::Stable,
        }
    }
}

/// Per-axis sample countdown with running sums
#[derive(Debug, Clone)]
pub struct CalibrationTracker<const N: usize> {
    total: u16,
    remaining: u16,
    sums: [i32; N],
}

impl<const N: usize> CalibrationTracker<N> {
    /// Start a countdown of `samples` ticks.
    ///
    /// A zero-sample tracker is complete immediately with a zero bias.
    pub const fn new(samples: u16) -> Self {
        Self {
            total: samples,
            remaining: samples,
            sums: [0; N],
        }
    }

    /// Number of samples required in total
    pub fn total(&self) -> u16 {
        self.total
    }

    /// Samples still required
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    /// Current status without consuming a sample
    pub fn status(&self) -> CalibrationStatus {
        if self.remaining > 0 {
            CalibrationStatus::Calibrating(self.remaining)
        } else {
            CalibrationStatus::Done
        }
    }

    /// True once the countdown has finished
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Feed one sample.
    ///
    /// While calibrating the sample is accumulated and the counter
    /// decremented. After completion samples are ignored and the sums stay
    /// frozen.
    pub fn tick(&mut self, sample: [i32; N]) -> CalibrationStatus {
        if self.remaining == 0 {
            return CalibrationStatus::Done;
        }

        for (sum, value) in self.sums.iter_mut().zip(sample.iter()) {
            *sum = sum.saturating_add(*value);
        }
        self.remaining -= 1;
        self.status()
    }

    /// Accumulated per-axis sums
    pub fn sums(&self) -> &[i32; N] {
        &self.sums
    }

    /// Per-axis mean of the collected samples.
    ///
    /// `None` while calibrating. A zero-sample tracker yields zeros.
    pub fn mean(&self) -> Option<[f32; N]> {
        if !self.is_done() {
            return None;
        }
        if self.total == 0 {
            return Some([0.0; N]);
        }

        let count = self.total as f32;
        let mut mean = [0.0; N];
        for (m, sum) in mean.iter_mut().zip(self.sums.iter()) {
            *m = *sum as f32 / count;
        }
        Some(mean)
    }

    /// Restart the countdown from the configured sample count.
    pub fn reset(&mut self) {
        *self = Self::new(self.total);
    }
}
