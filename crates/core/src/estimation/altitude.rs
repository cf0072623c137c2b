//! Barometric altitude and climb-rate estimator
//!
//! Pressure samples go into a [`SlidingWindow`] whose running sum covers the
//! last `N - 1` samples. Altitude is the barometric formula applied to the
//! window mean, relative to a ground reference and smoothed by a one-pole
//! low-pass. Climb rate is the difference of successive altitudes over the
//! caller-supplied interval, clamped and deadbanded.
//!
//! The ground reference is an IIR accumulator (`ground_pressure` holds eight
//! times the reference pressure) nudged once per `calibrate()` call during
//! the startup window, so a slowly settling sensor is tolerated. Nothing is
//! accumulated until the window has seen `N` samples, and the accumulator
//! starts from zero, so the startup window must be long enough for the IIR
//! to converge (see [`MIN_CALIBRATION_CYCLES`]).

use libm::rintf;

use super::calibration::{CalibrationStatus, CalibrationTracker, EstimatorPhase};
use super::error::EstimatorError;
use crate::filter::{constrain_abs, deadband, lowpass_retain, pa_to_cm, SlidingWindow};
use crate::traits::PressureSource;

/// Default pressure history length
pub const DEFAULT_HISTORY_SIZE: usize = 48;

/// Shortest ground calibration that lets the 1/8 IIR settle from zero onto
/// the exact window mean (at most 93 cycles inside the accepted range).
pub const MIN_CALIBRATION_CYCLES: u16 = 110;

/// Lowest accepted reading in Pa (roughly 30 km altitude)
pub const MIN_PLAUSIBLE_PA: i32 = 1_000;

/// Highest accepted reading in Pa (well above any surface pressure on record)
pub const MAX_PLAUSIBLE_PA: i32 = 120_000;

/// Ground reference IIR weight (1/8 of each new window mean)
const GROUND_IIR_SHIFT: i32 = 8;

/// One barometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureSample {
    /// Static pressure in Pascals
    pub pascals: f32,
}

impl PressureSample {
    /// Finite readings inside `[min_pa, max_pa]` are accepted into the history.
    pub fn is_within(&self, min_pa: i32, max_pa: i32) -> bool {
        self.pascals.is_finite() && self.pascals >= min_pa as f32 && self.pascals <= max_pa as f32
    }
}

/// Barometer filter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerConfig {
    /// Weight kept from the previous altitude, in [0, 1]
    pub noise_lpf: f32,
    /// Climb rate limit in cm/s
    pub velocity_bound: i32,
    /// Climb rates within ± this value (cm/s) read as zero
    pub velocity_deadband: i32,
    /// `calibrate()` calls in the startup window.
    ///
    /// Zero skips ground calibration and reports altitude above the standard
    /// sea-level pressure; otherwise at least [`MIN_CALIBRATION_CYCLES`].
    pub calibration_cycles: u16,
    /// Readings below this (Pa) are treated as glitches
    pub min_pressure_pa: i32,
    /// Readings above this (Pa) are treated as glitches
    pub max_pressure_pa: i32,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            noise_lpf: 0.5,
            velocity_bound: 300,
            velocity_deadband: 10,
            calibration_cycles: 200,
            min_pressure_pa: MIN_PLAUSIBLE_PA,
            max_pressure_pa: MAX_PLAUSIBLE_PA,
        }
    }
}

impl BarometerConfig {
    /// Check the configuration before it reaches the filter.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if !(0.0..=1.0).contains(&self.noise_lpf) {
            return Err(EstimatorError::InvalidNoiseLpf);
        }
        if self.velocity_bound <= 0 {
            return Err(EstimatorError::InvalidVelocityBound);
        }
        if self.velocity_deadband < 0 {
            return Err(EstimatorError::InvalidVelocityDeadband);
        }
        if self.calibration_cycles != 0 && self.calibration_cycles < MIN_CALIBRATION_CYCLES {
            return Err(EstimatorError::InvalidCalibrationCycles);
        }
        if self.min_pressure_pa <= 0 || self.max_pressure_pa < self.min_pressure_pa {
            return Err(EstimatorError::InvalidPressureRange);
        }
        Ok(())
    }
}

/// Moving-average barometer altitude estimator
///
/// `N` is the history length; the running sum spans `N - 1` samples.
pub struct AltitudeEstimator<P: PressureSource, const N: usize = DEFAULT_HISTORY_SIZE> {
    config: BarometerConfig,
    source: P,
    window: SlidingWindow<N>,
    /// Samples pushed since init, saturating at `N`
    filled: usize,
    ground_pressure: i32,
    ground_altitude: i32,
    altitude: i32,
    last_altitude: i32,
    calibration: CalibrationTracker<1>,
    rejected: u32,
}

impl<P: PressureSource, const N: usize> AltitudeEstimator<P, N> {
    const WINDOW: i32 = SlidingWindow::<N>::WINDOW as i32;

    /// Create an estimator reading from `source` and start calibration.
    pub fn new(config: BarometerConfig, source: P) -> Result<Self, EstimatorError> {
        config.validate()?;
        // A full window of maximum readings must not overflow the i32 sum
        if (config.max_pressure_pa as i64) * (Self::WINDOW as i64) > i32::MAX as i64 {
            return Err(EstimatorError::InvalidPressureRange);
        }

        let mut estimator = Self {
            config,
            source,
            window: SlidingWindow::new(),
            filled: 0,
            ground_pressure: 0,
            ground_altitude: 0,
            altitude: 0,
            last_altitude: 0,
            calibration: CalibrationTracker::new(config.calibration_cycles),
            rejected: 0,
        };
        estimator.init();
        Ok(estimator)
    }

    /// Zero all state and restart the ground calibration countdown.
    pub fn init(&mut self) {
        self.window.clear();
        self.filled = 0;
        self.ground_pressure = 0;
        self.ground_altitude = 0;
        self.altitude = 0;
        self.last_altitude = 0;
        self.calibration.reset();
        self.rejected = 0;
    }

    /// Nudge the ground reference toward the current window mean.
    ///
    /// Call once per barometer cycle during startup. Until the window has
    /// seen `N` samples the call is a no-op and the countdown does not move.
    /// After the configured number of cycles the reference freezes and
    /// further calls return `Done` without effect.
    pub fn calibrate(&mut self) -> CalibrationStatus {
        if !self.is_window_full() {
            return CalibrationStatus::Calibrating(self.phase().remaining());
        }
        if self.calibration.is_done() {
            return CalibrationStatus::Done;
        }

        let mean = self.window.sum() / Self::WINDOW;
        self.ground_pressure -= self.ground_pressure / GROUND_IIR_SHIFT;
        self.ground_pressure = self.ground_pressure.saturating_add(mean);
        self.ground_altitude = pa_to_cm((self.ground_pressure / GROUND_IIR_SHIFT).max(0) as u32) as i32;

        self.calibration.tick([mean])
    }

    /// Read one sample from the pressure source into the history.
    pub fn update(&mut self) {
        let pascals = self.source.read_pressure_pascals();
        self.update_with(PressureSample { pascals });
    }

    /// Push a sample without reading the source (replay and simulation).
    ///
    /// Samples outside the configured pressure range repeat the previous
    /// reading so the window keeps its cadence. Before anything has been
    /// accepted there is nothing to repeat and the sample is dropped.
    pub fn update_with(&mut self, sample: PressureSample) {
        let pascals = if sample.is_within(self.config.min_pressure_pa, self.config.max_pressure_pa) {
            sample.pascals as i32
        } else {
            self.rejected = self.rejected.wrapping_add(1);
            if self.filled == 0 {
                return;
            }
            self.window.latest()
        };

        self.window.push(pascals);
        if self.filled < N {
            self.filled += 1;
        }
    }

    /// Filtered altitude above the ground reference, in centimeters.
    ///
    /// Each call advances the low-pass filter by one step. The window must
    /// have seen `N` samples: debug builds assert it and release builds
    /// return the previous altitude unchanged.
    pub fn get_altitude(&mut self) -> i32 {
        debug_assert!(
            self.is_window_full(),
            "get_altitude requires a full pressure window"
        );
        if !self.is_window_full() {
            return self.altitude;
        }

        let mean_pa = self.window.sum() as f32 / Self::WINDOW as f32;
        let raw = (pa_to_cm(mean_pa as u32) as i32).saturating_sub(self.ground_altitude);
        let filtered = lowpass_retain(self.altitude as f32, raw as f32, self.config.noise_lpf);
        self.altitude = rintf(filtered) as i32;
        self.altitude
    }

    /// Climb rate in cm/s since the previous call.
    ///
    /// `d_time_micros` must be non-zero; debug builds assert it and release
    /// builds treat zero as one microsecond.
    pub fn get_velocity(&mut self, d_time_micros: u32) -> i32 {
        debug_assert!(d_time_micros > 0, "get_velocity requires a non-zero interval");
        let dt = d_time_micros.max(1);

        let climb = self.altitude.saturating_sub(self.last_altitude);
        let velocity = (climb as f32 * 1_000_000.0 / dt as f32) as i32;
        self.last_altitude = self.altitude;

        deadband(
            constrain_abs(velocity, self.config.velocity_bound),
            self.config.velocity_deadband,
        )
    }

    /// Altitude returned by the last `get_altitude()` call.
    pub fn current_altitude_cm(&self) -> i32 {
        self.altitude
    }

    /// Climb rate over `dt_micros`; same contract as [`get_velocity`](Self::get_velocity).
    pub fn current_velocity_cm_per_sec(&mut self, dt_micros: u32) -> i32 {
        self.get_velocity(dt_micros)
    }

    /// Calibrating until the window is full and the configured number of
    /// `calibrate()` calls have landed.
    ///
    /// While filling, `remaining` counts barometer cycles (one `update()`
    /// then one `calibrate()`) left before the estimator turns stable.
    pub fn phase(&self) -> EstimatorPhase {
        if self.is_window_full() {
            return self.calibration.status().into();
        }

        // The update that fills the window shares its cycle with the first calibrate
        let filling = N.saturating_sub(self.filled + 1).min(u16::MAX as usize) as u16;
        EstimatorPhase::Calibrating {
            remaining: self.calibration.remaining().saturating_add(filling).max(1),
        }
    }

    /// True once `N` samples have been pushed since init.
    pub fn is_window_full(&self) -> bool {
        self.filled >= N
    }

    /// IIR ground pressure accumulator (eight times the reference in Pa).
    pub fn ground_pressure(&self) -> i32 {
        self.ground_pressure
    }

    /// Ground reference altitude in centimeters.
    pub fn ground_altitude(&self) -> i32 {
        self.ground_altitude
    }

    /// Running sum over the last `N - 1` samples.
    pub fn pressure_sum(&self) -> i32 {
        self.window.sum()
    }

    /// Slot the next sample will be written to.
    pub fn history_index(&self) -> usize {
        self.window.cursor()
    }

    /// Samples replaced or dropped because they were outside the pressure range.
    pub fn rejected_samples(&self) -> u32 {
        self.rejected
    }

    /// Filter configuration in use.
    pub fn config(&self) -> &BarometerConfig {
        &self.config
    }

    /// Pressure source.
    pub fn source(&self) -> &P {
        &self.source
    }

    /// Mutable pressure source (tests and simulation drive it directly).
    pub fn source_mut(&mut self) -> &mut P {
        &mut self.source
    }
}
