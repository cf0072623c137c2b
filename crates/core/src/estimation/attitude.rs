//! Complementary-filter attitude estimator
//!
//! Integrates debiased gyro rates over the measured loop interval and pulls
//! roll and pitch toward the gravity direction seen by the accelerometer:
//!
//! ```text
//! angle = α · (angle + ω·dt) + (1 − α) · accel_angle      (roll, pitch)
//! angle = angle + ω·dt                                    (yaw, free drift)
//! ```
//!
//! The accelerometer term is scaled by a trust weight that falls to zero as
//! the measured magnitude moves away from 1g, so vibration and manoeuvring
//! loads cannot drag the estimate. All angles are wrapped to `[-π, π)`.
//!
//! # Axis convention
//!
//! Index 0 is roll (X), 1 is pitch (Y), 2 is yaw (Z) for sensor counts and
//! output angles alike.

use libm::{atan2f, sqrtf};
use nalgebra::Vector3;

use super::calibration::{CalibrationTracker, EstimatorPhase};
use super::error::EstimatorError;
use crate::filter::{smoothing_factor, wrap_pi};
use crate::traits::{HardwareClock, ImuSource};

const ROLL: usize = 0;
const PITCH: usize = 1;
const YAW: usize = 2;

/// Accelerometer fully trusted within ±15% of 1g
const ACC_TRUST_FULL: f32 = 0.15;

/// Accelerometer ignored beyond ±35% of 1g
const ACC_TRUST_NONE: f32 = 0.35;

/// Raw sensor counts for one estimator tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawImuSample {
    /// Accelerometer counts (X, Y, Z)
    pub accel: [i16; 3],
    /// Gyroscope counts (X, Y, Z)
    pub gyro: [i16; 3],
}

impl RawImuSample {
    /// Read one accelerometer and gyroscope sample from `imu`.
    pub fn read_from<I: ImuSource>(imu: &mut I) -> Self {
        Self {
            accel: imu.read_accel(),
            gyro: imu.read_gyro(),
        }
    }
}

/// Fixed per-board IMU scale factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuCalibration {
    /// Accelerometer counts representing 1g
    pub acc1g: u16,
    /// Gyro counts to rad/s
    pub gyro_scale: f32,
    /// Accelerometer low-pass cutoff in Hz (0 disables smoothing)
    pub lowpass_cutoff: f32,
}

impl ImuCalibration {
    /// Validate and build a calibration.
    pub fn new(acc1g: u16, gyro_scale: f32, lowpass_cutoff: f32) -> Result<Self, EstimatorError> {
        if acc1g == 0 {
            return Err(EstimatorError::InvalidAccel1g);
        }
        if !gyro_scale.is_finite() || gyro_scale <= 0.0 {
            return Err(EstimatorError::InvalidGyroScale);
        }
        if !lowpass_cutoff.is_finite() || lowpass_cutoff < 0.0 {
            return Err(EstimatorError::InvalidLowpassCutoff);
        }

        Ok(Self {
            acc1g,
            gyro_scale,
            lowpass_cutoff,
        })
    }

    /// Take the scale factors reported by the IMU driver.
    pub fn from_source<I: ImuSource>(imu: &I, lowpass_cutoff: f32) -> Result<Self, EstimatorError> {
        let counts_per_rad = imu.gyro_counts_per_rad_per_sec();
        if !counts_per_rad.is_finite() || counts_per_rad <= 0.0 {
            return Err(EstimatorError::InvalidGyroScale);
        }
        Self::new(imu.accel_1g_reference(), 1.0 / counts_per_rad, lowpass_cutoff)
    }
}

/// Attitude estimator timing and filter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeConfig {
    /// Nominal control loop period in microseconds
    pub looptime_us: u32,
    /// Gyro calibration window in milliseconds
    pub gyro_calibration_ms: u32,
    /// Accelerometer calibration sample count (0 skips accel calibration)
    pub accel_calibration_samples: u16,
    /// Complementary filter factor `f`, giving `α = f / (f + 1)`
    pub gyro_cmpf_factor: f32,
    /// Longest interval integrated in one step, in microseconds
    pub max_dt_us: u32,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            looptime_us: 3_500,
            gyro_calibration_ms: 3_500,
            accel_calibration_samples: 400,
            gyro_cmpf_factor: 600.0,
            max_dt_us: 50_000,
        }
    }
}

impl AttitudeConfig {
    /// Check the configuration before it reaches the filter.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.looptime_us == 0 || self.max_dt_us == 0 {
            return Err(EstimatorError::InvalidLooptime);
        }
        if !self.gyro_cmpf_factor.is_finite() || self.gyro_cmpf_factor <= 0.0 {
            return Err(EstimatorError::InvalidComplementaryFactor);
        }
        Ok(())
    }

    /// Gyro calibration window expressed in loop iterations.
    pub fn gyro_calibration_samples(&self) -> u16 {
        let samples = (self.gyro_calibration_ms as u64 * 1_000) / self.looptime_us.max(1) as u64;
        samples.min(u16::MAX as u64) as u16
    }

    /// Gyro weight `α` of the complementary filter.
    pub fn alpha(&self) -> f32 {
        self.gyro_cmpf_factor / (self.gyro_cmpf_factor + 1.0)
    }
}

/// Estimator output plus outstanding calibration counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttitudeState {
    /// Roll, pitch, yaw in radians
    pub angle: [f32; 3],
    /// Gyro samples left before bias is known
    pub calibrating_gyro_samples_remaining: u16,
    /// Accelerometer samples left before zero offset is known
    pub calibrating_accel_samples_remaining: u16,
}

/// Gyro/accelerometer complementary filter
///
/// Owns its clock so elapsed time between `update()` calls is measured, not
/// assumed. One instance per control loop; readers take copies.
pub struct AttitudeEstimator<C: HardwareClock> {
    calibration: ImuCalibration,
    config: AttitudeConfig,
    clock: C,
    state: AttitudeState,
    gyro_cal: CalibrationTracker<3>,
    accel_cal: CalibrationTracker<3>,
    gyro_bias: Vector3<f32>,
    accel_zero: Vector3<f32>,
    accel_smooth: Option<Vector3<f32>>,
    accel_trust: f32,
    last_update_us: Option<u32>,
    armed: bool,
}

impl<C: HardwareClock> AttitudeEstimator<C> {
    /// Create an estimator and start its calibration countdown.
    pub fn new(
        calibration: ImuCalibration,
        config: AttitudeConfig,
        clock: C,
    ) -> Result<Self, EstimatorError> {
        config.validate()?;

        let mut estimator = Self {
            calibration,
            config,
            clock,
            state: AttitudeState::default(),
            gyro_cal: CalibrationTracker::new(config.gyro_calibration_samples()),
            accel_cal: CalibrationTracker::new(config.accel_calibration_samples),
            gyro_bias: Vector3::zeros(),
            accel_zero: Vector3::zeros(),
            accel_smooth: None,
            accel_trust: 0.0,
            last_update_us: None,
            armed: false,
        };
        estimator.init();
        Ok(estimator)
    }

    /// Reset filter state and restart gyro and accelerometer calibration.
    ///
    /// Does not touch the sensors.
    pub fn init(&mut self) {
        self.gyro_cal.reset();
        self.accel_cal.reset();
        self.state = AttitudeState {
            angle: [0.0; 3],
            calibrating_gyro_samples_remaining: self.gyro_cal.remaining(),
            calibrating_accel_samples_remaining: self.accel_cal.remaining(),
        };
        self.gyro_bias = Vector3::zeros();
        self.accel_zero = Vector3::zeros();
        self.accel_smooth = None;
        self.accel_trust = 0.0;
        self.last_update_us = None;
    }

    /// Process one sample and return roll, pitch, yaw in radians.
    ///
    /// While gyro calibration is running the sample only feeds the bias sum
    /// and the previous estimate is returned unchanged. `armed` is recorded
    /// for telemetry and has no effect on the filter.
    pub fn update(&mut self, armed: bool, sample: &RawImuSample) -> [f32; 3] {
        self.armed = armed;

        let now = self.clock.now_micros();
        let dt_us = match self.last_update_us.replace(now) {
            Some(previous) => now.wrapping_sub(previous).min(self.config.max_dt_us),
            None => self.config.looptime_us.min(self.config.max_dt_us),
        };
        let dt = dt_us as f32 * 1e-6;

        let accel = widen(sample.accel);
        if !self.accel_cal.is_done() {
            self.accel_cal.tick(accel);
            if let Some(mean) = self.accel_cal.mean() {
                // Level during calibration: Z should read exactly 1g
                self.accel_zero =
                    Vector3::new(mean[0], mean[1], mean[2] - self.calibration.acc1g as f32);
            }
            self.state.calibrating_accel_samples_remaining = self.accel_cal.remaining();
        }

        let gyro = widen(sample.gyro);
        if !self.gyro_cal.is_done() {
            self.gyro_cal.tick(gyro);
            if let Some(mean) = self.gyro_cal.mean() {
                self.gyro_bias = Vector3::new(mean[0], mean[1], mean[2]);
            }
            self.state.calibrating_gyro_samples_remaining = self.gyro_cal.remaining();
            return self.state.angle;
        }

        let rate = (to_vector(gyro) - self.gyro_bias) * self.calibration.gyro_scale;
        let delta = rate * dt;

        let mut angle = self.state.angle;
        for axis in [ROLL, PITCH, YAW] {
            angle[axis] = wrap_pi(angle[axis] + delta[axis]);
        }

        if self.accel_cal.is_done() {
            self.correct_with_accel(&mut angle, to_vector(accel) - self.accel_zero, dt);
        }

        self.state.angle = angle;
        angle
    }

    fn correct_with_accel(&mut self, angle: &mut [f32; 3], accel: Vector3<f32>, dt: f32) {
        let k = smoothing_factor(self.calibration.lowpass_cutoff, dt);
        let smooth = match self.accel_smooth {
            Some(previous) => previous + (accel - previous) * k,
            None => accel,
        };
        self.accel_smooth = Some(smooth);

        self.accel_trust = accel_trust(smooth.norm() / self.calibration.acc1g as f32);
        if self.accel_trust <= 0.0 {
            return;
        }

        let gain = (1.0 - self.config.alpha()) * self.accel_trust;
        let (roll_ref, pitch_ref) = accel_reference(&smooth);
        angle[ROLL] = wrap_pi(angle[ROLL] + gain * wrap_pi(roll_ref - angle[ROLL]));
        angle[PITCH] = wrap_pi(angle[PITCH] + gain * wrap_pi(pitch_ref - angle[PITCH]));
    }

    /// Roll, pitch, yaw from the last `update()`.
    pub fn current_angles(&self) -> [f32; 3] {
        self.state.angle
    }

    /// Read-only view of the estimator state.
    pub fn state(&self) -> &AttitudeState {
        &self.state
    }

    /// Calibrating until both gyro and accelerometer countdowns finish.
    pub fn phase(&self) -> EstimatorPhase {
        let remaining = self.gyro_cal.remaining().max(self.accel_cal.remaining());
        if remaining > 0 {
            EstimatorPhase::Calibrating { remaining }
        } else {
            EstimatorPhase::Stable
        }
    }

    /// Gyro zero-rate bias in counts (zero until calibrated).
    pub fn gyro_bias(&self) -> [f32; 3] {
        [self.gyro_bias.x, self.gyro_bias.y, self.gyro_bias.z]
    }

    /// Accelerometer zero offset in counts (zero until calibrated).
    pub fn accel_zero(&self) -> [f32; 3] {
        [self.accel_zero.x, self.accel_zero.y, self.accel_zero.z]
    }

    /// Weight given to the accelerometer on the last update, in [0, 1].
    pub fn accel_trust(&self) -> f32 {
        self.accel_trust
    }

    /// Armed flag passed to the last `update()`.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// IMU scale factors in use.
    pub fn calibration(&self) -> &ImuCalibration {
        &self.calibration
    }

    /// Filter configuration in use.
    pub fn config(&self) -> &AttitudeConfig {
        &self.config
    }
}

fn widen(counts: [i16; 3]) -> [i32; 3] {
    [counts[0] as i32, counts[1] as i32, counts[2] as i32]
}

fn to_vector(counts: [i32; 3]) -> Vector3<f32> {
    Vector3::new(counts[0] as f32, counts[1] as f32, counts[2] as f32)
}

/// Roll and pitch of the gravity vector measured by the accelerometer.
fn accel_reference(accel: &Vector3<f32>) -> (f32, f32) {
    let roll = atan2f(accel.y, accel.z);
    let pitch = atan2f(-accel.x, sqrtf(accel.y * accel.y + accel.z * accel.z));
    (roll, pitch)
}

/// Trust weight for an accelerometer magnitude expressed in g.
fn accel_trust(magnitude_g: f32) -> f32 {
    if !magnitude_g.is_finite() {
        return 0.0;
    }
    let error = (magnitude_g - 1.0).abs();
    if error <= ACC_TRUST_FULL {
        1.0
    } else if error >= ACC_TRUST_NONE {
        0.0
    } else {
        (ACC_TRUST_NONE - error) / (ACC_TRUST_NONE - ACC_TRUST_FULL)
    }
}
