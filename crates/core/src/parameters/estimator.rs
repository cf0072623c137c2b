//! Estimator Parameter Definitions
//!
//! # Parameters
//!
//! - `INS_LOOP_US` - Control loop period in microseconds
//! - `INS_GYR_CAL_MS` - Gyro calibration window in milliseconds
//! - `INS_ACC_CAL_N` - Accelerometer calibration samples (0 disables)
//! - `INS_GYRO_CMPF` - Complementary filter factor, `α = f / (f + 1)`
//! - `INS_ACC_LPF_HZ` - Accelerometer low-pass cutoff in Hz (0 disables)
//! - `INS_MAX_DT_US` - Longest interval integrated in one attitude step
//! - `BARO_NOISE_LPF` - Weight kept from the previous altitude
//! - `BARO_VEL_BOUND` - Climb rate limit in cm/s
//! - `BARO_VEL_DB` - Climb rate deadband in cm/s
//! - `BARO_CAL_N` - Ground calibration cycles (at least 110)
//! - `BARO_DIV` - Barometer update every N loop ticks

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use crate::estimation::{
    AttitudeConfig, BarometerConfig, EstimatorError, ImuCalibration, MIN_CALIBRATION_CYCLES,
};
use crate::traits::ImuSource;

const DEFAULT_LOOP_US: i32 = 3_500;
const DEFAULT_GYRO_CAL_MS: i32 = 3_500;
const DEFAULT_ACC_CAL_N: i32 = 400;
const DEFAULT_GYRO_CMPF: f32 = 600.0;
const DEFAULT_ACC_LPF_HZ: f32 = 5.0;
const DEFAULT_MAX_DT_US: i32 = 50_000;

const MIN_LOOP_US: i32 = 500;
const MAX_LOOP_US: i32 = 20_000;
const MAX_GYRO_CAL_MS: i32 = 10_000;
const MIN_GYRO_CMPF: f32 = 1.0;
const MAX_GYRO_CMPF: f32 = 10_000.0;
const MAX_ACC_LPF_HZ: f32 = 100.0;
const MAX_MAX_DT_US: i32 = 1_000_000;

const DEFAULT_NOISE_LPF: f32 = 0.5;
const DEFAULT_VEL_BOUND: i32 = 300;
const DEFAULT_VEL_DB: i32 = 10;
const DEFAULT_BARO_CAL_N: i32 = 200;
const DEFAULT_BARO_DIV: i32 = 10;

const MIN_VEL_BOUND: i32 = 1;
const MAX_VEL_BOUND: i32 = 5_000;
const MAX_BARO_DIV: i32 = 100;

fn read_int(store: &ParameterStore, name: &str, default: i32, min: i32, max: i32) -> i32 {
    store
        .get(name)
        .and_then(ParamValue::as_int)
        .map_or(default, |v| v.clamp(min, max))
}

fn read_float(store: &ParameterStore, name: &str, default: f32, min: f32, max: f32) -> f32 {
    store
        .get(name)
        .and_then(ParamValue::as_float)
        .map_or(default, |v| v.clamp(min, max))
}

/// IMU and attitude filter parameters loaded from parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct ImuParams {
    /// Control loop period in microseconds
    pub loop_us: u32,
    /// Gyro calibration window in milliseconds
    pub gyro_cal_ms: u32,
    /// Accelerometer calibration sample count
    pub accel_cal_samples: u16,
    /// Complementary filter factor
    pub gyro_cmpf: f32,
    /// Accelerometer low-pass cutoff in Hz
    pub accel_lpf_hz: f32,
    /// Longest integrated interval in microseconds
    pub max_dt_us: u32,
}

impl Default for ImuParams {
    fn default() -> Self {
        Self {
            loop_us: DEFAULT_LOOP_US as u32,
            gyro_cal_ms: DEFAULT_GYRO_CAL_MS as u32,
            accel_cal_samples: DEFAULT_ACC_CAL_N as u16,
            gyro_cmpf: DEFAULT_GYRO_CMPF,
            accel_lpf_hz: DEFAULT_ACC_LPF_HZ,
            max_dt_us: DEFAULT_MAX_DT_US as u32,
        }
    }
}

impl ImuParams {
    /// Register IMU parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("INS_LOOP_US", ParamValue::Int(DEFAULT_LOOP_US), ParamFlags::empty())?;
        store.register(
            "INS_GYR_CAL_MS",
            ParamValue::Int(DEFAULT_GYRO_CAL_MS),
            ParamFlags::empty(),
        )?;
        store.register(
            "INS_ACC_CAL_N",
            ParamValue::Int(DEFAULT_ACC_CAL_N),
            ParamFlags::empty(),
        )?;
        store.register(
            "INS_GYRO_CMPF",
            ParamValue::Float(DEFAULT_GYRO_CMPF),
            ParamFlags::empty(),
        )?;
        store.register(
            "INS_ACC_LPF_HZ",
            ParamValue::Float(DEFAULT_ACC_LPF_HZ),
            ParamFlags::empty(),
        )?;
        store.register(
            "INS_MAX_DT_US",
            ParamValue::Int(DEFAULT_MAX_DT_US),
            ParamFlags::empty(),
        )?;
        Ok(())
    }

    /// Load IMU parameters, clamping out-of-range values
    ///
    /// Missing or non-numeric entries fall back to the defaults.
    pub fn from_store(store: &ParameterStore) -> Self {
        let loop_us = read_int(store, "INS_LOOP_US", DEFAULT_LOOP_US, MIN_LOOP_US, MAX_LOOP_US);
        // The step clamp must never be shorter than one loop period
        let max_dt_us = read_int(
            store,
            "INS_MAX_DT_US",
            DEFAULT_MAX_DT_US,
            loop_us,
            MAX_MAX_DT_US,
        );

        Self {
            loop_us: loop_us as u32,
            gyro_cal_ms: read_int(store, "INS_GYR_CAL_MS", DEFAULT_GYRO_CAL_MS, 0, MAX_GYRO_CAL_MS)
                as u32,
            accel_cal_samples: read_int(
                store,
                "INS_ACC_CAL_N",
                DEFAULT_ACC_CAL_N,
                0,
                u16::MAX as i32,
            ) as u16,
            gyro_cmpf: read_float(
                store,
                "INS_GYRO_CMPF",
                DEFAULT_GYRO_CMPF,
                MIN_GYRO_CMPF,
                MAX_GYRO_CMPF,
            ),
            accel_lpf_hz: read_float(store, "INS_ACC_LPF_HZ", DEFAULT_ACC_LPF_HZ, 0.0, MAX_ACC_LPF_HZ),
            max_dt_us: max_dt_us as u32,
        }
    }

    /// Validate IMU parameters
    pub fn is_valid(&self) -> bool {
        let loop_us = self.loop_us as i32;
        (MIN_LOOP_US..=MAX_LOOP_US).contains(&loop_us)
            && self.gyro_cal_ms <= MAX_GYRO_CAL_MS as u32
            && (MIN_GYRO_CMPF..=MAX_GYRO_CMPF).contains(&self.gyro_cmpf)
            && (0.0..=MAX_ACC_LPF_HZ).contains(&self.accel_lpf_hz)
            && self.max_dt_us >= self.loop_us
            && self.max_dt_us <= MAX_MAX_DT_US as u32
    }

    /// Attitude filter timing configuration
    pub fn attitude_config(&self) -> AttitudeConfig {
        AttitudeConfig {
            looptime_us: self.loop_us,
            gyro_calibration_ms: self.gyro_cal_ms,
            accel_calibration_samples: self.accel_cal_samples,
            gyro_cmpf_factor: self.gyro_cmpf,
            max_dt_us: self.max_dt_us,
        }
    }

    /// Combine the driver's scale factors with the configured low-pass cutoff
    pub fn imu_calibration<I: ImuSource>(&self, imu: &I) -> Result<ImuCalibration, EstimatorError> {
        ImuCalibration::from_source(imu, self.accel_lpf_hz)
    }
}

/// Barometer filter parameters loaded from parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct BaroParams {
    /// Weight kept from the previous altitude
    pub noise_lpf: f32,
    /// Climb rate limit in cm/s
    pub vel_bound: i32,
    /// Climb rate deadband in cm/s
    pub vel_deadband: i32,
    /// Ground calibration cycles, never below [`MIN_CALIBRATION_CYCLES`]
    pub cal_cycles: u16,
    /// Loop ticks per barometer update
    pub divider: u16,
}

impl Default for BaroParams {
    fn default() -> Self {
        Self {
            noise_lpf: DEFAULT_NOISE_LPF,
            vel_bound: DEFAULT_VEL_BOUND,
            vel_deadband: DEFAULT_VEL_DB,
            cal_cycles: DEFAULT_BARO_CAL_N as u16,
            divider: DEFAULT_BARO_DIV as u16,
        }
    }
}

impl BaroParams {
    /// Register barometer parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register(
            "BARO_NOISE_LPF",
            ParamValue::Float(DEFAULT_NOISE_LPF),
            ParamFlags::empty(),
        )?;
        store.register(
            "BARO_VEL_BOUND",
            ParamValue::Int(DEFAULT_VEL_BOUND),
            ParamFlags::empty(),
        )?;
        store.register("BARO_VEL_DB", ParamValue::Int(DEFAULT_VEL_DB), ParamFlags::empty())?;
        store.register(
            "BARO_CAL_N",
            ParamValue::Int(DEFAULT_BARO_CAL_N),
            ParamFlags::empty(),
        )?;
        store.register("BARO_DIV", ParamValue::Int(DEFAULT_BARO_DIV), ParamFlags::empty())?;
        Ok(())
    }

    /// Load barometer parameters, clamping out-of-range values
    pub fn from_store(store: &ParameterStore) -> Self {
        let vel_bound = read_int(
            store,
            "BARO_VEL_BOUND",
            DEFAULT_VEL_BOUND,
            MIN_VEL_BOUND,
            MAX_VEL_BOUND,
        );

        Self {
            noise_lpf: read_float(store, "BARO_NOISE_LPF", DEFAULT_NOISE_LPF, 0.0, 1.0),
            vel_bound,
            // A deadband wider than the clamp would zero every climb rate
            vel_deadband: read_int(store, "BARO_VEL_DB", DEFAULT_VEL_DB, 0, vel_bound),
            cal_cycles: read_int(
                store,
                "BARO_CAL_N",
                DEFAULT_BARO_CAL_N,
                MIN_CALIBRATION_CYCLES as i32,
                u16::MAX as i32,
            ) as u16,
            divider: read_int(store, "BARO_DIV", DEFAULT_BARO_DIV, 1, MAX_BARO_DIV) as u16,
        }
    }

    /// Validate barometer parameters
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.noise_lpf)
            && (MIN_VEL_BOUND..=MAX_VEL_BOUND).contains(&self.vel_bound)
            && (0..=self.vel_bound).contains(&self.vel_deadband)
            && self.cal_cycles >= MIN_CALIBRATION_CYCLES
            && (1..=MAX_BARO_DIV as u16).contains(&self.divider)
    }

    /// Barometer filter configuration
    pub fn barometer_config(&self) -> BarometerConfig {
        BarometerConfig {
            noise_lpf: self.noise_lpf,
            velocity_bound: self.vel_bound,
            velocity_deadband: self.vel_deadband,
            calibration_cycles: self.cal_cycles,
            ..BarometerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockImu;

    const EPSILON: f32 = 1e-6;

    fn store() -> ParameterStore {
        let mut store = ParameterStore::new();
        ImuParams::register_defaults(&mut store).unwrap();
        BaroParams::register_defaults(&mut store).unwrap();
        store
    }

    #[test]
    fn test_defaults_match_store() {
        let store = store();
        assert_eq!(store.len(), 11);
        assert_eq!(ImuParams::from_store(&store), ImuParams::default());
        assert_eq!(BaroParams::from_store(&store), BaroParams::default());
        assert!(ImuParams::default().is_valid());
        assert!(BaroParams::default().is_valid());
    }

    #[test]
    fn test_default_configs_match_estimator_defaults() {
        assert_eq!(ImuParams::default().attitude_config(), AttitudeConfig::default());
        assert_eq!(BaroParams::default().barometer_config(), BarometerConfig::default());
        assert_eq!(
            ImuParams::default().attitude_config().gyro_calibration_samples(),
            1000
        );
    }

    #[test]
    fn test_imu_params_custom() {
        let mut store = store();
        store.set("INS_LOOP_US", ParamValue::Int(2_000)).unwrap();
        store.set("INS_GYRO_CMPF", ParamValue::Int(300)).unwrap();
        store.set("INS_ACC_LPF_HZ", ParamValue::Float(0.0)).unwrap();

        let params = ImuParams::from_store(&store);
        assert_eq!(params.loop_us, 2_000);
        assert!((params.gyro_cmpf - 300.0).abs() < EPSILON);
        assert_eq!(params.accel_lpf_hz, 0.0);
        assert!(params.is_valid());

        let config = params.attitude_config();
        assert_eq!(config.looptime_us, 2_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_imu_params_clamp() {
        let mut store = store();
        store.set("INS_LOOP_US", ParamValue::Int(0)).unwrap();
        store.set("INS_GYRO_CMPF", ParamValue::Float(-5.0)).unwrap();
        store.set("INS_ACC_CAL_N", ParamValue::Int(-1)).unwrap();
        store.set("INS_MAX_DT_US", ParamValue::Int(10)).unwrap();

        let params = ImuParams::from_store(&store);
        assert_eq!(params.loop_us, MIN_LOOP_US as u32);
        assert!((params.gyro_cmpf - MIN_GYRO_CMPF).abs() < EPSILON);
        assert_eq!(params.accel_cal_samples, 0);
        assert_eq!(params.max_dt_us, params.loop_us);
        assert!(params.is_valid());
    }

    #[test]
    fn test_imu_params_wrong_type_falls_back() {
        let mut store = store();
        store.set("INS_GYRO_CMPF", ParamValue::Bool(true)).unwrap();
        store.set("INS_ACC_LPF_HZ", ParamValue::Float(f32::NAN)).unwrap();

        let params = ImuParams::from_store(&store);
        assert!((params.gyro_cmpf - DEFAULT_GYRO_CMPF).abs() < EPSILON);
        assert!((params.accel_lpf_hz - DEFAULT_ACC_LPF_HZ).abs() < EPSILON);
    }

    #[test]
    fn test_imu_params_missing_store_uses_defaults() {
        let store = ParameterStore::new();
        assert_eq!(ImuParams::from_store(&store), ImuParams::default());
        assert_eq!(BaroParams::from_store(&store), BaroParams::default());
    }

    #[test]
    fn test_imu_calibration_from_params() {
        let imu = MockImu::new();
        let calibration = ImuParams::default().imu_calibration(&imu).unwrap();
        assert_eq!(calibration.acc1g, 4096);
        assert!((calibration.lowpass_cutoff - 5.0).abs() < EPSILON);
        assert!((calibration.gyro_scale * MockImu::MPU6050_GYRO_COUNTS_PER_RAD - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_baro_params_clamp() {
        let mut store = store();
        store.set("BARO_NOISE_LPF", ParamValue::Float(1.5)).unwrap();
        store.set("BARO_VEL_BOUND", ParamValue::Int(50)).unwrap();
        store.set("BARO_VEL_DB", ParamValue::Int(80)).unwrap();
        store.set("BARO_CAL_N", ParamValue::Int(0)).unwrap();
        store.set("BARO_DIV", ParamValue::Int(0)).unwrap();

        let params = BaroParams::from_store(&store);
        assert_eq!(params.cal_cycles, MIN_CALIBRATION_CYCLES);
        assert!((params.noise_lpf - 1.0).abs() < EPSILON);
        assert_eq!(params.vel_bound, 50);
        assert_eq!(params.vel_deadband, 50);
        assert_eq!(params.divider, 1);
        assert!(params.is_valid());
        assert!(params.barometer_config().validate().is_ok());
    }

    #[test]
    fn test_baro_params_validation() {
        let mut params = BaroParams::default();
        assert!(params.is_valid());

        params.vel_deadband = params.vel_bound + 1;
        assert!(!params.is_valid());

        let params = BaroParams {
            divider: 0,
            ..BaroParams::default()
        };
        assert!(!params.is_valid());

        let params = BaroParams {
            noise_lpf: -0.1,
            ..BaroParams::default()
        };
        assert!(!params.is_valid());

        let params = BaroParams {
            cal_cycles: 5,
            ..BaroParams::default()
        };
        assert!(!params.is_valid());
        assert_eq!(
            params.barometer_config().validate(),
            Err(EstimatorError::InvalidCalibrationCycles)
        );
    }

    #[test]
    fn test_baro_cal_cycles_short_values_raised() {
        let mut store = store();
        for requested in [1, 5, 109] {
            store.set("BARO_CAL_N", ParamValue::Int(requested)).unwrap();
            assert_eq!(BaroParams::from_store(&store).cal_cycles, MIN_CALIBRATION_CYCLES);
        }

        store.set("BARO_CAL_N", ParamValue::Int(150)).unwrap();
        let params = BaroParams::from_store(&store);
        assert_eq!(params.cal_cycles, 150);
        assert!(params.is_valid());
    }
}
