//! Estimation loop and Embassy task
//!
//! One `tick()` per control loop period: read the IMU, update attitude,
//! and every `baro_divider` ticks read the barometer. While the barometer is
//! calibrating the tick feeds its ground reference; afterwards it refreshes
//! altitude and climb rate using the measured time since the previous
//! barometer tick. Altitude is only read once the ground reference is
//! fixed, which also guarantees a full pressure window. Every tick publishes
//! an [`EstimateSnapshot`].

use super::state::{EstimateSnapshot, SharedEstimateState};
use kestrel_core::estimation::{
    AltitudeEstimator, AttitudeEstimator, EstimatorError, EstimatorPhase, RawImuSample,
    DEFAULT_HISTORY_SIZE,
};
use kestrel_core::parameters::{BaroParams, ImuParams};
use kestrel_core::traits::{HardwareClock, ImuSource, PressureSource};

/// Log one accelerometer rejection out of this many consecutive ones
const ACCEL_REJECT_LOG_INTERVAL: u32 = 500;

/// Attitude and altitude estimators driven from a single control loop
///
/// `C` is cloned into the attitude estimator, so it should be a cheap
/// handle onto one time base (`EmbassyClock`, `&MockClock`).
pub struct EstimationLoop<I, P, C, const N: usize = DEFAULT_HISTORY_SIZE>
where
    I: ImuSource,
    P: PressureSource,
    C: HardwareClock + Clone,
{
    imu: I,
    clock: C,
    attitude: AttitudeEstimator<C>,
    altitude: AltitudeEstimator<P, N>,
    looptime_us: u32,
    baro_divider: u16,
    baro_ticks: u16,
    last_baro_us: Option<u32>,
    altitude_cm: i32,
    velocity_cm_s: i32,
    attitude_stable: bool,
    altitude_stable: bool,
    accel_rejections: u32,
    sequence: u32,
}

impl<I, P, C, const N: usize> EstimationLoop<I, P, C, N>
where
    I: ImuSource,
    P: PressureSource,
    C: HardwareClock + Clone,
{
    /// Build both estimators from parameters and start calibration.
    ///
    /// IMU scale factors come from the driver; everything else from the
    /// parameter blocks.
    pub fn new(
        imu: I,
        pressure: P,
        clock: C,
        imu_params: &ImuParams,
        baro_params: &BaroParams,
    ) -> Result<Self, EstimatorError> {
        let calibration = imu_params.imu_calibration(&imu).inspect_err(|e| {
            crate::log_error!("estimation: IMU calibration rejected: {}", e.as_str());
        })?;
        let attitude_config = imu_params.attitude_config();
        let attitude = AttitudeEstimator::new(calibration, attitude_config, clock.clone())
            .inspect_err(|e| {
                crate::log_error!("estimation: attitude config rejected: {}", e.as_str());
            })?;
        let altitude = AltitudeEstimator::new(baro_params.barometer_config(), pressure)
            .inspect_err(|e| {
                crate::log_error!("estimation: barometer config rejected: {}", e.as_str());
            })?;

        if baro_params.divider == 0 {
            crate::log_warn!("estimation: BARO_DIV 0 clamped to 1");
        }

        let estimation = Self {
            imu,
            clock,
            attitude,
            altitude,
            looptime_us: attitude_config.looptime_us,
            baro_divider: baro_params.divider.max(1),
            baro_ticks: 0,
            last_baro_us: None,
            altitude_cm: 0,
            velocity_cm_s: 0,
            attitude_stable: false,
            altitude_stable: false,
            accel_rejections: 0,
            sequence: 0,
        };
        estimation.log_calibration_start();
        Ok(estimation)
    }

    /// Restart calibration of both estimators.
    pub fn reinit(&mut self) {
        self.attitude.init();
        self.altitude.init();
        self.baro_ticks = 0;
        self.last_baro_us = None;
        self.altitude_cm = 0;
        self.velocity_cm_s = 0;
        self.attitude_stable = false;
        self.altitude_stable = false;
        self.accel_rejections = 0;
        self.log_calibration_start();
    }

    /// Run one loop iteration and publish the result to `shared`.
    pub fn tick(&mut self, armed: bool, shared: &SharedEstimateState) -> EstimateSnapshot {
        let now = self.clock.now_micros();

        let sample = RawImuSample::read_from(&mut self.imu);
        let angles = self.attitude.update(armed, &sample);
        self.track_attitude();

        self.baro_ticks += 1;
        if self.baro_ticks >= self.baro_divider {
            self.baro_ticks = 0;
            self.step_barometer(now);
        }

        self.sequence = self.sequence.wrapping_add(1);
        let snapshot = EstimateSnapshot {
            angles,
            altitude_cm: self.altitude_cm,
            velocity_cm_s: self.velocity_cm_s,
            attitude_phase: self.attitude.phase(),
            altitude_phase: self.altitude.phase(),
            armed,
            timestamp_us: now,
            sequence: self.sequence,
        };
        shared.write(snapshot);
        snapshot
    }

    fn step_barometer(&mut self, now: u32) {
        self.altitude.update();

        if !self.altitude_stable {
            if self.altitude.calibrate().is_done() {
                self.altitude_stable = true;
                crate::log_info!(
                    "estimation: ground reference {} Pa, {} cm",
                    self.altitude.ground_pressure() / 8,
                    self.altitude.ground_altitude()
                );
            }
        } else {
            let dt_us = match self.last_baro_us {
                Some(previous) => now.wrapping_sub(previous),
                None => self.looptime_us.saturating_mul(self.baro_divider as u32),
            };
            if dt_us == 0 {
                crate::log_warn!("estimation: zero barometer interval clamped to 1 us");
            }
            self.altitude_cm = self.altitude.get_altitude();
            self.velocity_cm_s = self.altitude.get_velocity(dt_us.max(1));
            crate::log_trace!(
                "estimation: alt {} cm vel {} cm/s",
                self.altitude_cm,
                self.velocity_cm_s
            );
        }

        self.last_baro_us = Some(now);
    }

    fn track_attitude(&mut self) {
        let stable = self.attitude.phase().is_stable();
        if stable && !self.attitude_stable {
            let bias = self.attitude.gyro_bias();
            let zero = self.attitude.accel_zero();
            crate::log_info!(
                "estimation: gyro bias {} {} {}, accel zero {} {} {}",
                bias[0],
                bias[1],
                bias[2],
                zero[0],
                zero[1],
                zero[2]
            );
        }
        self.attitude_stable = stable;

        if !stable {
            return;
        }
        if self.attitude.accel_trust() <= 0.0 {
            if self.accel_rejections % ACCEL_REJECT_LOG_INTERVAL == 0 {
                crate::log_warn!(
                    "estimation: accelerometer rejected ({} consecutive)",
                    self.accel_rejections + 1
                );
            }
            self.accel_rejections = self.accel_rejections.saturating_add(1);
        } else {
            self.accel_rejections = 0;
        }
    }

    fn log_calibration_start(&self) {
        let attitude = self.attitude.state();
        crate::log_info!(
            "estimation: calibrating gyro {} accel {} baro {} samples",
            attitude.calibrating_gyro_samples_remaining,
            attitude.calibrating_accel_samples_remaining,
            self.altitude.phase().remaining()
        );
    }

    /// Attitude estimator
    pub fn attitude(&self) -> &AttitudeEstimator<C> {
        &self.attitude
    }

    /// Altitude estimator
    pub fn altitude(&self) -> &AltitudeEstimator<P, N> {
        &self.altitude
    }

    /// Mutable altitude estimator (gives access to the pressure source)
    pub fn altitude_mut(&mut self) -> &mut AltitudeEstimator<P, N> {
        &mut self.altitude
    }

    /// IMU source
    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }

    /// Loop period in microseconds
    pub fn looptime_us(&self) -> u32 {
        self.looptime_us
    }

    /// Loop ticks per barometer update
    pub fn baro_divider(&self) -> u16 {
        self.baro_divider
    }

    /// Consecutive ticks on which the accelerometer carried no weight
    pub fn accel_rejections(&self) -> u32 {
        self.accel_rejections
    }

    /// Phases of the attitude and altitude estimators
    pub fn phases(&self) -> (EstimatorPhase, EstimatorPhase) {
        (self.attitude.phase(), self.altitude.phase())
    }
}

/// Estimation task entry point (for Embassy executor)
///
/// Ticks `estimation` at its looptime forever. `armed` is sampled once per
/// tick.
///
/// # Example (conceptual)
///
/// ```ignore
/// static ESTIMATE: SharedEstimateState = SharedEstimateState::new();
///
/// #[embassy_executor::task]
/// async fn estimation_task(estimation: EstimationLoop<Mpu6050, Bmp280, EmbassyClock>) {
///     run_estimation_task(estimation, &ESTIMATE, || ARMED.load(Ordering::Relaxed)).await
/// }
/// ```
#[cfg(feature = "embassy")]
pub async fn run_estimation_task<I, P, C, const N: usize, F>(
    mut estimation: EstimationLoop<I, P, C, N>,
    shared: &SharedEstimateState,
    mut armed: F,
) where
    I: ImuSource,
    P: PressureSource,
    C: HardwareClock + Clone,
    F: FnMut() -> bool,
{
    use embassy_time::{Duration, Ticker};

    let mut ticker = Ticker::every(Duration::from_micros(estimation.looptime_us() as u64));
    crate::log_info!(
        "estimation: task started, {} us loop, baro every {} ticks",
        estimation.looptime_us(),
        estimation.baro_divider()
    );

    loop {
        ticker.next().await;
        estimation.tick(armed(), shared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::estimation::MIN_CALIBRATION_CYCLES;
    use kestrel_core::traits::{MockClock, MockImu, MockPressure};

    const LOOP_US: u32 = 3_500;

    fn imu_params() -> ImuParams {
        ImuParams {
            // 7 ms at 3.5 ms per loop = 2 gyro samples
            gyro_cal_ms: 7,
            accel_cal_samples: 2,
            ..ImuParams::default()
        }
    }

    fn baro_params() -> BaroParams {
        BaroParams {
            cal_cycles: MIN_CALIBRATION_CYCLES,
            divider: 2,
            ..BaroParams::default()
        }
    }

    fn build(clock: &MockClock) -> EstimationLoop<MockImu, MockPressure, &MockClock, 4> {
        EstimationLoop::new(
            MockImu::new(),
            MockPressure::new(101_325.0),
            clock,
            &imu_params(),
            &baro_params(),
        )
        .unwrap()
    }

    fn run(
        estimation: &mut EstimationLoop<MockImu, MockPressure, &MockClock, 4>,
        clock: &MockClock,
        shared: &SharedEstimateState,
        ticks: u32,
    ) -> EstimateSnapshot {
        let mut snapshot = shared.read();
        for _ in 0..ticks {
            clock.advance(LOOP_US);
            snapshot = estimation.tick(false, shared);
        }
        snapshot
    }

    #[test]
    fn test_calibration_phases() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);

        // 3 barometer cycles fill the window, the 4th fills it and calibrates
        let snapshot = run(&mut estimation, &clock, &shared, 1);
        assert_eq!(snapshot.attitude_phase, EstimatorPhase::Calibrating { remaining: 1 });
        assert_eq!(snapshot.altitude_phase, EstimatorPhase::Calibrating { remaining: 113 });

        let snapshot = run(&mut estimation, &clock, &shared, 1);
        assert_eq!(snapshot.attitude_phase, EstimatorPhase::Stable);
        assert_eq!(snapshot.altitude_phase, EstimatorPhase::Calibrating { remaining: 112 });

        // Barometer runs on every second tick
        let snapshot = run(&mut estimation, &clock, &shared, 222);
        assert_eq!(snapshot.altitude_phase, EstimatorPhase::Calibrating { remaining: 1 });
        assert!(!snapshot.is_ready());

        let snapshot = run(&mut estimation, &clock, &shared, 2);
        assert_eq!(snapshot.altitude_phase, EstimatorPhase::Stable);
        assert!(snapshot.is_ready());
        assert_eq!(snapshot.sequence, 226);
    }

    #[test]
    fn test_tick_publishes_snapshot() {
        let clock = MockClock::with_initial(1_000);
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);

        clock.advance(LOOP_US);
        let snapshot = estimation.tick(true, &shared);
        assert_eq!(shared.read(), snapshot);
        assert!(snapshot.armed);
        assert_eq!(snapshot.timestamp_us, 1_000 + LOOP_US);
        assert_eq!(snapshot.sequence, 1);
    }

    #[test]
    fn test_level_and_still_settles() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);

        let before = run(&mut estimation, &clock, &shared, 400);
        let after = run(&mut estimation, &clock, &shared, 2);

        assert!(after.is_ready());
        for angle in after.angles {
            assert!(angle.abs() < 1e-3);
        }
        assert_eq!(before.altitude_cm, 0);
        assert_eq!(after.altitude_cm, 0);
        assert_eq!(after.velocity_cm_s, 0);
        assert_eq!(estimation.accel_rejections(), 0);
    }

    #[test]
    fn test_climb_clamped_to_bound() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);
        let settled = run(&mut estimation, &clock, &shared, 400);

        // About 10 m higher: the first barometer tick sees a fast climb
        estimation
            .altitude_mut()
            .source_mut()
            .set_pressure(101_325.0 - 120.0);
        let climbing = run(&mut estimation, &clock, &shared, 2);

        assert!(climbing.altitude_cm > settled.altitude_cm);
        assert_eq!(climbing.velocity_cm_s, 300);
    }

    #[test]
    fn test_accelerometer_rejection_counted() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);
        run(&mut estimation, &clock, &shared, 10);

        // 2g: well outside the trusted band
        estimation.imu_mut().set_accel([0, 0, 8_192]);
        run(&mut estimation, &clock, &shared, 200);
        assert!(estimation.accel_rejections() > 0);

        estimation.imu_mut().set_accel([0, 0, 4_096]);
        run(&mut estimation, &clock, &shared, 400);
        assert_eq!(estimation.accel_rejections(), 0);
    }

    #[test]
    fn test_reinit_restarts_calibration() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = build(&clock);
        assert!(run(&mut estimation, &clock, &shared, 240).is_ready());

        estimation.reinit();
        let (attitude, altitude) = estimation.phases();
        assert_eq!(attitude, EstimatorPhase::Calibrating { remaining: 2 });
        assert_eq!(altitude, EstimatorPhase::Calibrating { remaining: 113 });

        let snapshot = run(&mut estimation, &clock, &shared, 1);
        assert!(!snapshot.is_ready());
        assert_eq!(snapshot.sequence, 241);
        assert_eq!(snapshot.altitude_cm, 0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let clock = MockClock::new();
        let params = ImuParams {
            gyro_cmpf: 0.0,
            ..ImuParams::default()
        };
        let result = EstimationLoop::<_, _, _, 4>::new(
            MockImu::new(),
            MockPressure::new(101_325.0),
            &clock,
            &params,
            &BaroParams::default(),
        );
        assert!(matches!(result, Err(EstimatorError::InvalidComplementaryFactor)));

        let result = EstimationLoop::<_, _, _, 4>::new(
            MockImu::new().with_scale(0, 16.4),
            MockPressure::new(101_325.0),
            &clock,
            &ImuParams::default(),
            &BaroParams::default(),
        );
        assert!(matches!(result, Err(EstimatorError::InvalidAccel1g)));
    }

    #[test]
    fn test_zero_divider_clamped() {
        let clock = MockClock::new();
        let params = BaroParams {
            divider: 0,
            ..baro_params()
        };
        let estimation = EstimationLoop::<_, _, _, 4>::new(
            MockImu::new(),
            MockPressure::new(101_325.0),
            &clock,
            &imu_params(),
            &params,
        )
        .unwrap();
        assert_eq!(estimation.baro_divider(), 1);
    }

    #[test]
    fn test_ground_reference_off_site_reads_zero_at_rest() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let mut estimation = EstimationLoop::<_, _, _, 4>::new(
            MockImu::new(),
            MockPressure::new(89_875.0),
            &clock,
            &imu_params(),
            &baro_params(),
        )
        .unwrap();

        let mut ready_at = None;
        for tick in 1..=240u32 {
            clock.advance(LOOP_US);
            let snapshot = estimation.tick(false, &shared);
            if snapshot.is_ready() && ready_at.is_none() {
                ready_at = Some(tick);
            }
            if ready_at.is_some() {
                assert_eq!(snapshot.altitude_cm, 0, "tick {}", tick);
            }
        }

        assert_eq!(ready_at, Some(226));
        assert_eq!(estimation.altitude().ground_pressure() / 8, 89_875);
        assert_eq!(shared.read().velocity_cm_s, 0);
    }

    #[test]
    fn test_uncalibrated_barometer_waits_for_full_window() {
        let clock = MockClock::new();
        let shared = SharedEstimateState::new();
        let params = BaroParams {
            cal_cycles: 0,
            divider: 1,
            ..BaroParams::default()
        };
        let mut estimation = EstimationLoop::<_, _, _, 4>::new(
            MockImu::new(),
            MockPressure::new(101_325.0),
            &clock,
            &imu_params(),
            &params,
        )
        .unwrap();

        for _ in 0..3 {
            clock.advance(LOOP_US);
            let snapshot = estimation.tick(false, &shared);
            assert!(!snapshot.altitude_phase.is_stable());
        }

        clock.advance(LOOP_US);
        let snapshot = estimation.tick(false, &shared);
        assert_eq!(snapshot.altitude_phase, EstimatorPhase::Stable);

        let snapshot = run(&mut estimation, &clock, &shared, 1);
        assert_eq!(snapshot.altitude_cm, 0);
    }
}
