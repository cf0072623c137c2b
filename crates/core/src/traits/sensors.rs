//! Raw sensor boundary consumed by the estimators.
//!
//! Reads are non-blocking, fixed-latency register or bus reads owned by the
//! board layer. The traits take `&mut self` because a read usually clocks a
//! bus transaction, even though none of them can fail from the estimator's
//! point of view.

use heapless::Deque;

/// Raw accelerometer and gyroscope counts.
///
/// Axis order is roll, pitch, yaw (X, Y, Z) for both sensors.
pub trait ImuSource {
    /// Read raw accelerometer counts.
    fn read_accel(&mut self) -> [i16; 3];

    /// Read raw gyroscope counts.
    fn read_gyro(&mut self) -> [i16; 3];

    /// Accelerometer counts corresponding to one Earth gravity.
    fn accel_1g_reference(&self) -> u16;

    /// Gyroscope counts per rad/s of angular rate.
    fn gyro_counts_per_rad_per_sec(&self) -> f32;
}

/// Barometric pressure in Pascals.
pub trait PressureSource {
    /// Read one pressure sample.
    fn read_pressure_pascals(&mut self) -> f32;
}

impl<T: ImuSource + ?Sized> ImuSource for &mut T {
    fn read_accel(&mut self) -> [i16; 3] {
        (**self).read_accel()
    }

    fn read_gyro(&mut self) -> [i16; 3] {
        (**self).read_gyro()
    }

    fn accel_1g_reference(&self) -> u16 {
        (**self).accel_1g_reference()
    }

    fn gyro_counts_per_rad_per_sec(&self) -> f32 {
        (**self).gyro_counts_per_rad_per_sec()
    }
}

impl<T: PressureSource + ?Sized> PressureSource for &mut T {
    fn read_pressure_pascals(&mut self) -> f32 {
        (**self).read_pressure_pascals()
    }
}

// ============================================================================
// Mock Implementations (always available for testing)
// ============================================================================

/// Mock IMU returning whatever the test last set.
///
/// Defaults model an MPU6050 at ±8g / ±2000°/s: 4096 counts per g and
/// 16.4 counts per °/s.
#[derive(Debug, Clone)]
pub struct MockImu {
    accel: [i16; 3],
    gyro: [i16; 3],
    acc_1g: u16,
    gyro_counts_per_rad: f32,
    reads: u32,
}

impl MockImu {
    /// MPU6050 accelerometer counts per g at ±8g.
    pub const MPU6050_ACC_1G: u16 = 4096;

    /// MPU6050 gyro counts per rad/s at ±2000°/s (16.4 LSB per °/s).
    pub const MPU6050_GYRO_COUNTS_PER_RAD: f32 = 16.4 * 180.0 / core::f32::consts::PI;

    /// Create a level, motionless MPU6050-like IMU.
    pub fn new() -> Self {
        Self {
            accel: [0, 0, Self::MPU6050_ACC_1G as i16],
            gyro: [0; 3],
            acc_1g: Self::MPU6050_ACC_1G,
            gyro_counts_per_rad: Self::MPU6050_GYRO_COUNTS_PER_RAD,
            reads: 0,
        }
    }

    /// Override the sensor scale factors.
    pub fn with_scale(mut self, acc_1g: u16, gyro_counts_per_rad: f32) -> Self {
        self.acc_1g = acc_1g;
        self.gyro_counts_per_rad = gyro_counts_per_rad;
        self
    }

    /// Set the accelerometer counts returned by subsequent reads.
    pub fn set_accel(&mut self, accel: [i16; 3]) {
        self.accel = accel;
    }

    /// Set the gyroscope counts returned by subsequent reads.
    pub fn set_gyro(&mut self, gyro: [i16; 3]) {
        self.gyro = gyro;
    }

    /// Number of gyro reads served so far.
    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl Default for MockImu {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuSource for MockImu {
    fn read_accel(&mut self) -> [i16; 3] {
        self.accel
    }

    fn read_gyro(&mut self) -> [i16; 3] {
        self.reads = self.reads.wrapping_add(1);
        self.gyro
    }

    fn accel_1g_reference(&self) -> u16 {
        self.acc_1g
    }

    fn gyro_counts_per_rad_per_sec(&self) -> f32 {
        self.gyro_counts_per_rad
    }
}

/// Capacity of the `MockPressure` script queue.
pub const PRESSURE_SCRIPT_LEN: usize = 64;

/// Mock barometer.
///
/// Serves queued samples first, then keeps returning the held value (the
/// last queued sample, or the one passed to `set_pressure`).
#[derive(Debug, Clone)]
pub struct MockPressure {
    script: Deque<f32, PRESSURE_SCRIPT_LEN>,
    held: f32,
}

impl MockPressure {
    /// Create a barometer reading a constant pressure.
    pub fn new(pascals: f32) -> Self {
        Self {
            script: Deque::new(),
            held: pascals,
        }
    }

    /// Set the pressure returned once the script is exhausted.
    pub fn set_pressure(&mut self, pascals: f32) {
        self.held = pascals;
    }

    /// Queue a sample. Returns `false` when the script is full.
    pub fn push(&mut self, pascals: f32) -> bool {
        self.script.push_back(pascals).is_ok()
    }

    /// Number of queued samples not yet read.
    pub fn pending(&self) -> usize {
        self.script.len()
    }
}

impl PressureSource for MockPressure {
    fn read_pressure_pascals(&mut self) -> f32 {
        if let Some(pascals) = self.script.pop_front() {
            self.held = pascals;
        }
        self.held
    }
}
