use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::peripheral::imu::AccelBounds;
use crate::peripheral::mpu9250::{AccelRange, Dlpf, MPU9250_ADDRESS};
use crate::peripheral::I2cDevice;

/// Settings applied by [`crate::Motion::init`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub bus: u8,
    pub address: u16,
    /// Time given to put the sensor down flat before offsets are measured
    pub settle_time: Duration,
    /// Replaces the measured accelerometer offsets when set
    pub acc_bounds: Option<AccelBounds>,
    pub sample_rate_divider: u8,
    pub acc_range: AccelRange,
    /// `None` bypasses the accelerometer filter
    pub acc_dlpf: Option<Dlpf>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            bus: I2cDevice::DEFAULT_BUS,
            address: MPU9250_ADDRESS,
            settle_time: Duration::from_secs(1),
            acc_bounds: None,
            sample_rate_divider: 5,
            acc_range: AccelRange::G2,
            acc_dlpf: Some(Dlpf::_6),
        }
    }
}
