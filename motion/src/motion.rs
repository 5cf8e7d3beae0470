use std::thread;

use anyhow::Context;
use common::types::{Celsius, Degrees, Vector3};
use tracing::{error, info, trace};

use crate::config::MotionConfig;
use crate::peripheral::imu::Mpu9250;
use crate::peripheral::{Device, I2cDevice};

/// Calibrated MPU9250 reporting orientation from gravity
///
/// Call [`Motion::init`] once before reading.
pub struct Motion<D = I2cDevice> {
    mpu9250: Mpu9250<D>,
    config: MotionConfig,
}

impl Motion<I2cDevice> {
    /// Sensor at `address` on the default bus, default settings
    pub fn new(address: u16) -> anyhow::Result<Self> {
        Self::open(MotionConfig {
            address,
            ..Default::default()
        })
    }

    #[tracing::instrument]
    pub fn open(config: MotionConfig) -> anyhow::Result<Self> {
        trace!("Motion::open()");

        let device = I2cDevice::new(config.bus, config.address).context("Open i2c device")?;

        Ok(Self::from_device(device, config))
    }
}

impl<D: Device> Motion<D> {
    pub fn from_device(device: D, config: MotionConfig) -> Self {
        Self {
            mpu9250: Mpu9250::new(device),
            config,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn driver(&self) -> &Mpu9250<D> {
        &self.mpu9250
    }

    pub fn driver_mut(&mut self) -> &mut Mpu9250<D> {
        &mut self.mpu9250
    }

    /// Connects, calibrates and configures the sensor
    ///
    /// Stops at the first step that fails. The sensor must be lying flat.
    pub fn init(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.mpu9250.init() {
            error!("MPU9250 does not respond");
            return Err(err.context("Connect to MPU9250"));
        }
        info!("MPU9250 is connected");

        self.calibrate().context("Calibrate")?;

        self.mpu9250
            .set_sample_rate_divider(self.config.sample_rate_divider)?;
        self.mpu9250.set_acc_range(self.config.acc_range)?;
        match self.config.acc_dlpf {
            Some(dlpf) => {
                self.mpu9250.enable_acc_dlpf(true)?;
                self.mpu9250.set_acc_dlpf(dlpf)?;
            }
            None => self.mpu9250.enable_acc_dlpf(false)?,
        }

        Ok(())
    }

    /// Measures offsets, must run before the ranges are configured
    pub fn calibrate(&mut self) -> anyhow::Result<()> {
        info!("Position you MPU9250 flat and don't move it - calibrating...");
        thread::sleep(self.config.settle_time);
        self.mpu9250.auto_offsets()?;

        if let Some(bounds) = self.config.acc_bounds {
            self.mpu9250.set_acc_offsets(bounds);
        }
        info!("Done!");

        Ok(())
    }

    pub fn angles(&mut self) -> anyhow::Result<Vector3<Degrees>> {
        self.mpu9250.angles()
    }

    pub fn roll(&mut self) -> anyhow::Result<Degrees> {
        self.mpu9250.roll()
    }

    pub fn pitch(&mut self) -> anyhow::Result<Degrees> {
        self.mpu9250.pitch()
    }

    pub fn temperature(&mut self) -> anyhow::Result<Celsius> {
        self.mpu9250.temperature()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::peripheral::imu::AccelBounds;
    use crate::peripheral::mock::MockDevice;
    use crate::peripheral::mpu9250::{
        AccelRange, Dlpf, MPU9250_ACCEL_CONFIG, MPU9250_ACCEL_CONFIG_2, MPU9250_PWR_MGMT_1, MPU9250_SMPLRT_DIV,
    };

    fn test_config() -> MotionConfig {
        MotionConfig {
            settle_time: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn init_applies_fixed_settings() {
        let mut motion = Motion::from_device(MockDevice::flat(), test_config());
        motion.init().unwrap();

        let dev = motion.driver().device();
        assert_eq!(dev.register(MPU9250_SMPLRT_DIV), 5);
        assert_eq!(dev.register(MPU9250_ACCEL_CONFIG) & 0b0001_1000, 0);
        // FCHOICE_B clear, DLPF 6
        assert_eq!(dev.register(MPU9250_ACCEL_CONFIG_2), 0b0000_0110);
        assert_eq!(dev.register(MPU9250_PWR_MGMT_1), 0);
    }

    #[test]
    fn configuration_follows_calibration() {
        let mut motion = Motion::from_device(MockDevice::flat(), test_config());
        motion.init().unwrap();

        let writes = &motion.driver().device().writes;
        let last = writes.len() - 4;
        assert_eq!(writes[last].0, MPU9250_SMPLRT_DIV);
        assert_eq!(writes[last + 1].0, MPU9250_ACCEL_CONFIG);
        assert_eq!(writes[last + 2].0, MPU9250_ACCEL_CONFIG_2);
        assert_eq!(writes[last + 3].0, MPU9250_ACCEL_CONFIG_2);
    }

    #[test]
    fn init_stops_when_sensor_is_missing() {
        let mut motion = Motion::from_device(MockDevice::new(0x00), test_config());
        let err = motion.init().unwrap_err();

        assert!(format!("{err:#}").contains("unexpected WHO_AM_I 0x00"));
        let dev = motion.driver().device();
        assert!(dev.written_to(MPU9250_SMPLRT_DIV).is_empty());
    }

    #[test]
    fn readings_of_a_level_sensor() {
        let mut dev = MockDevice::flat();
        dev.set_temperature(0);
        let mut motion = Motion::from_device(dev, test_config());
        motion.init().unwrap();

        let angles = motion.angles().unwrap();
        assert!(angles.x.0.abs() < 1e-6);
        assert!(angles.y.0.abs() < 1e-6);
        assert!((angles.z.0 - 90.0).abs() < 1e-6);
        assert!(motion.roll().unwrap().0.abs() < 1e-6);
        assert!(motion.pitch().unwrap().0.abs() < 1e-6);
        assert!((motion.temperature().unwrap().0 - 21.0).abs() < 1e-6);
    }

    #[test]
    fn custom_settings() {
        let config = MotionConfig {
            sample_rate_divider: 9,
            acc_range: AccelRange::G4,
            acc_dlpf: None,
            ..test_config()
        };
        let mut motion = Motion::from_device(MockDevice::flat(), config);
        motion.init().unwrap();

        let dev = motion.driver().device();
        assert_eq!(dev.register(MPU9250_SMPLRT_DIV), 9);
        assert_eq!(dev.register(MPU9250_ACCEL_CONFIG), 0b0000_1000);
        // Bypassed, DLPF bits left from calibration
        assert_eq!(dev.register(MPU9250_ACCEL_CONFIG_2), 0b0000_1000 | Dlpf::_6.bits());
    }

    #[test]
    fn manual_bounds_replace_measured_offsets() {
        let config = MotionConfig {
            acc_bounds: Some(AccelBounds {
                x_min: -16000.0,
                x_max: 16800.0,
                y_min: -16384.0,
                y_max: 16384.0,
                z_min: -16384.0,
                z_max: 16384.0,
            }),
            ..test_config()
        };
        let mut dev = MockDevice::flat();
        dev.set_accel(Vector3::new(400, 0, 16384));
        let mut motion = Motion::from_device(dev, config);
        motion.init().unwrap();

        let offset = motion.driver().acc_offsets();
        assert_eq!(offset, Vector3::new(400.0, 0.0, 0.0));
        assert!(motion.angles().unwrap().x.0.abs() < 1e-6);
    }
}
