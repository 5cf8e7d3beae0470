use std::thread;
use std::time::Duration;

use anyhow::Context;
use common::types::{Celsius, Degrees, Dps, GForce, Vector3};
use thiserror::Error;
use tracing::{debug, trace};

use crate::peripheral::mpu9250::{
    AccelConfig2, AccelRange, Dlpf, GyroRange, IntPinCfg, PwrMgmt1, WhoAmI, DLPF_MASK, FULL_SCALE_MASK,
    GYRO_FCHOICE_B_MASK, MPU9250_ACCEL_CONFIG, MPU9250_ACCEL_CONFIG_2, MPU9250_ACCEL_OUT_BLOCK, MPU9250_CONFIG,
    MPU9250_GYRO_CONFIG, MPU9250_GYRO_OUT_BLOCK, MPU9250_INT_PIN_CFG, MPU9250_PWR_MGMT_1, MPU9250_SMPLRT_DIV,
    MPU9250_TEMP_OUT_BLOCK,
};
use crate::peripheral::{Device, FixedRegister, ReadableRegister};

#[derive(Debug, Error)]
pub enum Mpu9250Error {
    #[error("unexpected WHO_AM_I {found:#04x}")]
    UnexpectedIdentity { found: u8 },
}

/// Manual accelerometer calibration, raw min and max per axis measured at ±2g
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AccelBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

/// MPU9250 accelerometer, gyroscope and temperature sensor
///
/// Offsets are kept in raw counts of the most sensitive range (±2g, ±250dps)
/// and scaled by the active range factor when applied.
pub struct Mpu9250<D> {
    dev: D,
    acc_offset: Vector3<f64>,
    gyro_offset: Vector3<f64>,
    acc_range_factor: f64,
    gyro_range_factor: f64,
}

impl<D: Device> Mpu9250<D> {
    /// Raw counts per g at ±2g
    pub const COUNTS_PER_G: f64 = 16384.0;
    const GYRO_FULL_SCALE: f64 = 250.0;
    const RAW_FULL_SCALE: f64 = 32768.0;

    const TEMP_SENSITIVITY: f64 = 333.87;
    const TEMP_ROOM_OFFSET: f64 = 0.0;
    const TEMP_AT_OFFSET: f64 = 21.0;

    const OFFSET_DISCARD: usize = 50;
    const OFFSET_SAMPLES: usize = 50;

    pub fn new(dev: D) -> Self {
        Self {
            dev,
            acc_offset: Vector3::default(),
            gyro_offset: Vector3::default(),
            acc_range_factor: 1.0,
            gyro_range_factor: 1.0,
        }
    }

    pub fn device(&self) -> &D {
        &self.dev
    }

    pub fn into_device(self) -> D {
        self.dev
    }

    /// Resets the chip and checks that it identifies as an MPU9250
    pub fn init(&mut self) -> anyhow::Result<()> {
        trace!("Mpu9250::init()");

        self.dev
            .write_byte(MPU9250_PWR_MGMT_1, PwrMgmt1::H_RESET.bits())
            .context("Reset")?;
        thread::sleep(Duration::from_millis(10));

        self.dev
            .write_byte(MPU9250_INT_PIN_CFG, IntPinCfg::BYPASS_EN.bits())
            .context("Enable bypass")?;
        thread::sleep(Duration::from_millis(10));

        let who_am_i = self.who_am_i()?;
        if !WhoAmI::matches(who_am_i) {
            return Err(Mpu9250Error::UnexpectedIdentity { found: who_am_i }.into());
        }
        debug!("WHO_AM_I: {who_am_i:#04x}");

        self.acc_offset = Vector3::default();
        self.gyro_offset = Vector3::default();
        self.acc_range_factor = 1.0;
        self.gyro_range_factor = 1.0;

        self.sleep(false)
    }

    pub fn who_am_i(&mut self) -> anyhow::Result<u8> {
        WhoAmI::read(&mut self.dev).context("Read WHO_AM_I")
    }

    /// Measures accelerometer and gyroscope offsets
    ///
    /// The sensor must lie flat with its x,y plane and must not move. Overwrites
    /// the ranges and filters, so configure those afterwards.
    #[tracing::instrument(skip(self))]
    pub fn auto_offsets(&mut self) -> anyhow::Result<()> {
        self.enable_gyro_dlpf()?;
        self.set_gyro_dlpf(Dlpf::_6)?;
        self.set_gyro_range(GyroRange::Dps250)?;
        self.set_acc_range(AccelRange::G2)?;
        self.enable_acc_dlpf(true)?;
        self.set_acc_dlpf(Dlpf::_6)?;
        thread::sleep(Duration::from_millis(100));

        for _ in 0..Self::OFFSET_DISCARD {
            self.acc_raw()?;
            self.gyro_raw()?;
            thread::sleep(Duration::from_millis(1));
        }

        let mut acc = Vector3::<f64>::default();
        let mut gyro = Vector3::<f64>::default();
        for _ in 0..Self::OFFSET_SAMPLES {
            acc += self.acc_raw()?.map(f64::from);
            gyro += self.gyro_raw()?.map(f64::from);
            thread::sleep(Duration::from_millis(1));
        }

        let samples = Self::OFFSET_SAMPLES as f64;
        let mut acc = acc.map(|it| it / samples);
        acc.z -= Self::COUNTS_PER_G;

        self.acc_offset = acc;
        self.gyro_offset = gyro.map(|it| it / samples);
        debug!(acc_offset = ?self.acc_offset, gyro_offset = ?self.gyro_offset, "Measured offsets");

        Ok(())
    }

    /// Alternative to [`Self::auto_offsets`] from measured raw extremes of each axis
    pub fn set_acc_offsets(&mut self, bounds: AccelBounds) {
        self.acc_offset = Vector3::new(
            (bounds.x_max + bounds.x_min) * 0.5,
            (bounds.y_max + bounds.y_min) * 0.5,
            (bounds.z_max + bounds.z_min) * 0.5,
        );
    }

    pub fn acc_offsets(&self) -> Vector3<f64> {
        self.acc_offset
    }

    pub fn gyro_offsets(&self) -> Vector3<f64> {
        self.gyro_offset
    }

    /// Sample rate = internal sample rate / (1 + divider)
    pub fn set_sample_rate_divider(&mut self, divider: u8) -> anyhow::Result<()> {
        self.dev
            .write_byte(MPU9250_SMPLRT_DIV, divider)
            .context("Write SMPLRT_DIV")
    }

    pub fn set_acc_range(&mut self, range: AccelRange) -> anyhow::Result<()> {
        self.dev
            .modify_byte(MPU9250_ACCEL_CONFIG, FULL_SCALE_MASK, range.bits())
            .context("Write ACCEL_CONFIG")?;
        self.acc_range_factor = range.factor();

        Ok(())
    }

    /// With the filter disabled the bandwidth is 1.13 kHz, delay 0.75 ms, output rate 4 kHz
    pub fn enable_acc_dlpf(&mut self, enable: bool) -> anyhow::Result<()> {
        let (clear, set) = if enable {
            (AccelConfig2::ACCEL_FCHOICE_B.bits(), 0)
        } else {
            (0, AccelConfig2::ACCEL_FCHOICE_B.bits())
        };

        self.dev
            .modify_byte(MPU9250_ACCEL_CONFIG_2, clear, set)
            .context("Write ACCEL_CONFIG_2")
    }

    pub fn set_acc_dlpf(&mut self, dlpf: Dlpf) -> anyhow::Result<()> {
        self.dev
            .modify_byte(MPU9250_ACCEL_CONFIG_2, DLPF_MASK, dlpf.bits())
            .context("Write ACCEL_CONFIG_2")
    }

    pub fn set_gyro_range(&mut self, range: GyroRange) -> anyhow::Result<()> {
        self.dev
            .modify_byte(MPU9250_GYRO_CONFIG, FULL_SCALE_MASK, range.bits())
            .context("Write GYRO_CONFIG")?;
        self.gyro_range_factor = range.factor();

        Ok(())
    }

    pub fn enable_gyro_dlpf(&mut self) -> anyhow::Result<()> {
        self.dev
            .modify_byte(MPU9250_GYRO_CONFIG, GYRO_FCHOICE_B_MASK, 0)
            .context("Write GYRO_CONFIG")
    }

    pub fn set_gyro_dlpf(&mut self, dlpf: Dlpf) -> anyhow::Result<()> {
        self.dev
            .modify_byte(MPU9250_CONFIG, DLPF_MASK, dlpf.bits())
            .context("Write CONFIG")
    }

    pub fn sleep(&mut self, sleep: bool) -> anyhow::Result<()> {
        let (clear, set) = if sleep {
            (0, PwrMgmt1::SLEEP.bits())
        } else {
            (PwrMgmt1::SLEEP.bits(), 0)
        };

        self.dev
            .modify_byte(MPU9250_PWR_MGMT_1, clear, set)
            .context("Write PWR_MGMT_1")
    }

    pub fn acc_raw(&mut self) -> anyhow::Result<Vector3<i16>> {
        self.read_block(MPU9250_ACCEL_OUT_BLOCK).context("Read accelerometer")
    }

    pub fn gyro_raw(&mut self) -> anyhow::Result<Vector3<i16>> {
        self.read_block(MPU9250_GYRO_OUT_BLOCK).context("Read gyroscope")
    }

    pub fn corrected_acc_raw(&mut self) -> anyhow::Result<Vector3<f64>> {
        let raw = self.acc_raw()?;
        let factor = self.acc_range_factor;

        Ok(Vector3::new(
            raw.x as f64 - self.acc_offset.x / factor,
            raw.y as f64 - self.acc_offset.y / factor,
            raw.z as f64 - self.acc_offset.z / factor,
        ))
    }

    pub fn g_values(&mut self) -> anyhow::Result<Vector3<GForce>> {
        let factor = self.acc_range_factor;
        let corrected = self.corrected_acc_raw()?;

        Ok(corrected.map(|it| GForce(it * factor / Self::COUNTS_PER_G)))
    }

    pub fn resultant_g(&mut self) -> anyhow::Result<GForce> {
        let g = self.g_values()?;

        Ok(GForce((g.x.0 * g.x.0 + g.y.0 * g.y.0 + g.z.0 * g.z.0).sqrt()))
    }

    pub fn gyro_values(&mut self) -> anyhow::Result<Vector3<Dps>> {
        let raw = self.gyro_raw()?;
        let factor = self.gyro_range_factor;
        let scale = factor * Self::GYRO_FULL_SCALE / Self::RAW_FULL_SCALE;

        Ok(Vector3::new(
            Dps((raw.x as f64 - self.gyro_offset.x / factor) * scale),
            Dps((raw.y as f64 - self.gyro_offset.y / factor) * scale),
            Dps((raw.z as f64 - self.gyro_offset.z / factor) * scale),
        ))
    }

    /// Tilt of each axis against the horizontal plane, from gravity alone
    pub fn angles(&mut self) -> anyhow::Result<Vector3<Degrees>> {
        let g = self.g_values()?;

        Ok(g.map(|it| Degrees::from_radians(it.0.clamp(-1.0, 1.0).asin())))
    }

    pub fn pitch(&mut self) -> anyhow::Result<Degrees> {
        let g = self.g_values()?;
        let pitch = (-g.x.0).atan2((g.y.0 * g.y.0 + g.z.0 * g.z.0).abs().sqrt());

        Ok(Degrees::from_radians(pitch))
    }

    pub fn roll(&mut self) -> anyhow::Result<Degrees> {
        let g = self.g_values()?;

        Ok(Degrees::from_radians(g.y.0.atan2(g.z.0)))
    }

    pub fn temperature(&mut self) -> anyhow::Result<Celsius> {
        let mut buffer = [0; 2];
        self.dev
            .read(MPU9250_TEMP_OUT_BLOCK, &mut buffer)
            .context("Read temperature")?;
        let raw = i16::from_be_bytes(buffer) as f64;

        Ok(Celsius(
            (raw - Self::TEMP_ROOM_OFFSET) / Self::TEMP_SENSITIVITY + Self::TEMP_AT_OFFSET,
        ))
    }

    fn read_block(&mut self, address: u8) -> anyhow::Result<Vector3<i16>> {
        let mut buffer = [0; 6];
        self.dev.read(address, &mut buffer)?;

        Ok(Vector3::new(
            i16::from_be_bytes([buffer[0], buffer[1]]),
            i16::from_be_bytes([buffer[2], buffer[3]]),
            i16::from_be_bytes([buffer[4], buffer[5]]),
        ))
    }
}
