use bitflags::bitflags;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::peripheral::{Device, FixedRegister, ReadableRegister, Register};

pub const MPU9250_ADDRESS: u16 = 0x68;
pub const MPU9250_ADDRESS_AD0_HIGH: u16 = 0x69;

pub const MPU9250_SMPLRT_DIV: u8 = 0x19;
pub const MPU9250_CONFIG: u8 = 0x1A;
pub const MPU9250_GYRO_CONFIG: u8 = 0x1B;
pub const MPU9250_ACCEL_CONFIG: u8 = 0x1C;
pub const MPU9250_ACCEL_CONFIG_2: u8 = 0x1D;
pub const MPU9250_INT_PIN_CFG: u8 = 0x37;

pub const MPU9250_ACCEL_OUT_BLOCK: u8 = 0x3B;
pub const MPU9250_TEMP_OUT_BLOCK: u8 = 0x41;
pub const MPU9250_GYRO_OUT_BLOCK: u8 = 0x43;

pub const MPU9250_PWR_MGMT_1: u8 = 0x6B;
pub const MPU9250_WHO_AM_I: u8 = 0x75;

/// Bits 4:3 of GYRO_CONFIG and ACCEL_CONFIG
pub const FULL_SCALE_MASK: u8 = 0b0001_1000;
pub const FULL_SCALE_SHIFT: u8 = 3;
/// Bits 2:0 of CONFIG and ACCEL_CONFIG_2
pub const DLPF_MASK: u8 = 0b0000_0111;
/// GYRO_CONFIG FCHOICE_B, the inverse of FCHOICE
pub const GYRO_FCHOICE_B_MASK: u8 = 0b0000_0011;

bitflags! {
    pub struct PwrMgmt1: u8 {
        const H_RESET = 0b1000_0000;
        const SLEEP   = 0b0100_0000;
    }
}

bitflags! {
    pub struct AccelConfig2: u8 {
        /// Bypasses the accelerometer DLPF when set
        const ACCEL_FCHOICE_B = 0b0000_1000;
    }
}

bitflags! {
    pub struct IntPinCfg: u8 {
        /// Exposes the auxiliary bus (AK8963) on the main bus
        const BYPASS_EN = 0b0000_0010;
    }
}

pub struct WhoAmI;

impl Register for WhoAmI {
    const ADDRESS: u8 = MPU9250_WHO_AM_I;
}

impl ReadableRegister for WhoAmI {
    type Data = u8;

    fn read(dev: &mut impl Device) -> anyhow::Result<Self::Data> {
        dev.read_byte(Self::ADDRESS)
    }
}

impl FixedRegister for WhoAmI {
    // MPU-9250, MPU-9255
    const BYTES: &'static [u8] = &[0x71, 0x73];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum AccelRange {
    #[default]
    #[value(name = "2g")]
    G2 = 0,
    #[value(name = "4g")]
    G4 = 1,
    #[value(name = "8g")]
    G8 = 2,
    #[value(name = "16g")]
    G16 = 3,
}

impl AccelRange {
    pub fn bits(self) -> u8 {
        (self as u8) << FULL_SCALE_SHIFT
    }

    /// Multiple of the ±2g scale
    pub fn factor(self) -> f64 {
        (1u8 << self as u8) as f64
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum GyroRange {
    #[default]
    #[value(name = "250")]
    Dps250 = 0,
    #[value(name = "500")]
    Dps500 = 1,
    #[value(name = "1000")]
    Dps1000 = 2,
    #[value(name = "2000")]
    Dps2000 = 3,
}

impl GyroRange {
    pub fn bits(self) -> u8 {
        (self as u8) << FULL_SCALE_SHIFT
    }

    /// Multiple of the ±250dps scale
    pub fn factor(self) -> f64 {
        (1u8 << self as u8) as f64
    }
}

/// Digital low pass filter setting
///
/// Accelerometer, with the filter enabled:
///
/// | DLPF | Bandwidth [Hz] | Delay [ms] | Output rate [kHz] |
/// |------|----------------|------------|-------------------|
/// | 0    | 460            | 1.94       | 1                 |
/// | 1    | 184            | 5.80       | 1                 |
/// | 2    | 92             | 7.80       | 1                 |
/// | 3    | 41             | 11.80      | 1                 |
/// | 4    | 20             | 19.80      | 1                 |
/// | 5    | 10             | 35.70      | 1                 |
/// | 6    | 5              | 66.96      | 1                 |
/// | 7    | 460            | 1.94       | 1                 |
///
/// The sample rate divider only applies for settings 1 through 6.
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Dlpf {
    #[value(name = "0")]
    _0 = 0,
    #[value(name = "1")]
    _1 = 1,
    #[value(name = "2")]
    _2 = 2,
    #[value(name = "3")]
    _3 = 3,
    #[value(name = "4")]
    _4 = 4,
    #[value(name = "5")]
    _5 = 5,
    #[default]
    #[value(name = "6")]
    _6 = 6,
    #[value(name = "7")]
    _7 = 7,
}

impl Dlpf {
    pub fn bits(self) -> u8 {
        self as u8 & DLPF_MASK
    }

    pub fn divider_applies(self) -> bool {
        !matches!(self, Dlpf::_0 | Dlpf::_7)
    }
}
