pub mod imu;
pub mod mpu9250;

#[cfg(test)]
pub mod mock;

use anyhow::Context;
use rppal::i2c::I2c;

/// Register oriented access to a chip on a bus
pub trait Device {
    fn read_byte(&mut self, address: u8) -> anyhow::Result<u8> {
        let bytes = &mut [0];
        self.read(address, bytes)?;
        Ok(bytes[0])
    }
    fn write_byte(&mut self, address: u8, byte: u8) -> anyhow::Result<()> {
        self.write(address, &[byte])
    }

    /// Read-modify-write, clears the bits in `clear` then sets the bits in `set`
    fn modify_byte(&mut self, address: u8, clear: u8, set: u8) -> anyhow::Result<()> {
        let byte = self.read_byte(address)?;
        self.write_byte(address, byte & !clear | set)
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> anyhow::Result<()>;
    fn write(&mut self, address: u8, buffer: &[u8]) -> anyhow::Result<()>;
}

pub trait Register {
    const ADDRESS: u8;
}

pub trait ReadableRegister: Register {
    type Data;

    fn read(dev: &mut impl Device) -> anyhow::Result<Self::Data>;
}

/// A read only register holding one of a known set of values, eg WHO_AM_I
pub trait FixedRegister
where
    Self: ReadableRegister<Data = u8>,
{
    const BYTES: &'static [u8];

    fn matches(byte: u8) -> bool {
        Self::BYTES.contains(&byte)
    }

    fn check(dev: &mut impl Device) -> anyhow::Result<bool> {
        Self::read(dev).map(Self::matches)
    }
}

/// Linux i2c-dev bus bound to a single slave address
#[derive(Debug)]
pub struct I2cDevice(I2c);

impl I2cDevice {
    pub const DEFAULT_BUS: u8 = 1;

    #[tracing::instrument]
    pub fn new(bus: u8, address: u16) -> anyhow::Result<Self> {
        let mut i2c = I2c::with_bus(bus).context("Open i2c bus")?;
        i2c.set_slave_address(address).context("Set address")?;

        Ok(Self(i2c))
    }
}

impl Device for I2cDevice {
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> anyhow::Result<()> {
        // Register pointer auto increments during burst reads
        self.0.write_read(&[address], buffer)?;

        Ok(())
    }

    fn write(&mut self, address: u8, buffer: &[u8]) -> anyhow::Result<()> {
        let mut frame = Vec::with_capacity(buffer.len() + 1);
        frame.push(address);
        frame.extend_from_slice(buffer);
        self.0.write(&frame)?;

        Ok(())
    }
}
