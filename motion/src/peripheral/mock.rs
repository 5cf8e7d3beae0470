use anyhow::bail;
use common::types::Vector3;

use crate::peripheral::mpu9250::{
    PwrMgmt1, MPU9250_ACCEL_OUT_BLOCK, MPU9250_GYRO_OUT_BLOCK, MPU9250_PWR_MGMT_1, MPU9250_TEMP_OUT_BLOCK,
    MPU9250_WHO_AM_I,
};
use crate::peripheral::Device;

/// In memory MPU9250 register file
pub struct MockDevice {
    pub registers: [u8; 128],
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: Vec<u8>,
    pub fail_reads: bool,
}

impl MockDevice {
    pub fn new(who_am_i: u8) -> Self {
        let mut registers = [0; 128];
        registers[MPU9250_WHO_AM_I as usize] = who_am_i;
        registers[MPU9250_PWR_MGMT_1 as usize] = PwrMgmt1::SLEEP.bits();

        Self {
            registers,
            writes: Vec::new(),
            reads: Vec::new(),
            fail_reads: false,
        }
    }

    /// A flat, motionless sensor at ±2g: 1g on z
    pub fn flat() -> Self {
        let mut dev = Self::new(0x71);
        dev.set_accel(Vector3::new(0, 0, 16384));
        dev
    }

    pub fn set_accel(&mut self, raw: Vector3<i16>) {
        self.set_block(MPU9250_ACCEL_OUT_BLOCK, raw);
    }

    pub fn set_gyro(&mut self, raw: Vector3<i16>) {
        self.set_block(MPU9250_GYRO_OUT_BLOCK, raw);
    }

    pub fn set_temperature(&mut self, raw: i16) {
        let address = MPU9250_TEMP_OUT_BLOCK as usize;
        self.registers[address..address + 2].copy_from_slice(&raw.to_be_bytes());
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    pub fn written_to(&self, address: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(reg, _)| *reg == address)
            .flat_map(|(_, data)| data.iter().copied())
            .collect()
    }

    fn set_block(&mut self, address: u8, raw: Vector3<i16>) {
        let address = address as usize;
        self.registers[address..address + 2].copy_from_slice(&raw.x.to_be_bytes());
        self.registers[address + 2..address + 4].copy_from_slice(&raw.y.to_be_bytes());
        self.registers[address + 4..address + 6].copy_from_slice(&raw.z.to_be_bytes());
    }

    fn reset(&mut self) {
        // Configuration registers only, sensor outputs keep their values
        for address in 0x19..=0x1D {
            self.registers[address] = 0;
        }
        self.registers[0x37] = 0;
        self.registers[MPU9250_PWR_MGMT_1 as usize] = PwrMgmt1::SLEEP.bits();
    }
}

impl Device for MockDevice {
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> anyhow::Result<()> {
        if self.fail_reads {
            bail!("Nack on read of {address:#04x}");
        }

        let start = address as usize;
        buffer.copy_from_slice(&self.registers[start..start + buffer.len()]);
        self.reads.push(address);

        Ok(())
    }

    fn write(&mut self, address: u8, buffer: &[u8]) -> anyhow::Result<()> {
        self.writes.push((address, buffer.to_vec()));

        if address == MPU9250_PWR_MGMT_1 && buffer[0] & PwrMgmt1::H_RESET.bits() != 0 {
            self.reset();
            return Ok(());
        }

        let start = address as usize;
        self.registers[start..start + buffer.len()].copy_from_slice(buffer);

        Ok(())
    }
}
