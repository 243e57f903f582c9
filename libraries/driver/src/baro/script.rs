// Scripted BMP085 bus traffic for host tests

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

use super::bmp085::{
    BMP085_CHIP_ID, BMP085_CMD_PRESSURE, BMP085_CMD_TEMPERATURE, BMP085_I2C_ADDR, BMP085_REG_CALIB_START,
    BMP085_REG_CHIP_ID, BMP085_REG_CONTROL, BMP085_REG_RESULT, CALIBRATION_BLOCK_LEN,
};

const ADDR: u8 = BMP085_I2C_ADDR;

/// Calibration words of the datasheet worked example
pub const DATASHEET_CALIBRATION: [i16; 11] = [
    408, -72, -14383, 32741u16 as i16, 32757u16 as i16, 23153, 6190, 4, -32768, -8711, 2868,
];

/// UT and UP (oss = 0) of the datasheet worked example
pub const DATASHEET_RAW_TEMPERATURE: u16 = 27898;
pub const DATASHEET_RAW_PRESSURE: u32 = 23843;

pub fn calibration_block(words: &[i16; 11]) -> [u8; CALIBRATION_BLOCK_LEN] {
    let mut block = [0u8; CALIBRATION_BLOCK_LEN];
    for (i, word) in words.iter().enumerate() {
        block[2 * i..2 * i + 2].copy_from_slice(&word.to_be_bytes());
    }
    block
}

pub fn read_chip_id(id: u8) -> I2cTransaction {
    I2cTransaction::write_read(ADDR, vec![BMP085_REG_CHIP_ID], vec![id])
}

pub fn read_calibration(block: &[u8; CALIBRATION_BLOCK_LEN]) -> I2cTransaction {
    I2cTransaction::write_read(ADDR, vec![BMP085_REG_CALIB_START], block.to_vec())
}

pub fn request_temperature() -> I2cTransaction {
    I2cTransaction::write(ADDR, vec![BMP085_REG_CONTROL, BMP085_CMD_TEMPERATURE])
}

pub fn request_pressure(oss: u8) -> I2cTransaction {
    I2cTransaction::write(ADDR, vec![BMP085_REG_CONTROL, BMP085_CMD_PRESSURE + (oss << 6)])
}

pub fn read_temperature(raw: u16) -> I2cTransaction {
    I2cTransaction::write_read(ADDR, vec![BMP085_REG_RESULT], raw.to_be_bytes().to_vec())
}

/// The result registers hold UP left aligned in 24 bits
pub fn read_pressure(raw: u32, oss: u8) -> I2cTransaction {
    let value = raw << (8 - oss);
    I2cTransaction::write_read(
        ADDR,
        vec![BMP085_REG_RESULT],
        vec![(value >> 16) as u8, (value >> 8) as u8, value as u8],
    )
}

/// Traffic of a successful `initialize` against the datasheet device
pub fn initialize_transactions() -> Vec<I2cTransaction> {
    vec![
        read_chip_id(BMP085_CHIP_ID),
        read_calibration(&calibration_block(&DATASHEET_CALIBRATION)),
        request_temperature(),
    ]
}

/// Traffic of `count` calls to `measure` right after `initialize`.
///
/// Reads cycle T, P, P, P and each call requests what the next call reads.
/// Read `i` delivers `raw_pressure(i)` when it is a pressure read.
pub fn measure_transactions(oss: u8, count: usize, raw_pressure: impl Fn(usize) -> u32) -> Vec<I2cTransaction> {
    let reads_temperature = |i: usize| i % 4 == 0;
    let mut transactions = Vec::with_capacity(2 * count);
    for i in 0..count {
        transactions.push(if reads_temperature(i) {
            read_temperature(DATASHEET_RAW_TEMPERATURE)
        } else {
            read_pressure(raw_pressure(i), oss)
        });
        transactions.push(if reads_temperature(i + 1) {
            request_temperature()
        } else {
            request_pressure(oss)
        });
    }
    transactions
}

/// Mock bus that can be switched to never complete a transaction
pub struct StallingBus {
    mock: I2cMock,
    stalled: bool,
}

impl StallingBus {
    pub fn new(expectations: &[I2cTransaction]) -> Self {
        Self {
            mock: I2cMock::new(expectations),
            stalled: false,
        }
    }

    pub fn stall(&mut self) {
        self.stalled = true;
    }

    pub fn done(&mut self) {
        self.mock.done();
    }

    async fn wait_unless_stalled(&self) {
        if self.stalled {
            core::future::pending::<()>().await;
        }
    }
}

impl ErrorType for StallingBus {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for StallingBus {
    async fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.wait_unless_stalled().await;
        I2c::write(&mut self.mock, address, write).await
    }

    async fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.wait_unless_stalled().await;
        I2c::write_read(&mut self.mock, address, write, read).await
    }

    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.wait_unless_stalled().await;
        I2c::transaction(&mut self.mock, address, operations).await
    }
}

/// Delay that returns immediately and adds up the requested time
pub struct RecordingDelay {
    elapsed_ns: u64,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}
