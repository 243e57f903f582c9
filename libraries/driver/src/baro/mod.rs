// Barometer driver module providing the bus plumbing shared by pressure sensors
//
// 1. Drivers never touch a concrete I2C peripheral, only `BusTransport`
// 2. Every bus transaction is bounded by a timeout on the injected delay
// 3. Pressure to altitude conversion lives here so every chip uses the same formula

use core::fmt::Debug;
use core::future::Future;

use hal::{SensorError, SensorResult};
use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::warn;
use num_traits::Float;

pub mod bmp085;

#[cfg(test)]
mod script;

pub use self::bmp085::Bmp085;

// Standard sea level pressure for altitude calculations (1013.25 hPa)
pub const STD_SEA_LEVEL_PRESSURE_PA: f32 = 101325.0;

// Exponent of the international barometric formula
const BAROMETRIC_EXPONENT: f32 = 1.0 / 5.255;

/// Register level access to a device on a two-wire bus
pub trait BusTransport {
    type Error: Debug;

    /// Write a single register on a device
    async fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Read consecutive registers starting at `reg`
    async fn read_registers(&mut self, addr: u8, reg: u8, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Read a big-endian 16-bit word starting at `reg`
    async fn read_word(&mut self, addr: u8, reg: u8) -> Result<u16, Self::Error> {
        let mut buffer = [0u8; 2];
        self.read_registers(addr, reg, &mut buffer).await?;
        Ok(u16::from_be_bytes(buffer))
    }
}

impl<T: I2c> BusTransport for T {
    type Error = T::Error;

    async fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg, value]).await
    }

    async fn read_registers(&mut self, addr: u8, reg: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        self.write_read(addr, &[reg], data).await
    }
}

/// Run a bus transaction, giving up after `timeout_ms`.
///
/// The transaction is polled first, so a transaction that completes
/// immediately never starts the timer.
pub async fn with_timeout<D, F, T, E>(delay: &mut D, timeout_ms: u32, transaction: F) -> SensorResult<T>
where
    D: DelayNs,
    F: Future<Output = Result<T, E>>,
    E: Debug,
{
    match select(transaction, delay.delay_ms(timeout_ms)).await {
        Either::First(Ok(value)) => Ok(value),
        Either::First(Err(err)) => {
            warn!("Bus transaction failed: {:?}", err);
            Err(SensorError::Bus)
        }
        Either::Second(()) => {
            warn!("Bus transaction timed out after {} ms", timeout_ms);
            Err(SensorError::SensorUnavailable { timeout_ms })
        }
    }
}

/// Convert a pressure to altitude in meters using the barometric formula
///
/// h = 44330 * (1 - (p / p0)^(1 / 5.255)); negative below the reference pressure.
pub fn pressure_to_altitude(pressure_pa: f32, sea_level_pa: f32) -> f32 {
    44330.0 * (1.0 - Float::powf(pressure_pa / sea_level_pa, BAROMETRIC_EXPONENT))
}
