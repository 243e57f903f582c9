// BMP085 compensation: raw ADC counts to temperature and pressure
//
// Fixed-point integer arithmetic exactly as in the datasheet. Every shift and
// truncating division matters for matching the reference results, so nothing
// here goes through floating point.

use hal::{SensorError, SensorResult};

use super::Oversampling;

/// Size of the calibration block in bytes
pub const CALIBRATION_BLOCK_LEN: usize = 22;

/// Per-device calibration coefficients read from the EEPROM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationConstants {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

/// Raw readings as delivered by the ADC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Uncompensated temperature (UT)
    pub temperature: u16,
    /// Uncompensated pressure (UP), up to 19 bits depending on oversampling
    pub pressure: u32,
}

/// Compensated physical values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensatedReading {
    /// Temperature in 0.1 °C
    pub temperature: i32,
    /// Pressure in Pa
    pub pressure: i32,
}

impl CompensatedReading {
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature as f32 / 10.0
    }

    pub fn pressure_pa(&self) -> f32 {
        self.pressure as f32
    }
}

impl CalibrationConstants {
    /// Parse the EEPROM block: eleven big-endian words in the order
    /// ac1, ac2, ac3, ac4, ac5, ac6, b1, b2, mb, mc, md.
    ///
    /// No word may read 0x0000 or 0xFFFF; either means the EEPROM read failed.
    pub fn from_bytes(block: &[u8; CALIBRATION_BLOCK_LEN]) -> SensorResult<Self> {
        let mut words = [0u16; CALIBRATION_BLOCK_LEN / 2];
        for (word, pair) in words.iter_mut().zip(block.chunks_exact(2)) {
            *word = u16::from_be_bytes([pair[0], pair[1]]);
            if *word == 0x0000 || *word == 0xFFFF {
                return Err(SensorError::InvalidCalibration("calibration word reads 0x0000 or 0xFFFF"));
            }
        }

        Ok(Self {
            ac1: words[0] as i16,
            ac2: words[1] as i16,
            ac3: words[2] as i16,
            ac4: words[3],
            ac5: words[4],
            ac6: words[5],
            b1: words[6] as i16,
            b2: words[7] as i16,
            mb: words[8] as i16,
            mc: words[9] as i16,
            md: words[10] as i16,
        })
    }

    /// Compute B5, the temperature term shared with pressure compensation
    fn b5(&self, raw_temperature: u16) -> SensorResult<i32> {
        let x1 = ((raw_temperature as i32 - self.ac6 as i32).wrapping_mul(self.ac5 as i32)) >> 15;
        let denominator = x1.wrapping_add(self.md as i32);
        if denominator == 0 {
            return Err(SensorError::InvalidCalibration("temperature denominator x1 + md is zero"));
        }
        let x2 = ((self.mc as i32) << 11) / denominator;
        Ok(x1 + x2)
    }

    /// Compensated temperature in 0.1 °C
    pub fn temperature(&self, raw_temperature: u16) -> SensorResult<i32> {
        let b5 = self.b5(raw_temperature)?;
        Ok((b5 + 8) >> 4)
    }

    /// Compensate a raw sample taken with the given oversampling setting
    pub fn compensate(&self, sample: RawSample, oversampling: Oversampling) -> SensorResult<CompensatedReading> {
        let oss = oversampling.bits() as u32;
        let b5 = self.b5(sample.temperature)?;
        let temperature = (b5 + 8) >> 4;

        let b6 = b5 - 4000;
        let b6_squared = b6.wrapping_mul(b6) >> 12;

        let x1 = (self.b2 as i32).wrapping_mul(b6_squared) >> 11;
        let x2 = (self.ac2 as i32).wrapping_mul(b6) >> 11;
        let x3 = x1 + x2;
        let b3 = ((((self.ac1 as i32) * 4 + x3) << oss) + 2) / 4;

        let x1 = (self.ac3 as i32).wrapping_mul(b6) >> 13;
        let x2 = (self.b1 as i32).wrapping_mul(b6_squared) >> 16;
        let x3 = ((x1 + x2) + 2) >> 2;
        let b4 = (self.ac4 as u32).wrapping_mul((x3 + 32768) as u32) >> 15;
        if b4 == 0 {
            return Err(SensorError::InvalidCalibration("pressure denominator b4 is zero"));
        }

        let b7 = sample.pressure.wrapping_sub(b3 as u32).wrapping_mul(50000 >> oss);
        let p = if b7 < 0x8000_0000 { (b7 * 2) / b4 } else { (b7 / b4) * 2 };
        let p = p as i32;

        let x1 = (p >> 8).wrapping_mul(p >> 8);
        let x1 = x1.wrapping_mul(3038) >> 16;
        let x2 = (-7357i32).wrapping_mul(p) >> 16;
        let pressure = p.wrapping_add((x1 + x2 + 3791) >> 4);

        Ok(CompensatedReading { temperature, pressure })
    }
}
