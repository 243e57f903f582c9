use hal::{AltitudeSensor, AltitudeState, SensorError, SensorResult};
use embedded_hal_async::delay::DelayNs;
use log::{debug, info};

use crate::baro::{pressure_to_altitude, with_timeout, BusTransport, STD_SEA_LEVEL_PRESSURE_PA};

pub mod calibration;
pub mod scheduler;

pub use self::calibration::{CalibrationConstants, CompensatedReading, RawSample, CALIBRATION_BLOCK_LEN};
pub use self::scheduler::{Conversion, MeasurementScheduler, SchedulerState};

// BMP085 I2C address (fixed)
pub const BMP085_I2C_ADDR: u8 = 0x77;

// Register addresses
pub const BMP085_REG_CALIB_START: u8 = 0xAA;
pub const BMP085_REG_CHIP_ID: u8 = 0xD0;
pub const BMP085_REG_CONTROL: u8 = 0xF4;
pub const BMP085_REG_RESULT: u8 = 0xF6;

// Chip ID for verification (shared with the BMP180)
pub const BMP085_CHIP_ID: u8 = 0x55;

// Control register commands
pub const BMP085_CMD_TEMPERATURE: u8 = 0x2E;
pub const BMP085_CMD_PRESSURE: u8 = 0x34;

// Settle time after the first temperature request
const BMP085_STARTUP_DELAY_MS: u32 = 5;

/// Pressure oversampling setting
///
/// Must be the same for the conversion request, the raw pressure
/// assembly and the compensation, which all read it from the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    /// 1 sample, 4.5 ms
    UltraLowPower,
    /// 2 samples, 7.5 ms
    Standard,
    /// 4 samples, 13.5 ms
    HighResolution,
    /// 8 samples, 25.5 ms
    #[default]
    UltraHighResolution,
}

impl Oversampling {
    /// Register value (oss) for this setting
    pub fn bits(self) -> u8 {
        match self {
            Oversampling::UltraLowPower => 0,
            Oversampling::Standard => 1,
            Oversampling::HighResolution => 2,
            Oversampling::UltraHighResolution => 3,
        }
    }

    /// Maximum pressure conversion time in microseconds
    pub fn conversion_time_us(self) -> u32 {
        match self {
            Oversampling::UltraLowPower => 4_500,
            Oversampling::Standard => 7_500,
            Oversampling::HighResolution => 13_500,
            Oversampling::UltraHighResolution => 25_500,
        }
    }
}

/// Configuration for the BMP085 sensor
#[derive(Debug, Clone, Copy)]
pub struct Bmp085Config {
    /// I2C address of the device
    pub i2c_addr: u8,

    /// Pressure oversampling setting
    pub oversampling: Oversampling,

    /// Reference pressure for the altitude conversion in Pascals
    pub sea_level_pressure_pa: f32,

    /// Upper bound for a single bus transaction in milliseconds
    pub bus_timeout_ms: u32,

    /// Check the chip ID register during initialization
    pub verify_chip_id: bool,
}

impl Default for Bmp085Config {
    fn default() -> Self {
        Self {
            i2c_addr: BMP085_I2C_ADDR,
            oversampling: Oversampling::UltraHighResolution,
            sea_level_pressure_pa: STD_SEA_LEVEL_PRESSURE_PA,
            bus_timeout_ms: 50,
            verify_chip_id: true,
        }
    }
}

/// BMP085 barometric altitude sensor
///
/// Every call to [`AltitudeSensor::measure`] reads the result of the previous
/// conversion and starts the next one, so the caller must leave at least
/// [`Oversampling::conversion_time_us`] between calls.
pub struct Bmp085<I: BusTransport, D: DelayNs> {
    /// BMP085 configuration
    config: Bmp085Config,
    /// Bus the device is attached to
    bus: I,
    /// Delay source for settle times and bus timeouts
    delay: D,
    /// Calibration data, present once initialized
    calibration: Option<CalibrationConstants>,
    /// Which conversion is outstanding
    scheduler: MeasurementScheduler,
    /// Latest raw temperature since initialization
    raw_temperature: Option<u16>,
    /// Latest raw pressure since initialization
    raw_pressure: Option<u32>,
    /// Latest compensated values
    reading: Option<CompensatedReading>,
    /// Smoothed altitude and ground reference
    state: AltitudeState,
}

impl<I: BusTransport, D: DelayNs> Bmp085<I, D> {
    /// Create a new BMP085 driver with the default configuration
    pub fn new(bus: I, delay: D) -> Self {
        Self::new_with_config(bus, delay, Bmp085Config::default())
    }

    /// Create a new BMP085 driver with custom configuration
    pub fn new_with_config(bus: I, delay: D, config: Bmp085Config) -> Self {
        Self {
            config,
            bus,
            delay,
            calibration: None,
            scheduler: MeasurementScheduler::primed(),
            raw_temperature: None,
            raw_pressure: None,
            reading: None,
            state: AltitudeState::new(),
        }
    }

    /// Active configuration, including any sea level pressure set since construction
    pub fn config(&self) -> &Bmp085Config {
        &self.config
    }

    /// Calibration constants loaded by `initialize`
    pub fn calibration(&self) -> Option<&CalibrationConstants> {
        self.calibration.as_ref()
    }

    /// Latest compensated temperature and pressure
    pub fn reading(&self) -> Option<CompensatedReading> {
        self.reading
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Set the reference pressure used by future altitude conversions
    pub fn set_sea_level_pressure(&mut self, pressure_pa: f32) {
        self.config.sea_level_pressure_pa = pressure_pa;
    }

    /// Give back the bus and delay
    pub fn release(self) -> (I, D) {
        (self.bus, self.delay)
    }

    async fn write_register(&mut self, reg: u8, value: u8) -> SensorResult<()> {
        let addr = self.config.i2c_addr;
        let timeout_ms = self.config.bus_timeout_ms;
        with_timeout(&mut self.delay, timeout_ms, self.bus.write_register(addr, reg, value)).await
    }

    async fn read_registers(&mut self, reg: u8, data: &mut [u8]) -> SensorResult<()> {
        let addr = self.config.i2c_addr;
        let timeout_ms = self.config.bus_timeout_ms;
        with_timeout(&mut self.delay, timeout_ms, self.bus.read_registers(addr, reg, data)).await
    }

    async fn read_word(&mut self, reg: u8) -> SensorResult<u16> {
        let addr = self.config.i2c_addr;
        let timeout_ms = self.config.bus_timeout_ms;
        with_timeout(&mut self.delay, timeout_ms, self.bus.read_word(addr, reg)).await
    }

    /// Start a conversion
    async fn request(&mut self, conversion: Conversion) -> SensorResult<()> {
        let command = match conversion {
            Conversion::Temperature => BMP085_CMD_TEMPERATURE,
            Conversion::Pressure => BMP085_CMD_PRESSURE + (self.config.oversampling.bits() << 6),
        };
        self.write_register(BMP085_REG_CONTROL, command).await
    }

    async fn read_raw_temperature(&mut self) -> SensorResult<u16> {
        self.read_word(BMP085_REG_RESULT).await
    }

    async fn read_raw_pressure(&mut self) -> SensorResult<u32> {
        let mut buffer = [0u8; 3];
        self.read_registers(BMP085_REG_RESULT, &mut buffer).await?;

        let raw = ((buffer[0] as u32) << 16) | ((buffer[1] as u32) << 8) | (buffer[2] as u32);
        Ok(raw >> (8 - self.config.oversampling.bits()))
    }

    async fn read_calibration(&mut self) -> SensorResult<CalibrationConstants> {
        let mut block = [0u8; CALIBRATION_BLOCK_LEN];
        self.read_registers(BMP085_REG_CALIB_START, &mut block).await?;
        CalibrationConstants::from_bytes(&block)
    }

    async fn verify_chip_id(&mut self) -> SensorResult<()> {
        let mut id = [0u8; 1];
        self.read_registers(BMP085_REG_CHIP_ID, &mut id).await?;
        if id[0] != BMP085_CHIP_ID {
            return Err(SensorError::UnexpectedChipId {
                found: id[0],
                expected: BMP085_CHIP_ID,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "embassy")]
impl<I: BusTransport> Bmp085<I, embassy_time::Delay> {
    /// Create a BMP085 driver that waits on the embassy time driver
    pub fn new_embassy(bus: I, config: Bmp085Config) -> Self {
        Self::new_with_config(bus, embassy_time::Delay, config)
    }
}

impl<I: BusTransport, D: DelayNs> AltitudeSensor for Bmp085<I, D> {
    async fn initialize(&mut self) -> SensorResult<()> {
        self.calibration = None;

        if self.config.verify_chip_id {
            self.verify_chip_id().await?;
        }

        let calibration = self.read_calibration().await?;
        debug!("BMP085 calibration: {:?}", calibration);

        // Prime the pipeline, the first measure() reads this temperature
        self.request(Conversion::Temperature).await?;
        self.scheduler = MeasurementScheduler::primed();
        self.raw_temperature = None;
        self.raw_pressure = None;
        self.reading = None;
        self.calibration = Some(calibration);

        self.delay.delay_ms(BMP085_STARTUP_DELAY_MS).await;
        info!(
            "BMP085 initialized at {:#04x}, oversampling {:?}",
            self.config.i2c_addr, self.config.oversampling
        );
        Ok(())
    }

    async fn measure(&mut self) -> SensorResult<()> {
        let calibration = self.calibration.ok_or(SensorError::NotInitialized)?;

        // Only commit the step once both bus transactions went through
        let mut scheduler = self.scheduler;
        let step = scheduler.advance();
        match step.consume {
            Conversion::Temperature => self.raw_temperature = Some(self.read_raw_temperature().await?),
            Conversion::Pressure => self.raw_pressure = Some(self.read_raw_pressure().await?),
        }
        self.request(step.request).await?;
        self.scheduler = scheduler;
        debug!("BMP085 read {:?}, requested {:?}", step.consume, step.request);

        let (Some(temperature), Some(pressure)) = (self.raw_temperature, self.raw_pressure) else {
            return Ok(());
        };
        let reading = calibration.compensate(RawSample { temperature, pressure }, self.config.oversampling)?;
        self.reading = Some(reading);

        let raw_altitude = pressure_to_altitude(reading.pressure_pa(), self.config.sea_level_pressure_pa);
        self.state.update(raw_altitude)
    }

    async fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }

    fn altitude_state(&self) -> &AltitudeState {
        &self.state
    }

    fn altitude_state_mut(&mut self) -> &mut AltitudeState {
        &mut self.state
    }
}
