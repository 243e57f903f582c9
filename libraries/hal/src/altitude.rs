//! Altitude sensor interface

use crate::error::{SensorError, SensorResult};
use log::info;

/// Smoothing coefficient applied to new samples unless configured otherwise
pub const DEFAULT_SMOOTH_FACTOR: f32 = 0.1;

/// Number of measurement cycles folded into the ground reference
pub const GROUND_SAMPLE_COUNT: usize = 20;

/// Pause after each ground sample, at least one full pressure conversion
pub const GROUND_SAMPLE_INTERVAL_MS: u32 = 26;

/// Smoothing coefficient used while converging the ground reference
pub const GROUND_SMOOTH_FACTOR: f32 = 0.5;

/// Exponential smoothing of `current` into `previous`
pub fn smooth(current: f32, previous: f32, factor: f32) -> f32 {
    current * factor + previous * (1.0 - factor)
}

/// Altitude estimate shared by every sensor variant
///
/// Each variant owns one of these and exposes it through
/// [`AltitudeSensor::altitude_state`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeState {
    /// Latest unsmoothed altitude in meters
    raw_altitude: f32,
    /// Exponentially smoothed altitude in meters
    altitude: f32,
    /// Reference altitude captured at startup
    ground_altitude: f32,
    /// Weight of a new sample in the smoothed altitude
    smooth_factor: f32,
    /// Whether the filter has received its first sample
    seeded: bool,
}

impl Default for AltitudeState {
    fn default() -> Self {
        Self {
            raw_altitude: 0.0,
            altitude: 0.0,
            ground_altitude: 0.0,
            smooth_factor: DEFAULT_SMOOTH_FACTOR,
            seeded: false,
        }
    }
}

impl AltitudeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_altitude(&self) -> f32 {
        self.raw_altitude
    }

    pub fn altitude(&self) -> f32 {
        self.altitude
    }

    pub fn ground_altitude(&self) -> f32 {
        self.ground_altitude
    }

    pub fn smooth_factor(&self) -> f32 {
        self.smooth_factor
    }

    /// Feed a new raw altitude into the filter.
    ///
    /// The first sample seeds the filter directly; later samples are blended
    /// with the current smoothing factor. A non-finite sample is rejected and
    /// leaves the state untouched.
    pub fn update(&mut self, raw_altitude: f32) -> SensorResult<()> {
        if !raw_altitude.is_finite() {
            return Err(SensorError::InvalidCalibration("altitude is not finite"));
        }
        self.raw_altitude = raw_altitude;
        if self.seeded {
            self.altitude = smooth(raw_altitude, self.altitude, self.smooth_factor);
        } else {
            self.altitude = raw_altitude;
            self.seeded = true;
        }
        Ok(())
    }

    /// Set the smoothing coefficient.
    ///
    /// Values outside (0, 1] (and NaN) are rejected and the previous
    /// coefficient is kept.
    pub fn set_smooth_factor(&mut self, smooth_factor: f32) -> SensorResult<()> {
        if !(smooth_factor > 0.0 && smooth_factor <= 1.0) {
            return Err(SensorError::ConfigurationError { smooth_factor });
        }
        self.smooth_factor = smooth_factor;
        Ok(())
    }

    pub fn set_ground_altitude(&mut self, ground_altitude: f32) {
        self.ground_altitude = ground_altitude;
    }

    /// Fold the current smoothed altitude into the ground reference
    pub fn fold_into_ground(&mut self) {
        self.ground_altitude = smooth(self.altitude, self.ground_altitude, GROUND_SMOOTH_FACTOR);
    }
}

/// Common interface for sensors that can determine altitude
///
/// Variants supply hardware setup, one measurement step and a delay source;
/// everything else operates on the composed [`AltitudeState`].
pub trait AltitudeSensor {
    /// One-time hardware setup and calibration load
    async fn initialize(&mut self) -> SensorResult<()>;

    /// Advance the measurement pipeline by one step and update the altitude
    async fn measure(&mut self) -> SensorResult<()>;

    /// Block the caller for `ms` milliseconds
    async fn pause_ms(&mut self, ms: u32);

    fn altitude_state(&self) -> &AltitudeState;

    fn altitude_state_mut(&mut self) -> &mut AltitudeState;

    /// Get the latest smoothed altitude in meters
    fn get_altitude(&self) -> f32 {
        self.altitude_state().altitude()
    }

    /// Get the latest unsmoothed altitude in meters
    fn get_raw_altitude(&self) -> f32 {
        self.altitude_state().raw_altitude()
    }

    /// Set the smoothing coefficient used by future measurements
    fn set_smooth_factor(&mut self, smooth_factor: f32) -> SensorResult<()> {
        self.altitude_state_mut().set_smooth_factor(smooth_factor)
    }

    fn set_ground_altitude(&mut self, ground_altitude: f32) {
        self.altitude_state_mut().set_ground_altitude(ground_altitude);
    }

    fn get_ground_altitude(&self) -> f32 {
        self.altitude_state().ground_altitude()
    }

    /// Converge the ground reference over several back-to-back samples.
    ///
    /// Blocks for roughly `GROUND_SAMPLE_COUNT * GROUND_SAMPLE_INTERVAL_MS`
    /// plus bus time. Only call this during startup, after `initialize`.
    async fn measure_ground(&mut self) -> SensorResult<()> {
        for _ in 0..GROUND_SAMPLE_COUNT {
            self.measure().await?;
            self.pause_ms(GROUND_SAMPLE_INTERVAL_MS).await;
            self.altitude_state_mut().fold_into_ground();
        }
        info!("Ground altitude {} m", self.get_ground_altitude());
        Ok(())
    }
}
