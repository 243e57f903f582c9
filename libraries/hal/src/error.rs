use thiserror::Error;

/// Errors reported by altitude sensors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorError {
    /// The bus did not complete a transaction in time
    #[error("Sensor unavailable: no bus response within {timeout_ms} ms")]
    SensorUnavailable { timeout_ms: u32 },

    /// The bus transport reported a failed transaction
    #[error("Bus transaction failed")]
    Bus,

    /// Calibration constants cannot be used for compensation
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(&'static str),

    /// Smoothing coefficient outside of (0, 1]
    #[error("Configuration error: smooth factor {smooth_factor} must be in (0, 1]")]
    ConfigurationError { smooth_factor: f32 },

    /// The device at the configured address is not the expected chip
    #[error("Unexpected chip id {found:#04x}, expected {expected:#04x}")]
    UnexpectedChipId { found: u8, expected: u8 },

    /// `measure` was called before a successful `initialize`
    #[error("Sensor not initialized")]
    NotInitialized,
}

/// Result type for altitude sensor operations
pub type SensorResult<T> = Result<T, SensorError>;
