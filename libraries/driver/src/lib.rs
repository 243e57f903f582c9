//! Barometric altitude drivers
//!
//! Drivers talk to the device through [`baro::BusTransport`], which every
//! `embedded_hal_async::i2c::I2c` implements, and wait through an injected
//! `embedded_hal_async::delay::DelayNs`. The resulting sensors implement
//! [`hal::AltitudeSensor`].
#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod baro;

pub use baro::bmp085::{Bmp085, Bmp085Config, Oversampling};
