#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

mod altitude;
mod error;

pub use altitude::*;
pub use error::*;
