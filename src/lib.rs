// SPDX-License-Identifier: GPL-3.0-only
//! Display brightness control
//!
//! Two independent mechanisms: a software backend that scales the graphics
//! adapter's gamma ramp, and a hardware backend that dims the backlight over
//! DDC/CI. [`BrightnessEngine`] is the entry point for both.

#[macro_use]
extern crate tracing;

pub mod brightness;
pub mod config;
pub mod error;
pub mod gamma;
pub mod hardware;
pub mod monitor;
pub mod platform;
pub mod protocols;

pub use brightness::{
    Backend, BrightnessBackend, BrightnessEngine, DeviceOutcome, DisplayStatus, FanOutPolicy,
    FanOutReport,
};
pub use config::Config;
pub use error::{BrightnessError, Result};
