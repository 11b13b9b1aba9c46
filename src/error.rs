// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the brightness engine
//!
//! Every failure mode of the engine maps onto one of these variants. Fan-out
//! operations collect them per device; the boolean surface only reports
//! whether the whole fan-out succeeded.

use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum BrightnessError {
    /// Requested level is outside the backend's valid domain
    #[error("Invalid brightness level {level} for {backend} backend (expected {min}..={max})")]
    InvalidArgument {
        backend: &'static str,
        level: i32,
        min: i32,
        max: i32,
    },

    /// A device context or physical monitor handle could not be obtained
    #[error("Cannot access display {device}: {reason}")]
    DeviceAccess { device: String, reason: String },

    /// A gamma ramp write or DDC/CI write failed
    #[error("Write to display {device} failed: {source}")]
    ProtocolWrite {
        device: String,
        #[source]
        source: anyhow::Error,
    },

    /// A gamma ramp read or DDC/CI query failed
    #[error("Read from display {device} failed: {source}")]
    ProtocolRead {
        device: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrightnessError {
    pub(crate) fn access(device: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DeviceAccess {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for BrightnessError
pub type Result<T> = std::result::Result<T, BrightnessError>;
