// SPDX-License-Identifier: GPL-3.0-only
//! Display control protocols
//!
//! Hardware brightness is written through DDC/CI. Gamma ramps need no wire
//! protocol and are handled by the platform layer directly.

pub mod ddc_ci;

pub use ddc_ci::DdcMonitor;
