// SPDX-License-Identifier: GPL-3.0-only
//! Native display systems
//!
//! Exactly one native implementation is compiled in; the rest of the crate
//! only names [`NativeSystem`].

#[cfg(test)]
pub(crate) mod fake;

#[cfg(all(unix, not(target_os = "macos")))]
mod x11;

#[cfg(windows)]
mod win32;

#[cfg(all(unix, not(target_os = "macos")))]
pub use x11::{X11GammaContext, X11System as NativeSystem};

#[cfg(windows)]
pub use win32::{Win32GammaContext, Win32System as NativeSystem};

/// Connect to the native display subsystem
#[cfg(any(windows, all(unix, not(target_os = "macos"))))]
pub fn connect(config: &crate::config::Config) -> anyhow::Result<NativeSystem> {
    NativeSystem::connect(config.vcp_brightness_code)
}
