// SPDX-License-Identifier: GPL-3.0-only
//! Types shared between the engine and the platform display layer

use crate::error::Result;
use crate::gamma::GammaRamp;

/// A logical display device as reported by the OS
///
/// Rebuilt on every enumeration; never cached across operations because
/// monitors can be connected or removed at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDevice {
    /// Device name (e.g. `\\.\DISPLAY1` or `DP-2`)
    pub name: String,
    /// Opaque platform handle (HMONITOR, RandR CRTC, ...)
    pub handle: isize,
}

impl DisplayDevice {
    pub fn new(name: impl Into<String>, handle: isize) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

/// Brightness as reported by the monitor control protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpReading {
    pub minimum: u16,
    pub current: u16,
    pub maximum: u16,
}

/// An open device context that can read and write the gamma ramp
///
/// The underlying OS context is released when the value is dropped.
pub trait GammaContext {
    fn device_name(&self) -> &str;

    fn read_ramp(&self) -> Result<GammaRamp>;

    fn write_ramp(&self, ramp: &GammaRamp) -> Result<()>;
}

/// One physical panel behind a display device
///
/// The OS handle is released when the value is dropped, so release happens
/// on every path including errors.
pub trait PhysicalMonitor {
    fn name(&self) -> String;

    /// Write a raw brightness value
    fn set_brightness(&mut self, value: u16) -> anyhow::Result<()>;

    /// Query minimum/current/maximum brightness
    fn brightness(&mut self) -> anyhow::Result<VcpReading>;
}

/// The OS display subsystem the engine drives
pub trait DisplaySystem {
    type Context: GammaContext;
    type Monitor: PhysicalMonitor;

    /// All currently active display devices, freshly enumerated
    ///
    /// A device that vanishes mid-enumeration is skipped. An error means the
    /// device list itself could not be obtained.
    fn displays(&self) -> Result<Vec<DisplayDevice>>;

    /// The primary display device, if any
    fn primary_display(&self) -> Option<DisplayDevice>;

    /// Context of the primary/default screen, used for baseline capture
    fn default_context(&self) -> Result<Self::Context>;

    /// Context of a specific display device
    fn open_context(&self, device: &DisplayDevice) -> Result<Self::Context>;

    /// Physical monitor handles nested under a display device
    fn physical_monitors(&self, device: &DisplayDevice) -> Result<Vec<Self::Monitor>>;

    /// Physical monitors of each device in `devices`, in the same order
    ///
    /// Resolves each device separately unless the system can discover every
    /// monitor with one scan.
    fn physical_monitors_of(&self, devices: &[DisplayDevice]) -> Vec<Result<Vec<Self::Monitor>>> {
        devices
            .iter()
            .map(|device| self.physical_monitors(device))
            .collect()
    }
}
