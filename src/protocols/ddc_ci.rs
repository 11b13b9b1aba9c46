// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI (Display Data Channel Command Interface) protocol implementation
//!
//! DDC/CI is a standard protocol for controlling monitors over the video
//! cable's control channel. Brightness lives in a single VCP feature.

use anyhow::{Context, Result};
use ddc_hi::Ddc;

use crate::monitor::{PhysicalMonitor, VcpReading};

/// One physical monitor reachable over DDC/CI
///
/// Wraps any `Ddc` handle (`ddc_hi::Display` on Linux, `ddc_winapi::Monitor`
/// on Windows). Dropping the wrapper drops the handle, which closes the I2C
/// device or destroys the physical monitor handle.
pub struct DdcMonitor<D: Ddc> {
    handle: D,
    name: String,
    vcp_code: u8,
}

impl<D: Ddc> DdcMonitor<D> {
    pub fn new(handle: D, name: String, vcp_code: u8) -> Self {
        Self {
            handle,
            name,
            vcp_code,
        }
    }
}

impl<D: Ddc> PhysicalMonitor for DdcMonitor<D>
where
    D::Error: Into<anyhow::Error>,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn set_brightness(&mut self, value: u16) -> Result<()> {
        self.handle
            .set_vcp_feature(self.vcp_code, value)
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("setting VCP 0x{:02X} on {}", self.vcp_code, self.name))
    }

    fn brightness(&mut self) -> Result<VcpReading> {
        let value = self
            .handle
            .get_vcp_feature(self.vcp_code)
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("reading VCP 0x{:02X} on {}", self.vcp_code, self.name))?;
        Ok(VcpReading {
            minimum: 0,
            current: value.value(),
            maximum: value.maximum(),
        })
    }
}

impl<D: Ddc> Drop for DdcMonitor<D> {
    fn drop(&mut self) {
        trace!(monitor = %self.name, "Releasing physical monitor handle");
    }
}

impl<D: Ddc> std::fmt::Debug for DdcMonitor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DdcMonitor(name: {}, vcp: 0x{:02X})", self.name, self.vcp_code)
    }
}
