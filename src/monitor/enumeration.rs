// SPDX-License-Identifier: GPL-3.0-only
//! Monitor enumeration
//!
//! Enumeration is synchronous and runs fresh on every call. A device whose
//! physical monitors cannot be resolved is logged and handed to the caller
//! as a failed target; the remaining devices are still enumerated. Only a
//! failure to list the devices at all is an error.

use super::backend::{DisplayDevice, DisplaySystem};
use crate::error::Result;

/// A display device together with the result of resolving its physical monitors
#[derive(Debug)]
pub struct DisplayTarget<M> {
    pub device: DisplayDevice,
    pub monitors: Result<Vec<M>>,
}

/// Enumerate all currently connected display devices
pub fn enumerate_displays<S: DisplaySystem>(system: &S) -> Result<Vec<DisplayDevice>> {
    let devices = system.displays().inspect_err(|e| {
        error!("Failed to enumerate display devices: {}", e);
    })?;
    debug!("Found {} display device(s)", devices.len());
    for device in &devices {
        trace!(device = %device.name, handle = device.handle, "display device");
    }
    Ok(devices)
}

/// Enumerate display devices and resolve their physical monitors
///
/// Monitors of all devices are resolved in a single pass. Every handle is
/// owned by the returned targets and released when they are dropped.
pub fn enumerate_physical<S: DisplaySystem>(system: &S) -> Result<Vec<DisplayTarget<S::Monitor>>> {
    let devices = enumerate_displays(system)?;
    let resolved = system.physical_monitors_of(&devices);

    Ok(devices
        .into_iter()
        .zip(resolved)
        .map(|(device, monitors)| {
            match &monitors {
                Ok(list) => debug!(
                    device = %device.name,
                    "Resolved {} physical monitor(s)",
                    list.len()
                ),
                Err(e) => warn!(
                    device = %device.name,
                    error = %e,
                    "Failed to resolve physical monitors, skipping device"
                ),
            }
            DisplayTarget { device, monitors }
        })
        .collect())
}
