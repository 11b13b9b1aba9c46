// SPDX-License-Identifier: GPL-3.0-only
//! X11 display system
//!
//! Each active RandR CRTC is a display device and carries its own gamma
//! table. Physical monitors are the DDC/CI displays whose EDID matches one of
//! the outputs driven by that CRTC.
//!
//! CRTC gamma only reaches X clients. Under a native Wayland session it
//! changes XWayland at most, so software brightness has no visible effect.

use std::ffi::OsStr;
use std::rc::Rc;

use anyhow::{Context as _, Result as AnyResult};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{Crtc, Output};
use x11rb::protocol::randr::ConnectionExt as RandrConnectionExt;
use x11rb::protocol::xproto::{Atom, ConnectionExt as XprotoConnectionExt, Timestamp, Window};
use x11rb::rust_connection::RustConnection;

use crate::error::{BrightnessError, Result};
use crate::gamma::GammaRamp;
use crate::monitor::{DisplayDevice, DisplaySystem, GammaContext};
use crate::protocols::DdcMonitor;

/// Bytes of the base EDID block used to pair outputs with DDC/CI displays
const EDID_BLOCK: usize = 128;

pub struct X11System {
    conn: Rc<RustConnection>,
    root: Window,
    edid_atom: Atom,
    vcp_code: u8,
}

impl X11System {
    pub fn connect(vcp_code: u8) -> AnyResult<Self> {
        let (conn, screen_num) = RustConnection::connect(None).context("connecting to X server")?;
        let root = conn.setup().roots[screen_num].root;
        let version = conn.randr_query_version(1, 3)?.reply()?;
        debug!(
            "XRandR {}.{} on screen {}",
            version.major_version, version.minor_version, screen_num
        );
        let edid_atom = conn.intern_atom(false, b"EDID")?.reply()?.atom;

        if is_wayland_session(std::env::var_os("WAYLAND_DISPLAY").as_deref()) {
            warn!("WAYLAND_DISPLAY is set, gamma changes only reach XWayland clients");
        }

        Ok(Self {
            conn: Rc::new(conn),
            root,
            edid_atom,
            vcp_code,
        })
    }

    fn output_name(&self, output: Output, timestamp: Timestamp) -> AnyResult<String> {
        let info = self.conn.randr_get_output_info(output, timestamp)?.reply()?;
        Ok(String::from_utf8_lossy(&info.name).to_string())
    }

    fn active_crtcs(&self) -> AnyResult<Vec<DisplayDevice>> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(self.root)?
            .reply()?;
        let timestamp = resources.config_timestamp;

        Ok(collect_active(
            resources
                .crtcs
                .iter()
                .map(|&crtc| (crtc, self.query_crtc(crtc, timestamp))),
        ))
    }

    /// Output name of an active CRTC, `None` when it drives nothing
    fn query_crtc(&self, crtc: Crtc, timestamp: Timestamp) -> AnyResult<Option<String>> {
        let info = self.conn.randr_get_crtc_info(crtc, timestamp)?.reply()?;
        if info.mode == 0 || info.outputs.is_empty() {
            return Ok(None);
        }
        let name = self
            .output_name(info.outputs[0], timestamp)
            .unwrap_or_else(|_| format!("crtc-{crtc}"));
        Ok(Some(name))
    }

    fn ddc_monitor(&self, display: ddc_hi::Display) -> DdcMonitor<ddc_hi::Handle> {
        let name = display
            .info
            .model_name
            .clone()
            .unwrap_or_else(|| display.info.id.clone());
        DdcMonitor::new(display.handle, name, self.vcp_code)
    }

    fn primary_crtc(&self) -> AnyResult<Option<Crtc>> {
        let output = self.conn.randr_get_output_primary(self.root)?.reply()?.output;
        if output == x11rb::NONE {
            return Ok(None);
        }
        let info = self.conn.randr_get_output_info(output, x11rb::CURRENT_TIME)?.reply()?;
        Ok((info.crtc != x11rb::NONE).then_some(info.crtc))
    }

    /// EDID blobs of every output driven by `crtc`
    fn crtc_edids(&self, crtc: Crtc) -> AnyResult<Vec<Vec<u8>>> {
        let info = self
            .conn
            .randr_get_crtc_info(crtc, x11rb::CURRENT_TIME)?
            .reply()?;

        let mut edids = Vec::new();
        for output in info.outputs {
            let prop = self
                .conn
                .randr_get_output_property(output, self.edid_atom, x11rb::NONE, 0, 256, false, false)?
                .reply()?;
            if prop.format == 8 && prop.data.len() >= EDID_BLOCK {
                edids.push(prop.data);
            }
        }
        Ok(edids)
    }

    fn gamma_size(&self, crtc: Crtc) -> AnyResult<usize> {
        let size = self.conn.randr_get_crtc_gamma_size(crtc)?.reply()?.size;
        anyhow::ensure!(size > 0, "CRTC {crtc} has no gamma table");
        Ok(usize::from(size))
    }
}

fn edid_matches(a: &[u8], b: &[u8]) -> bool {
    a.len() >= EDID_BLOCK && b.len() >= EDID_BLOCK && a[..EDID_BLOCK] == b[..EDID_BLOCK]
}

fn is_wayland_session(wayland_display: Option<&OsStr>) -> bool {
    wayland_display.is_some_and(|value| !value.is_empty())
}

/// Keep the CRTCs that could be queried and drive an output
///
/// A CRTC can be disabled between the resources request and its info
/// request; it is skipped and the others are still reported.
fn collect_active(
    queries: impl IntoIterator<Item = (Crtc, AnyResult<Option<String>>)>,
) -> Vec<DisplayDevice> {
    queries
        .into_iter()
        .filter_map(|(crtc, query)| match query {
            Ok(name) => name.map(|name| DisplayDevice::new(name, crtc as isize)),
            Err(e) => {
                warn!(crtc, "Skipping CRTC that could not be queried: {:#}", e);
                None
            }
        })
        .collect()
}

/// Hand each DDC/CI display to one output with the same base EDID
///
/// `outputs[i]` holds the EDIDs of device `i`. Every output takes at most one
/// display and every display goes to at most one output, so identical panels
/// without serial numbers are spread over the devices instead of being
/// claimed twice. Displays nobody claims are dropped.
fn partition_by_edid<T>(outputs: &[Vec<Vec<u8>>], displays: Vec<(Option<Vec<u8>>, T)>) -> Vec<Vec<T>> {
    let mut free: Vec<Vec<bool>> = outputs.iter().map(|o| vec![true; o.len()]).collect();
    let mut claimed: Vec<Vec<T>> = outputs.iter().map(|_| Vec::new()).collect();

    for (edid, display) in displays {
        let Some(edid) = edid else { continue };
        let slot = outputs.iter().enumerate().find_map(|(device, edids)| {
            edids
                .iter()
                .enumerate()
                .find(|(output, e)| free[device][*output] && edid_matches(e, &edid))
                .map(|(output, _)| (device, output))
        });
        if let Some((device, output)) = slot {
            free[device][output] = false;
            claimed[device].push(display);
        }
    }
    claimed
}

impl DisplaySystem for X11System {
    type Context = X11GammaContext;
    type Monitor = DdcMonitor<ddc_hi::Handle>;

    fn displays(&self) -> Result<Vec<DisplayDevice>> {
        self.active_crtcs()
            .map_err(|e| BrightnessError::access("screen", format!("{e:#}")))
    }

    fn primary_display(&self) -> Option<DisplayDevice> {
        let devices = match self.displays() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate RandR CRTCs: {}", e);
                return None;
            }
        };
        let primary = match self.primary_crtc() {
            Ok(crtc) => crtc,
            Err(e) => {
                warn!("Failed to query primary output: {:#}", e);
                None
            }
        };
        match primary {
            Some(crtc) => devices
                .iter()
                .find(|d| d.handle == crtc as isize)
                .cloned()
                .or_else(|| devices.into_iter().next()),
            None => devices.into_iter().next(),
        }
    }

    fn default_context(&self) -> Result<X11GammaContext> {
        let device = self
            .primary_display()
            .ok_or_else(|| BrightnessError::access("default", "no active CRTC"))?;
        self.open_context(&device)
    }

    fn open_context(&self, device: &DisplayDevice) -> Result<X11GammaContext> {
        let crtc = device.handle as Crtc;
        let size = self
            .gamma_size(crtc)
            .map_err(|e| BrightnessError::access(&device.name, format!("{e:#}")))?;
        Ok(X11GammaContext {
            conn: Rc::clone(&self.conn),
            crtc,
            size,
            name: device.name.clone(),
        })
    }

    fn physical_monitors(&self, device: &DisplayDevice) -> Result<Vec<Self::Monitor>> {
        let devices = self.displays()?;
        let index = devices
            .iter()
            .position(|d| d == device)
            .ok_or_else(|| BrightnessError::access(&device.name, "CRTC is no longer active"))?;
        self.physical_monitors_of(&devices)
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// One DDC/CI bus scan shared by every CRTC in `devices`
    fn physical_monitors_of(&self, devices: &[DisplayDevice]) -> Vec<Result<Vec<Self::Monitor>>> {
        let edids: Vec<Result<Vec<Vec<u8>>>> = devices
            .iter()
            .map(|device| {
                self.crtc_edids(device.handle as Crtc)
                    .map_err(|e| BrightnessError::access(&device.name, format!("{e:#}")))
            })
            .collect();
        let outputs: Vec<Vec<Vec<u8>>> = edids
            .iter()
            .map(|e| e.as_ref().map(Clone::clone).unwrap_or_default())
            .collect();

        let displays = if outputs.iter().all(Vec::is_empty) {
            debug!("No EDID on any output, cannot pair DDC/CI displays");
            Vec::new()
        } else {
            ddc_hi::Display::enumerate()
                .into_iter()
                .map(|display| (display.info.edid_data.clone(), display))
                .collect()
        };

        edids
            .into_iter()
            .zip(partition_by_edid(&outputs, displays))
            .map(|(edids, claimed)| {
                edids.map(|_| claimed.into_iter().map(|d| self.ddc_monitor(d)).collect())
            })
            .collect()
    }
}

/// Gamma table of one CRTC
pub struct X11GammaContext {
    conn: Rc<RustConnection>,
    crtc: Crtc,
    size: usize,
    name: String,
}

impl X11GammaContext {
    fn fetch(&self) -> AnyResult<GammaRamp> {
        let reply = self.conn.randr_get_crtc_gamma(self.crtc)?.reply()?;
        Ok(GammaRamp {
            red: reply.red,
            green: reply.green,
            blue: reply.blue,
        })
    }

    fn store(&self, ramp: &GammaRamp) -> AnyResult<()> {
        let native = ramp.resample(self.size);
        self.conn
            .randr_set_crtc_gamma(self.crtc, &native.red, &native.green, &native.blue)?
            .check()?;
        Ok(())
    }
}

impl GammaContext for X11GammaContext {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn read_ramp(&self) -> Result<GammaRamp> {
        self.fetch().map_err(|source| BrightnessError::ProtocolRead {
            device: self.name.clone(),
            source,
        })
    }

    fn write_ramp(&self, ramp: &GammaRamp) -> Result<()> {
        self.store(ramp).map_err(|source| BrightnessError::ProtocolWrite {
            device: self.name.clone(),
            source,
        })
    }
}
