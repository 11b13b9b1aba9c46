// SPDX-License-Identifier: GPL-3.0-only
//! In-memory display system for unit tests
//!
//! Records every context, handle, ramp write and VCP write so tests can check
//! fan-out behavior and that every acquired handle is released.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::bail;

use crate::error::{BrightnessError, Result};
use crate::gamma::GammaRamp;
use crate::monitor::{DisplayDevice, DisplaySystem, GammaContext, PhysicalMonitor, VcpReading};

#[derive(Debug, Clone)]
pub struct FakeMonitor {
    pub brightness: u16,
    pub maximum: u16,
    pub fail_write: bool,
    pub fail_read: bool,
}

impl FakeMonitor {
    pub fn new(brightness: u16) -> Self {
        Self {
            brightness,
            maximum: 100,
            fail_write: false,
            fail_read: false,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_read = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub name: String,
    pub ramp: GammaRamp,
    pub fail_open: bool,
    pub fail_ramp_write: bool,
    pub fail_resolution: bool,
    pub monitors: Vec<FakeMonitor>,
}

/// Linear identity ramp, what a freshly booted display usually carries
pub fn identity_ramp() -> GammaRamp {
    GammaRamp::grayscale((0..256u32).map(|i| (i * 257) as u16).collect())
}

impl FakeDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ramp: identity_ramp(),
            fail_open: false,
            fail_ramp_write: false,
            fail_resolution: false,
            monitors: Vec::new(),
        }
    }

    pub fn with_ramp(mut self, ramp: GammaRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn with_monitors(mut self, monitors: Vec<FakeMonitor>) -> Self {
        self.monitors = monitors;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_ramp_writes(mut self) -> Self {
        self.fail_ramp_write = true;
        self
    }

    pub fn failing_monitor_resolution(mut self) -> Self {
        self.fail_resolution = true;
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FakeStats {
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub ramp_reads: usize,
    pub ramp_writes: usize,
    pub handles_acquired: usize,
    pub handles_released: usize,
    pub vcp_writes: usize,
    pub vcp_reads: usize,
    /// Physical monitor discovery passes, one per batch or single lookup
    pub monitor_scans: usize,
}

impl FakeStats {
    /// Total number of calls that reached a device
    pub fn device_io(&self) -> usize {
        self.contexts_opened
            + self.ramp_reads
            + self.ramp_writes
            + self.handles_acquired
            + self.vcp_writes
            + self.vcp_reads
    }
}

#[derive(Debug, Default)]
struct FakeState {
    devices: Vec<FakeDevice>,
    primary: Option<usize>,
    enumeration_fails: bool,
    stats: FakeStats,
}

#[derive(Debug, Clone)]
pub struct FakeSystem {
    state: Rc<RefCell<FakeState>>,
}

impl FakeSystem {
    /// The first device (if any) is the primary one
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        let primary = if devices.is_empty() { None } else { Some(0) };
        Self {
            state: Rc::new(RefCell::new(FakeState {
                devices,
                primary,
                enumeration_fails: false,
                stats: FakeStats::default(),
            })),
        }
    }

    pub fn connect(&self, device: FakeDevice) {
        let mut state = self.state.borrow_mut();
        state.devices.push(device);
        if state.primary.is_none() {
            state.primary = Some(state.devices.len() - 1);
        }
    }

    /// Make the device list itself unavailable
    pub fn fail_enumeration(&self, fail: bool) {
        self.state.borrow_mut().enumeration_fails = fail;
    }

    pub fn ramp(&self, name: &str) -> GammaRamp {
        self.with_device(name, |d| d.ramp.clone())
    }

    /// Change a ramp behind the engine's back
    pub fn set_ramp(&self, name: &str, ramp: GammaRamp) {
        self.with_device(name, |d| d.ramp = ramp);
    }

    pub fn monitor_levels(&self, name: &str) -> Vec<u16> {
        self.with_device(name, |d| d.monitors.iter().map(|m| m.brightness).collect())
    }

    pub fn set_monitor_level(&self, name: &str, slot: usize, value: u16) {
        self.with_device(name, |d| d.monitors[slot].brightness = value);
    }

    pub fn stats(&self) -> FakeStats {
        self.state.borrow().stats
    }

    fn with_device<T>(&self, name: &str, f: impl FnOnce(&mut FakeDevice) -> T) -> T {
        let mut state = self.state.borrow_mut();
        let device = state
            .devices
            .iter_mut()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("no fake device named {name}"));
        f(device)
    }

    fn open(&self, index: usize) -> Result<FakeContext> {
        let mut state = self.state.borrow_mut();
        let device = state
            .devices
            .get(index)
            .ok_or_else(|| BrightnessError::access(format!("#{index}"), "no such device"))?;
        if device.fail_open {
            return Err(BrightnessError::access(&device.name, "CreateDC failed"));
        }
        let name = device.name.clone();
        state.stats.contexts_opened += 1;
        Ok(FakeContext {
            state: Rc::clone(&self.state),
            index,
            name,
        })
    }

    fn resolve(&self, device: &DisplayDevice) -> Result<Vec<FakeHandle>> {
        let index = device.handle as usize;
        let mut state = self.state.borrow_mut();
        let (fail, count) = {
            let d = state
                .devices
                .get(index)
                .ok_or_else(|| BrightnessError::access(&device.name, "no such device"))?;
            (d.fail_resolution, d.monitors.len())
        };
        if fail {
            return Err(BrightnessError::access(
                &device.name,
                "GetPhysicalMonitorsFromHMONITOR failed",
            ));
        }
        state.stats.handles_acquired += count;
        Ok((0..count)
            .map(|slot| FakeHandle {
                state: Rc::clone(&self.state),
                index,
                slot,
                name: format!("{}#{}", device.name, slot),
            })
            .collect())
    }
}

impl DisplaySystem for FakeSystem {
    type Context = FakeContext;
    type Monitor = FakeHandle;

    fn displays(&self) -> Result<Vec<DisplayDevice>> {
        let state = self.state.borrow();
        if state.enumeration_fails {
            return Err(BrightnessError::access("screen", "EnumDisplayMonitors failed"));
        }
        Ok(state
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| DisplayDevice::new(d.name.clone(), i as isize))
            .collect())
    }

    fn primary_display(&self) -> Option<DisplayDevice> {
        let state = self.state.borrow();
        state
            .primary
            .map(|i| DisplayDevice::new(state.devices[i].name.clone(), i as isize))
    }

    fn default_context(&self) -> Result<FakeContext> {
        let primary = self.state.borrow().primary;
        match primary {
            Some(index) => self.open(index),
            None => Err(BrightnessError::access("default", "no display attached")),
        }
    }

    fn open_context(&self, device: &DisplayDevice) -> Result<FakeContext> {
        self.open(device.handle as usize)
    }

    fn physical_monitors(&self, device: &DisplayDevice) -> Result<Vec<FakeHandle>> {
        self.state.borrow_mut().stats.monitor_scans += 1;
        self.resolve(device)
    }

    fn physical_monitors_of(&self, devices: &[DisplayDevice]) -> Vec<Result<Vec<FakeHandle>>> {
        self.state.borrow_mut().stats.monitor_scans += 1;
        devices.iter().map(|device| self.resolve(device)).collect()
    }
}

#[derive(Debug)]
pub struct FakeContext {
    state: Rc<RefCell<FakeState>>,
    index: usize,
    name: String,
}

impl GammaContext for FakeContext {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn read_ramp(&self) -> Result<GammaRamp> {
        let mut state = self.state.borrow_mut();
        state.stats.ramp_reads += 1;
        Ok(state.devices[self.index].ramp.clone())
    }

    fn write_ramp(&self, ramp: &GammaRamp) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.stats.ramp_writes += 1;
        let device = &mut state.devices[self.index];
        if device.fail_ramp_write {
            return Err(BrightnessError::ProtocolWrite {
                device: device.name.clone(),
                source: anyhow::anyhow!("SetDeviceGammaRamp failed"),
            });
        }
        device.ramp = ramp.clone();
        Ok(())
    }
}

impl Drop for FakeContext {
    fn drop(&mut self) {
        self.state.borrow_mut().stats.contexts_closed += 1;
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    state: Rc<RefCell<FakeState>>,
    index: usize,
    slot: usize,
    name: String,
}

impl PhysicalMonitor for FakeHandle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn set_brightness(&mut self, value: u16) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        state.stats.vcp_writes += 1;
        let monitor = &mut state.devices[self.index].monitors[self.slot];
        if monitor.fail_write {
            bail!("SetVCPFeature timed out");
        }
        monitor.brightness = value;
        Ok(())
    }

    fn brightness(&mut self) -> anyhow::Result<VcpReading> {
        let mut state = self.state.borrow_mut();
        state.stats.vcp_reads += 1;
        let monitor = &state.devices[self.index].monitors[self.slot];
        if monitor.fail_read {
            bail!("GetVCPFeature timed out");
        }
        Ok(VcpReading {
            minimum: 0,
            current: monitor.brightness,
            maximum: monitor.maximum,
        })
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.state.borrow_mut().stats.handles_released += 1;
    }
}
