// SPDX-License-Identifier: GPL-3.0-only
//! Windows display system
//!
//! GDI monitors are display devices. Gamma goes through a device context
//! created from the monitor's device name; hardware brightness goes through
//! the Dxva2 physical monitors behind each `HMONITOR`.

use std::ffi::c_void;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    CreateDCW, DeleteDC, EnumDisplayMonitors, GetDC, GetMonitorInfoW, HDC, HMONITOR,
    MONITOR_DEFAULTTOPRIMARY, MONITORINFO, MONITORINFOEXW, MonitorFromPoint, ReleaseDC,
};
use windows::Win32::UI::ColorSystem::{GetDeviceGammaRamp, SetDeviceGammaRamp};
use windows::core::PCWSTR;

use crate::error::{BrightnessError, Result};
use crate::gamma::{GammaRamp, RAMP_SIZE};
use crate::monitor::{DisplayDevice, DisplaySystem, GammaContext};
use crate::protocols::DdcMonitor;

pub struct Win32System {
    vcp_code: u8,
}

impl Win32System {
    pub fn connect(vcp_code: u8) -> anyhow::Result<Self> {
        Ok(Self { vcp_code })
    }
}

unsafe extern "system" fn collect_monitor(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    data: LPARAM,
) -> BOOL {
    let monitors = unsafe { &mut *(data.0 as *mut Vec<HMONITOR>) };
    monitors.push(hmonitor);
    TRUE
}

fn monitor_name(hmonitor: HMONITOR) -> Option<String> {
    let mut info = MONITORINFOEXW::default();
    info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;
    let ok = unsafe {
        GetMonitorInfoW(hmonitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO)
    };
    if !ok.as_bool() {
        return None;
    }
    let len = info
        .szDevice
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(info.szDevice.len());
    Some(String::from_utf16_lossy(&info.szDevice[..len]))
}

fn to_device(hmonitor: HMONITOR) -> Option<DisplayDevice> {
    monitor_name(hmonitor).map(|name| DisplayDevice::new(name, hmonitor.0 as isize))
}

impl DisplaySystem for Win32System {
    type Context = Win32GammaContext;
    type Monitor = DdcMonitor<ddc_winapi::Monitor>;

    fn displays(&self) -> Result<Vec<DisplayDevice>> {
        let mut handles: Vec<HMONITOR> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(collect_monitor),
                LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
            )
        };
        if !ok.as_bool() {
            return Err(BrightnessError::access("screen", "EnumDisplayMonitors failed"));
        }
        Ok(handles.into_iter().filter_map(to_device).collect())
    }

    fn primary_display(&self) -> Option<DisplayDevice> {
        let hmonitor = unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };
        if hmonitor.is_invalid() {
            return None;
        }
        to_device(hmonitor)
    }

    fn default_context(&self) -> Result<Win32GammaContext> {
        let hdc = unsafe { GetDC(HWND::default()) };
        if hdc.is_invalid() {
            return Err(BrightnessError::access("screen", "GetDC failed"));
        }
        Ok(Win32GammaContext {
            hdc,
            owner: DcOwner::Screen,
            name: "screen".to_string(),
        })
    }

    fn open_context(&self, device: &DisplayDevice) -> Result<Win32GammaContext> {
        let wide: Vec<u16> = device.name.encode_utf16().chain(std::iter::once(0)).collect();
        let hdc = unsafe { CreateDCW(PCWSTR(wide.as_ptr()), PCWSTR::null(), PCWSTR::null(), None) };
        if hdc.is_invalid() {
            return Err(BrightnessError::access(&device.name, "CreateDCW failed"));
        }
        Ok(Win32GammaContext {
            hdc,
            owner: DcOwner::Created,
            name: device.name.clone(),
        })
    }

    fn physical_monitors(&self, device: &DisplayDevice) -> Result<Vec<Self::Monitor>> {
        let physical = ddc_winapi::get_physical_monitors_from_hmonitor(device.handle as *mut _)
            .map_err(|e| BrightnessError::access(&device.name, e))?;

        Ok(physical
            .into_iter()
            .enumerate()
            .map(|(i, handle)| {
                let monitor = unsafe { ddc_winapi::Monitor::new(handle) };
                DdcMonitor::new(monitor, format!("{}#{}", device.name, i), self.vcp_code)
            })
            .collect())
    }
}

enum DcOwner {
    /// From `GetDC`, released with `ReleaseDC`
    Screen,
    /// From `CreateDCW`, released with `DeleteDC`
    Created,
}

pub struct Win32GammaContext {
    hdc: HDC,
    owner: DcOwner,
    name: String,
}

impl GammaContext for Win32GammaContext {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn read_ramp(&self) -> Result<GammaRamp> {
        let mut table = [0u16; RAMP_SIZE * 3];
        let ok = unsafe { GetDeviceGammaRamp(self.hdc, table.as_mut_ptr() as *mut c_void) };
        if !ok.as_bool() {
            return Err(BrightnessError::ProtocolRead {
                device: self.name.clone(),
                source: std::io::Error::last_os_error().into(),
            });
        }
        GammaRamp::from_planar(&table).ok_or_else(|| BrightnessError::ProtocolRead {
            device: self.name.clone(),
            source: anyhow::anyhow!("malformed gamma table"),
        })
    }

    fn write_ramp(&self, ramp: &GammaRamp) -> Result<()> {
        let planar = ramp.resample(RAMP_SIZE).to_planar();
        let ok = unsafe { SetDeviceGammaRamp(self.hdc, planar.as_ptr() as *const c_void) };
        if !ok.as_bool() {
            return Err(BrightnessError::ProtocolWrite {
                device: self.name.clone(),
                source: std::io::Error::last_os_error().into(),
            });
        }
        Ok(())
    }
}

impl Drop for Win32GammaContext {
    fn drop(&mut self) {
        unsafe {
            match self.owner {
                DcOwner::Screen => {
                    let _ = ReleaseDC(HWND::default(), self.hdc);
                }
                DcOwner::Created => {
                    let _ = DeleteDC(self.hdc);
                }
            }
        }
    }
}
