// SPDX-License-Identifier: GPL-3.0-only
//! Brightness control engine
//!
//! Routes "set brightness X via backend B" and "read backend B" to the gamma
//! controller or the DDC/CI controller. Both backends implement
//! [`BrightnessBackend`], so callers only depend on the [`Backend`] tag.
//!
//! Neither backend remembers the last value it set. Reads always go back to
//! the device, so they follow changes made by other software.
//!
//! # Usage
//!
//! ```no_run
//! use candela::{Backend, BrightnessEngine, Config};
//!
//! # fn example(system: candela::platform::NativeSystem) {
//! let mut engine = BrightnessEngine::new(system, &Config::default());
//! engine.init_brightness_control();
//! engine.set(Backend::Software, 75);
//! let level = engine.get(Backend::Software);
//! engine.cleanup_brightness_control();
//! # }
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{BrightnessError, Result};
use crate::gamma::{BaselineState, GammaController};
use crate::hardware::DdcController;
use crate::monitor::{DisplayDevice, DisplaySystem, enumerate_displays};

/// Level both backends consider "full brightness"
pub const FULL_BRIGHTNESS: i32 = 100;

/// The two independent brightness mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Gamma ramp scaling
    Software,
    /// DDC/CI backlight control
    Hardware,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Software => "software",
            Backend::Hardware => "hardware",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "software" | "sw" | "gamma" => Ok(Backend::Software),
            "hardware" | "hw" | "ddc" => Ok(Backend::Hardware),
            other => Err(format!(
                "Invalid backend '{other}', expected 'software' or 'hardware'"
            )),
        }
    }
}

/// How per-device outcomes fold into the overall result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// Success only if every device succeeded
    AllMustSucceed,
    /// Success once the level was valid and the fan-out ran
    BestEffort,
}

/// Outcome of one device (or physical monitor) in a fan-out
#[derive(Debug)]
pub struct DeviceOutcome {
    pub device: String,
    pub result: Result<()>,
}

/// Per-device results of a fan-out operation
#[derive(Debug, Default)]
pub struct FanOutReport {
    outcomes: Vec<DeviceOutcome>,
}

impl FanOutReport {
    pub fn push(&mut self, outcome: DeviceOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[DeviceOutcome] {
        &self.outcomes
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True for an empty fan-out
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self, policy: FanOutPolicy) -> bool {
        match policy {
            FanOutPolicy::AllMustSucceed => self.all_succeeded(),
            FanOutPolicy::BestEffort => true,
        }
    }
}

/// Contract shared by the software and hardware backends
pub trait BrightnessBackend<S: DisplaySystem> {
    fn kind(&self) -> Backend;

    /// Levels accepted by [`BrightnessBackend::set`]
    fn valid_range(&self) -> RangeInclusive<i32>;

    fn policy(&self) -> FanOutPolicy;

    /// Fan an already validated level out to every device
    fn apply(&mut self, system: &S, level: u8) -> Result<FanOutReport>;

    /// Re-derive the current level from device state
    fn read(&mut self, system: &S) -> Result<u8>;

    /// Reject out-of-range levels before any device I/O
    fn validate(&self, level: i32) -> Result<u8> {
        let range = self.valid_range();
        if !range.contains(&level) {
            return Err(BrightnessError::InvalidArgument {
                backend: self.kind().name(),
                level,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(level as u8)
    }

    fn set(&mut self, system: &S, level: i32) -> Result<FanOutReport> {
        let level = self.validate(level)?;
        self.apply(system, level)
    }
}

/// Diagnostic view of one display device
#[derive(Debug, Clone)]
pub struct DisplayStatus {
    pub device: DisplayDevice,
    pub primary: bool,
    /// `None` when the physical monitors could not be resolved
    pub physical_monitors: Option<usize>,
}

/// Owns the display system and both backends for the life of the process
///
/// Dropping the engine restores the captured gamma baseline.
pub struct BrightnessEngine<S: DisplaySystem> {
    system: S,
    software: GammaController<S>,
    hardware: DdcController,
    fallback_level: i32,
}

impl<S: DisplaySystem> BrightnessEngine<S> {
    pub fn new(system: S, config: &Config) -> Self {
        Self {
            system,
            software: GammaController::new(),
            hardware: DdcController::new(),
            fallback_level: config.fallback_level,
        }
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn baseline_state(&self) -> BaselineState {
        self.software.baseline_state()
    }

    fn with_backend<T>(
        &mut self,
        backend: Backend,
        f: impl FnOnce(&mut dyn BrightnessBackend<S>, &S) -> T,
    ) -> T {
        match backend {
            Backend::Software => f(&mut self.software, &self.system),
            Backend::Hardware => f(&mut self.hardware, &self.system),
        }
    }

    pub fn valid_range(&mut self, backend: Backend) -> RangeInclusive<i32> {
        self.with_backend(backend, |b, _| b.valid_range())
    }

    /// Set a level and return the per-device outcome
    pub fn set_with_report(&mut self, backend: Backend, level: i32) -> Result<FanOutReport> {
        self.with_backend(backend, |b, system| b.set(system, level))
    }

    /// Set a level; the result follows the backend's fan-out policy
    pub fn set(&mut self, backend: Backend, level: i32) -> bool {
        self.with_backend(backend, |b, system| match b.set(system, level) {
            Ok(report) => {
                if !report.all_succeeded() {
                    warn!(
                        backend = %b.kind(),
                        failed = report.failed().count(),
                        attempted = report.attempted(),
                        "Brightness not applied to every device"
                    );
                }
                report.succeeded(b.policy())
            }
            Err(e) => {
                warn!(backend = %b.kind(), level, error = %e, "Failed to set brightness");
                false
            }
        })
    }

    /// Current level, or the configured fallback if the device can't be read
    ///
    /// The fallback is clamped into the backend's valid range.
    pub fn get(&mut self, backend: Backend) -> i32 {
        let fallback = self.fallback_level;
        self.with_backend(backend, |b, system| match b.read(system) {
            Ok(level) => i32::from(level),
            Err(e) => {
                let range = b.valid_range();
                let fallback = fallback.clamp(*range.start(), *range.end());
                warn!(backend = %b.kind(), error = %e, fallback, "Failed to read brightness, using fallback");
                fallback
            }
        })
    }

    pub fn reset(&mut self, backend: Backend) -> bool {
        self.set(backend, FULL_BRIGHTNESS)
    }

    /// Put `from` back to full brightness before the caller starts driving `to`
    pub fn switch_backend(&mut self, from: Backend, to: Backend) -> bool {
        if from == to {
            return true;
        }
        info!(%from, %to, "Switching brightness backend");
        self.reset(from)
    }

    pub fn status(&self) -> Result<Vec<DisplayStatus>> {
        let devices = enumerate_displays(&self.system)?;
        let primary = self.system.primary_display();
        let resolved = self.system.physical_monitors_of(&devices);
        Ok(devices
            .into_iter()
            .zip(resolved)
            .map(|(device, monitors)| DisplayStatus {
                primary: primary.as_ref() == Some(&device),
                device,
                physical_monitors: monitors.ok().map(|m| m.len()),
            })
            .collect())
    }

    /// Keep the current gamma ramp after the engine goes away
    pub fn keep_software_brightness(&mut self) {
        self.software.forget_baseline();
    }

    pub fn set_software_brightness(&mut self, level: i32) -> bool {
        self.set(Backend::Software, level)
    }

    pub fn set_hardware_brightness(&mut self, level: i32) -> bool {
        self.set(Backend::Hardware, level)
    }

    pub fn get_software_brightness(&mut self) -> i32 {
        self.get(Backend::Software)
    }

    pub fn get_hardware_brightness(&mut self) -> i32 {
        self.get(Backend::Hardware)
    }

    /// Capture the gamma baseline up front
    pub fn init_brightness_control(&mut self) -> bool {
        match self.software.capture_baseline(&self.system) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to capture gamma baseline: {}", e);
                false
            }
        }
    }

    /// Restore the gamma baseline; safe to call more than once
    pub fn cleanup_brightness_control(&mut self) {
        if let Err(e) = self.software.restore_baseline() {
            error!("Failed to restore gamma baseline: {}", e);
        }
    }
}

impl<S: DisplaySystem> Drop for BrightnessEngine<S> {
    fn drop(&mut self) {
        self.cleanup_brightness_control();
    }
}
