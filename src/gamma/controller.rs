// SPDX-License-Identifier: GPL-3.0-only
//! Software brightness through the gamma ramp
//!
//! Owns the process-lifetime baseline and fans a computed ramp out to every
//! display device. Each device gets its own context, opened and released
//! within the apply step.

use std::ops::RangeInclusive;

use super::baseline::{Baseline, BaselineState};
use super::ramp::{GammaRamp, level_from_top_entry};
use crate::brightness::{Backend, BrightnessBackend, DeviceOutcome, FanOutPolicy, FanOutReport};
use crate::error::{BrightnessError, Result};
use crate::monitor::{DisplaySystem, GammaContext, enumerate_displays};

pub struct GammaController<S: DisplaySystem> {
    baseline: Baseline<S::Context>,
}

impl<S: DisplaySystem> GammaController<S> {
    pub fn new() -> Self {
        Self {
            baseline: Baseline::new(),
        }
    }

    pub fn baseline_state(&self) -> BaselineState {
        self.baseline.state()
    }

    /// Capture the default screen's ramp if not captured yet
    pub fn capture_baseline(&mut self, system: &S) -> Result<()> {
        self.baseline.capture_with(|| system.default_context())
    }

    /// Write the captured ramp back; no-op when nothing was captured
    pub fn restore_baseline(&mut self) -> Result<()> {
        self.baseline.restore()
    }

    /// Release the baseline without restoring it
    pub fn forget_baseline(&mut self) {
        self.baseline.forget()
    }
}

impl<S: DisplaySystem> Default for GammaController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DisplaySystem> BrightnessBackend<S> for GammaController<S> {
    fn kind(&self) -> Backend {
        Backend::Software
    }

    fn valid_range(&self) -> RangeInclusive<i32> {
        1..=100
    }

    fn policy(&self) -> FanOutPolicy {
        FanOutPolicy::AllMustSucceed
    }

    fn apply(&mut self, system: &S, level: u8) -> Result<FanOutReport> {
        self.capture_baseline(system)?;

        let ramp = GammaRamp::for_level(level);
        let mut report = FanOutReport::default();

        for device in enumerate_displays(system)? {
            let result = system
                .open_context(&device)
                .and_then(|context| context.write_ramp(&ramp));
            match &result {
                Ok(()) => debug!(device = %device.name, level, "Applied gamma ramp"),
                Err(e) => warn!(device = %device.name, error = %e, "Failed to apply gamma ramp"),
            }
            report.push(DeviceOutcome {
                device: device.name,
                result,
            });
        }

        Ok(report)
    }

    fn read(&mut self, system: &S) -> Result<u8> {
        let ramp = match self.baseline.context() {
            Some(context) => context.read_ramp()?,
            None => system.default_context()?.read_ramp()?,
        };
        let top = ramp.top_entry().ok_or_else(|| BrightnessError::ProtocolRead {
            device: "default".to_string(),
            source: anyhow::anyhow!("gamma ramp is empty"),
        })?;
        Ok(level_from_top_entry(top))
    }
}
