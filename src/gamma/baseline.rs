// SPDX-License-Identifier: GPL-3.0-only
//! Pre-modification gamma state
//!
//! Scaling a ramp destroys the display's own "100%" table, so the table that
//! was active before the first software change is captured once and written
//! back exactly once. Lifecycle:
//!
//! ```text
//! Uninitialized --capture--> Captured --restore--> Restored --capture--> Captured
//! ```
//!
//! Capturing while already `Captured` is a no-op, so the original table can
//! never be overwritten by an already-scaled one.

use crate::error::{BrightnessError, Result};
use crate::gamma::GammaRamp;
use crate::monitor::GammaContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineState {
    Uninitialized,
    Captured,
    Restored,
}

enum Slot<C> {
    Uninitialized,
    Captured { context: C, ramp: GammaRamp },
    Restored,
}

/// The captured original ramp together with the context it was read from
pub struct Baseline<C> {
    slot: Slot<C>,
}

impl<C: GammaContext> Baseline<C> {
    pub fn new() -> Self {
        Self {
            slot: Slot::Uninitialized,
        }
    }

    pub fn state(&self) -> BaselineState {
        match self.slot {
            Slot::Uninitialized => BaselineState::Uninitialized,
            Slot::Captured { .. } => BaselineState::Captured,
            Slot::Restored => BaselineState::Restored,
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self.slot, Slot::Captured { .. })
    }

    /// Capture the ramp of the context returned by `open`
    ///
    /// `open` is only called when nothing is captured yet. On failure the
    /// state is left untouched and the context (if any) is released.
    pub fn capture_with(&mut self, open: impl FnOnce() -> Result<C>) -> Result<()> {
        if self.is_captured() {
            return Ok(());
        }
        let context = open()?;
        let ramp = context
            .read_ramp()
            .map_err(|e| BrightnessError::access(context.device_name(), e))?;
        info!(
            device = %context.device_name(),
            entries = ramp.len(),
            "Captured baseline gamma ramp"
        );
        self.slot = Slot::Captured { context, ramp };
        Ok(())
    }

    /// Context the baseline was captured from
    pub fn context(&self) -> Option<&C> {
        match &self.slot {
            Slot::Captured { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn ramp(&self) -> Option<&GammaRamp> {
        match &self.slot {
            Slot::Captured { ramp, .. } => Some(ramp),
            _ => None,
        }
    }

    /// Write the captured ramp back and release its context
    ///
    /// A no-op when nothing is captured. The state moves to `Restored` even
    /// when the write fails; the context is gone either way.
    pub fn restore(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.slot, Slot::Restored) {
            Slot::Captured { context, ramp } => {
                let result = context.write_ramp(&ramp);
                match &result {
                    Ok(()) => info!(device = %context.device_name(), "Restored baseline gamma ramp"),
                    Err(e) => error!(
                        device = %context.device_name(),
                        error = %e,
                        "Failed to restore baseline gamma ramp"
                    ),
                }
                result
            }
            previous => {
                self.slot = previous;
                Ok(())
            }
        }
    }

    /// Drop the captured ramp without writing it back
    pub fn forget(&mut self) {
        if let Slot::Captured { context, .. } = std::mem::replace(&mut self.slot, Slot::Uninitialized) {
            info!(device = %context.device_name(), "Keeping current gamma ramp, baseline discarded");
        }
    }
}

impl<C: GammaContext> Default for Baseline<C> {
    fn default() -> Self {
        Self::new()
    }
}
