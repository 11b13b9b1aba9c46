// SPDX-License-Identifier: GPL-3.0-only
//! Gamma ramp math
//!
//! The requested software level (1-100) is remapped onto 49-100 because a
//! ramp scaled below roughly half leaves most panels unreadably dark. The
//! remapped value becomes a linear scale factor applied identically to all
//! three channels.

/// Number of entries in a computed ramp
pub const RAMP_SIZE: usize = 256;

/// Lowest remapped level (what a software level of 1 maps to)
pub const REMAP_FLOOR: f64 = 49.0;

const REMAP_SPAN: f64 = 100.0 - REMAP_FLOOR;
const LEVEL_SPAN: f64 = 99.0;

/// Per-channel gamma lookup table
///
/// Computed ramps always have [`RAMP_SIZE`] entries and identical channels.
/// Ramps read from a device keep the device's native size and channels so
/// they can be written back bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaRamp {
    pub red: Vec<u16>,
    pub green: Vec<u16>,
    pub blue: Vec<u16>,
}

/// Map a software level in 1..=100 onto 49..=100
pub fn remap(level: u8) -> f64 {
    REMAP_FLOOR + f64::from(level.saturating_sub(1)) * REMAP_SPAN / LEVEL_SPAN
}

/// Inverse of the ramp computation for the value found at the top entry
///
/// Lossy: both directions round, so the result is only guaranteed to be
/// within one step of the level that produced the ramp.
pub fn level_from_top_entry(value: u16) -> u8 {
    let remapped = 100.0 * f64::from(value) / (255.0 * 255.0);
    let level = 1.0 + (remapped - REMAP_FLOOR) * LEVEL_SPAN / REMAP_SPAN;
    level.round().clamp(1.0, 100.0) as u8
}

impl GammaRamp {
    /// A ramp with the same table on all three channels
    pub fn grayscale(values: Vec<u16>) -> Self {
        Self {
            red: values.clone(),
            green: values.clone(),
            blue: values,
        }
    }

    /// Brightness-scaled ramp for a software level in 1..=100
    pub fn for_level(level: u8) -> Self {
        let factor = remap(level) / 100.0;
        let values = (0..RAMP_SIZE)
            .map(|i| (i as f64 * factor * 255.0).round().clamp(0.0, 65535.0) as u16)
            .collect();
        Self::grayscale(values)
    }

    pub fn len(&self) -> usize {
        self.red.len()
    }

    pub fn is_empty(&self) -> bool {
        self.red.is_empty()
    }

    /// Value of the last (brightest) entry of the red channel
    pub fn top_entry(&self) -> Option<u16> {
        self.red.last().copied()
    }

    pub fn is_grayscale(&self) -> bool {
        self.red == self.green && self.green == self.blue
    }

    /// Nearest-entry resample to `size` entries per channel
    pub fn resample(&self, size: usize) -> Self {
        if size == self.len() || self.is_empty() {
            return self.clone();
        }
        let channel = |src: &[u16]| -> Vec<u16> {
            let last = src.len() - 1;
            (0..size)
                .map(|j| {
                    let idx = if size > 1 { j * last / (size - 1) } else { last };
                    src[idx]
                })
                .collect()
        };
        Self {
            red: channel(&self.red),
            green: channel(&self.green),
            blue: channel(&self.blue),
        }
    }

    /// Flatten into the red/green/blue layout GDI expects
    pub fn to_planar(&self) -> Vec<u16> {
        let mut out = Vec::with_capacity(self.len() * 3);
        out.extend_from_slice(&self.red);
        out.extend_from_slice(&self.green);
        out.extend_from_slice(&self.blue);
        out
    }

    /// Build from a red/green/blue planar table
    pub fn from_planar(planar: &[u16]) -> Option<Self> {
        if planar.is_empty() || planar.len() % 3 != 0 {
            return None;
        }
        let n = planar.len() / 3;
        Some(Self {
            red: planar[..n].to_vec(),
            green: planar[n..2 * n].to_vec(),
            blue: planar[2 * n..].to_vec(),
        })
    }
}
