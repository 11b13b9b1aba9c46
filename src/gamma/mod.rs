mod baseline;
mod controller;
mod ramp;

pub use baseline::{Baseline, BaselineState};
pub use controller::GammaController;
pub use ramp::{GammaRamp, RAMP_SIZE, REMAP_FLOOR, level_from_top_entry, remap};
