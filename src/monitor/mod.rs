mod backend;
mod enumeration;

pub use backend::{DisplayDevice, DisplaySystem, GammaContext, PhysicalMonitor, VcpReading};
pub use enumeration::{DisplayTarget, enumerate_displays, enumerate_physical};
