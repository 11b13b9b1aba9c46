// SPDX-License-Identifier: GPL-3.0-only
//! Hardware brightness over DDC/CI
//!
//! Writes go to every physical monitor behind every display device. Each
//! handle is consumed by the loop that writes to it, so it is released right
//! after its write whatever the outcome. Monitors are discovered once per
//! write, not once per display device. Reads look at the first physical
//! monitor of the primary display only.

use std::ops::RangeInclusive;

use crate::brightness::{Backend, BrightnessBackend, DeviceOutcome, FanOutPolicy, FanOutReport};
use crate::error::{BrightnessError, Result};
use crate::monitor::{DisplaySystem, PhysicalMonitor, enumerate_physical};

/// Stateless: physical monitor handles never outlive a single call
#[derive(Debug, Default, Clone, Copy)]
pub struct DdcController;

impl DdcController {
    pub fn new() -> Self {
        Self
    }
}

impl<S: DisplaySystem> BrightnessBackend<S> for DdcController {
    fn kind(&self) -> Backend {
        Backend::Hardware
    }

    fn valid_range(&self) -> RangeInclusive<i32> {
        0..=100
    }

    /// Writes are fire-and-forget: the aggregate outcome is informational
    fn policy(&self) -> FanOutPolicy {
        FanOutPolicy::BestEffort
    }

    fn apply(&mut self, system: &S, level: u8) -> Result<FanOutReport> {
        let mut report = FanOutReport::default();

        let targets = match enumerate_physical(system) {
            Ok(targets) => targets,
            Err(e) => {
                report.push(DeviceOutcome {
                    device: "displays".to_string(),
                    result: Err(e),
                });
                return Ok(report);
            }
        };

        for target in targets {
            let monitors = match target.monitors {
                Ok(monitors) => monitors,
                Err(e) => {
                    report.push(DeviceOutcome {
                        device: target.device.name,
                        result: Err(e),
                    });
                    continue;
                }
            };

            if monitors.is_empty() {
                debug!(device = %target.device.name, "No DDC/CI capable monitor, skipping");
                continue;
            }

            for mut monitor in monitors {
                let name = monitor.name();
                let result = monitor.set_brightness(u16::from(level));
                drop(monitor);

                let result = match result {
                    Ok(()) => {
                        debug!(monitor = %name, level, "Set hardware brightness");
                        Ok(())
                    }
                    Err(source) => {
                        warn!(monitor = %name, error = %source, "Failed to set hardware brightness");
                        Err(BrightnessError::ProtocolWrite {
                            device: name.clone(),
                            source,
                        })
                    }
                };
                report.push(DeviceOutcome { device: name, result });
            }
        }

        Ok(report)
    }

    fn read(&mut self, system: &S) -> Result<u8> {
        let primary = system
            .primary_display()
            .ok_or_else(|| BrightnessError::access("primary", "no primary display"))?;

        let mut monitor = system
            .physical_monitors(&primary)?
            .into_iter()
            .next()
            .ok_or_else(|| BrightnessError::access(&primary.name, "no physical monitor"))?;

        let reading = monitor
            .brightness()
            .map_err(|source| BrightnessError::ProtocolRead {
                device: monitor.name(),
                source,
            })?;
        debug!(
            device = %primary.name,
            minimum = reading.minimum,
            current = reading.current,
            maximum = reading.maximum,
            "Queried hardware brightness"
        );

        Ok(reading.current.min(100) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakeDevice, FakeMonitor, FakeSystem};

    fn apply(system: &FakeSystem, level: u8) -> FanOutReport {
        BrightnessBackend::<FakeSystem>::apply(&mut DdcController::new(), system, level).unwrap()
    }

    fn read(system: &FakeSystem) -> Result<u8> {
        BrightnessBackend::<FakeSystem>::read(&mut DdcController::new(), system)
    }

    #[test]
    fn writes_every_monitor_of_every_device() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![FakeMonitor::new(10)]),
            FakeDevice::new("DISPLAY2")
                .with_monitors(vec![FakeMonitor::new(20), FakeMonitor::new(30)]),
        ]);
        let report = apply(&system, 65);

        assert_eq!(report.attempted(), 3);
        assert!(report.all_succeeded());
        assert_eq!(system.monitor_levels("DISPLAY1"), vec![65]);
        assert_eq!(system.monitor_levels("DISPLAY2"), vec![65, 65]);
    }

    #[test]
    fn handles_are_released_even_when_writes_fail() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![
                FakeMonitor::new(10).failing_writes(),
                FakeMonitor::new(20),
            ]),
            FakeDevice::new("DISPLAY2").with_monitors(vec![FakeMonitor::new(30).failing_writes()]),
        ]);
        let report = apply(&system, 80);

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failed().count(), 2);
        assert_eq!(system.monitor_levels("DISPLAY1"), vec![10, 80]);

        let stats = system.stats();
        assert_eq!(stats.handles_acquired, 3);
        assert_eq!(stats.handles_released, 3);
    }

    #[test]
    fn device_without_monitors_is_skipped() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1"),
            FakeDevice::new("DISPLAY2").with_monitors(vec![FakeMonitor::new(30)]),
        ]);
        let report = apply(&system, 0);

        assert_eq!(report.attempted(), 1);
        assert!(report.all_succeeded());
        assert_eq!(system.monitor_levels("DISPLAY2"), vec![0]);
    }

    #[test]
    fn unresolvable_device_is_recorded_and_skipped() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").failing_monitor_resolution(),
            FakeDevice::new("DISPLAY2").with_monitors(vec![FakeMonitor::new(30)]),
        ]);
        let report = apply(&system, 45);

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(system.monitor_levels("DISPLAY2"), vec![45]);
    }

    #[test]
    fn unavailable_device_list_is_recorded() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![FakeMonitor::new(30)]),
        ]);
        system.fail_enumeration(true);
        let report = apply(&system, 45);

        assert_eq!(report.attempted(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(system.stats().vcp_writes, 0);
    }

    #[test]
    fn monitors_are_discovered_once_per_write() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![FakeMonitor::new(10)]),
            FakeDevice::new("DISPLAY2").with_monitors(vec![FakeMonitor::new(20)]),
            FakeDevice::new("DISPLAY3").with_monitors(vec![FakeMonitor::new(30)]),
        ]);
        apply(&system, 55);

        let stats = system.stats();
        assert_eq!(stats.monitor_scans, 1);
        assert_eq!(stats.vcp_writes, 3);
        assert_eq!(stats.handles_acquired, stats.handles_released);
    }

    #[test]
    fn read_uses_first_monitor_of_primary_only() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1")
                .with_monitors(vec![FakeMonitor::new(35), FakeMonitor::new(90)]),
            FakeDevice::new("DISPLAY2").with_monitors(vec![FakeMonitor::new(70)]),
        ]);
        assert_eq!(read(&system).unwrap(), 35);

        let stats = system.stats();
        assert_eq!(stats.vcp_reads, 1);
        assert_eq!(stats.handles_acquired, stats.handles_released);
    }

    #[test]
    fn read_tracks_out_of_band_changes() {
        let system = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![FakeMonitor::new(35)]),
        ]);
        system.set_monitor_level("DISPLAY1", 0, 12);
        assert_eq!(read(&system).unwrap(), 12);
    }

    #[test]
    fn read_failures() {
        let no_display = FakeSystem::new(vec![]);
        assert!(read(&no_display).is_err());

        let no_monitor = FakeSystem::new(vec![FakeDevice::new("DISPLAY1")]);
        assert!(matches!(
            read(&no_monitor),
            Err(BrightnessError::DeviceAccess { .. })
        ));

        let silent = FakeSystem::new(vec![
            FakeDevice::new("DISPLAY1").with_monitors(vec![FakeMonitor::new(35).failing_reads()]),
        ]);
        assert!(matches!(read(&silent), Err(BrightnessError::ProtocolRead { .. })));
        assert_eq!(silent.stats().handles_released, 1);
    }
}
