//! The read-only data contract consumed by problem assembly.
//!
//! [`DataSource`] is all the assembly engine is allowed to see of a system:
//! component enumeration, forecast lookup and forecast metadata. [`System`] is
//! the in-memory implementation; it validates references as components are
//! added so that builders never see a device attached to a missing bus.

use chrono::{NaiveDateTime, TimeDelta};
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

use crate::devices::{Device, DeviceKind, Service, ServiceKind};
use crate::error::{PcmError, PcmResult};
use crate::timeseries::TimeSeries;
use crate::{Bus, BusId, BusType, Line};

/// Read-only accessors for a power system snapshot.
pub trait DataSource {
    /// System base power (MVA)
    fn base_power(&self) -> f64;

    fn buses(&self) -> &[Bus];

    fn lines(&self) -> &[Line];

    /// Available devices of one kind, in insertion order.
    fn devices(&self, kind: DeviceKind) -> Vec<&Device>;

    /// Available services of one kind, in insertion order.
    fn services(&self, kind: ServiceKind) -> Vec<&Service>;

    fn device(&self, name: &str) -> Option<&Device>;

    /// Forecast attached to `owner` under `label`.
    fn time_series(&self, owner: &str, label: &str) -> Option<&TimeSeries>;

    /// Number of steps in one forecast window.
    fn forecast_horizon(&self) -> usize;

    fn forecast_resolution(&self) -> TimeDelta;

    fn forecast_initial_time(&self) -> NaiveDateTime;
}

/// Forecast window metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastWindow {
    pub initial_time: NaiveDateTime,
    pub resolution: TimeDelta,
    pub horizon: usize,
}

impl Default for ForecastWindow {
    fn default() -> Self {
        Self {
            initial_time: NaiveDateTime::default(),
            resolution: TimeDelta::hours(1),
            horizon: 1,
        }
    }
}

/// In-memory system snapshot.
#[derive(Debug, Clone, Default)]
pub struct System {
    base_power: f64,
    buses: Vec<Bus>,
    lines: Vec<Line>,
    devices: Vec<Device>,
    services: Vec<Service>,
    time_series: HashMap<(String, String), TimeSeries>,
    forecast: ForecastWindow,
}

impl System {
    pub fn new(base_power: f64) -> Self {
        Self {
            base_power,
            ..Self::default()
        }
    }

    pub fn with_forecast_window(mut self, window: ForecastWindow) -> Self {
        self.forecast = window;
        self
    }

    pub fn set_forecast_window(&mut self, window: ForecastWindow) {
        self.forecast = window;
    }

    pub fn add_bus(&mut self, bus: Bus) -> PcmResult<()> {
        if self.buses.iter().any(|b| b.id == bus.id) {
            return Err(PcmError::DuplicateName(format!("bus id {}", bus.id.value())));
        }
        if self.buses.iter().any(|b| b.name == bus.name) {
            return Err(PcmError::DuplicateName(bus.name));
        }
        self.buses.push(bus);
        Ok(())
    }

    pub fn add_line(&mut self, line: Line) -> PcmResult<()> {
        self.require_bus(line.from_bus, &line.name)?;
        self.require_bus(line.to_bus, &line.name)?;
        if line.reactance.abs() < 1e-12 {
            return Err(PcmError::Validation(format!(
                "line {} has zero reactance",
                line.name
            )));
        }
        if self.lines.iter().any(|l| l.name == line.name) {
            return Err(PcmError::DuplicateName(line.name));
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn add_device(&mut self, device: Device) -> PcmResult<()> {
        self.require_bus(device.bus(), device.name())?;
        if self.device(device.name()).is_some() {
            return Err(PcmError::DuplicateName(device.name().to_string()));
        }
        if device.min_active_power().value() > device.max_active_power().value() {
            return Err(PcmError::Validation(format!(
                "device {} has pmin > pmax",
                device.name()
            )));
        }
        self.devices.push(device);
        Ok(())
    }

    pub fn add_service(&mut self, service: Service) -> PcmResult<()> {
        if self.services.iter().any(|s| s.name() == service.name()) {
            return Err(PcmError::DuplicateName(service.name().to_string()));
        }
        let Service::Reserve(reserve) = &service;
        for name in &reserve.contributing_devices {
            if self.device(name).is_none() {
                return Err(PcmError::UnknownComponent(format!(
                    "service {} references device {name}",
                    reserve.name
                )));
            }
        }
        self.services.push(service);
        Ok(())
    }

    /// Attach a forecast to a device or service.
    pub fn add_time_series(
        &mut self,
        owner: &str,
        label: &str,
        series: TimeSeries,
    ) -> PcmResult<()> {
        let known = self.device(owner).is_some() || self.services.iter().any(|s| s.name() == owner);
        if !known {
            return Err(PcmError::UnknownComponent(owner.to_string()));
        }
        if series.resolution != self.forecast.resolution {
            return Err(PcmError::TimeSeries(format!(
                "{owner}/{label} resolution {}s differs from system resolution {}s",
                series.resolution.num_seconds(),
                self.forecast.resolution.num_seconds()
            )));
        }
        self.time_series
            .insert((owner.to_string(), label.to_string()), series);
        Ok(())
    }

    /// Replace the values of an existing forecast.
    pub fn update_time_series(&mut self, owner: &str, label: &str, values: Vec<f64>) -> PcmResult<()> {
        let series = self
            .time_series
            .get_mut(&(owner.to_string(), label.to_string()))
            .ok_or_else(|| PcmError::TimeSeries(format!("{owner}/{label} not found")))?;
        series.values = values;
        Ok(())
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// Connected groups of buses, in bus insertion order.
    pub fn islands(&self) -> Vec<Vec<BusId>> {
        islands(&self.buses, &self.lines)
    }

    fn require_bus(&self, id: BusId, owner: &str) -> PcmResult<()> {
        if self.bus(id).is_none() {
            return Err(PcmError::UnknownComponent(format!(
                "{owner} references bus {}",
                id.value()
            )));
        }
        Ok(())
    }
}

/// Group buses into electrical islands using in-service lines.
pub fn islands(buses: &[Bus], lines: &[Line]) -> Vec<Vec<BusId>> {
    let index: HashMap<BusId, usize> = buses.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
    let mut sets = UnionFind::<usize>::new(buses.len());
    for line in lines.iter().filter(|l| l.available) {
        if let (Some(&a), Some(&b)) = (index.get(&line.from_bus), index.get(&line.to_bus)) {
            sets.union(a, b);
        }
    }

    let mut groups: Vec<(usize, Vec<BusId>)> = Vec::new();
    for (i, bus) in buses.iter().enumerate() {
        let root = sets.find(i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(bus.id),
            None => groups.push((root, vec![bus.id])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Reference bus of an island: the first `Ref` bus, else the first bus.
pub fn reference_bus(buses: &[Bus], island: &[BusId]) -> Option<BusId> {
    island
        .iter()
        .copied()
        .find(|id| {
            buses
                .iter()
                .any(|b| b.id == *id && b.bus_type == BusType::Ref)
        })
        .or_else(|| island.first().copied())
}

impl DataSource for System {
    fn base_power(&self) -> f64 {
        self.base_power
    }

    fn buses(&self) -> &[Bus] {
        &self.buses
    }

    fn lines(&self) -> &[Line] {
        &self.lines
    }

    fn devices(&self, kind: DeviceKind) -> Vec<&Device> {
        self.devices
            .iter()
            .filter(|d| d.kind() == kind && d.available())
            .collect()
    }

    fn services(&self, kind: ServiceKind) -> Vec<&Service> {
        self.services
            .iter()
            .filter(|s| {
                let Service::Reserve(r) = s;
                s.kind() == kind && r.available
            })
            .collect()
    }

    fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name() == name)
    }

    fn time_series(&self, owner: &str, label: &str) -> Option<&TimeSeries> {
        self.time_series
            .get(&(owner.to_string(), label.to_string()))
    }

    fn forecast_horizon(&self) -> usize {
        self.forecast.horizon
    }

    fn forecast_resolution(&self) -> TimeDelta {
        self.forecast.resolution
    }

    fn forecast_initial_time(&self) -> NaiveDateTime {
        self.forecast.initial_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{PowerLoad, ReserveDirection, ReserveService, ThermalStandard};

    fn two_bus() -> System {
        let mut sys = System::new(100.0);
        sys.add_bus(Bus::new(BusId::new(1), "b1")).unwrap();
        sys.add_bus(Bus::new(BusId::new(2), "b2").with_type(BusType::Ref))
            .unwrap();
        sys
    }

    #[test]
    fn test_rejects_dangling_bus_reference() {
        let mut sys = two_bus();
        let err = sys
            .add_device(Device::Load(PowerLoad::new("l", BusId::new(9), 1.0)))
            .unwrap_err();
        assert!(matches!(err, PcmError::UnknownComponent(_)));
    }

    #[test]
    fn test_rejects_duplicate_device_names() {
        let mut sys = two_bus();
        let gen = ThermalStandard::new("g", BusId::new(1)).with_active_power_limits(0.0, 1.0);
        sys.add_device(Device::Thermal(gen.clone())).unwrap();
        assert!(matches!(
            sys.add_device(Device::Thermal(gen)),
            Err(PcmError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_services_must_reference_known_devices() {
        let mut sys = two_bus();
        let reserve = ReserveService::new("spin", ReserveDirection::Up, 5.0).with_contributors(["ghost"]);
        assert!(sys.add_service(Service::Reserve(reserve)).is_err());
    }

    #[test]
    fn test_islands_split_on_missing_lines() {
        let mut sys = two_bus();
        sys.add_bus(Bus::new(BusId::new(3), "b3")).unwrap();
        sys.add_line(Line::new("l12", BusId::new(1), BusId::new(2), 0.1))
            .unwrap();

        let groups = sys.islands();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![BusId::new(1), BusId::new(2)]);
        assert_eq!(reference_bus(sys.buses(), &groups[0]), Some(BusId::new(2)));
        assert_eq!(reference_bus(sys.buses(), &groups[1]), Some(BusId::new(3)));
    }

    #[test]
    fn test_devices_filter_by_kind_and_availability() {
        let mut sys = two_bus();
        let mut off = PowerLoad::new("off", BusId::new(1), 1.0);
        off.available = false;
        sys.add_device(Device::Load(off)).unwrap();
        sys.add_device(Device::Load(PowerLoad::new("on", BusId::new(2), 1.0)))
            .unwrap();
        let loads = sys.devices(DeviceKind::PowerLoad);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].name(), "on");
        assert!(sys.devices(DeviceKind::ThermalStandard).is_empty());
    }
}
