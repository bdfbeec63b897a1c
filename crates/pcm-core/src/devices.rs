//! Injection devices and ancillary services.
//!
//! Devices are grouped by [`DeviceKind`]; the assembly layer builds every
//! device of one kind with a single formulation. Services reference the
//! devices that may contribute to them by name.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::{Megavars, Megawatts};
use crate::BusId;

/// Concrete device types known to the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceKind {
    ThermalStandard,
    RenewableDispatch,
    PowerLoad,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::ThermalStandard => "ThermalStandard",
            DeviceKind::RenewableDispatch => "RenewableDispatch",
            DeviceKind::PowerLoad => "PowerLoad",
        }
    }

    pub fn all() -> &'static [DeviceKind] {
        &[
            DeviceKind::ThermalStandard,
            DeviceKind::RenewableDispatch,
            DeviceKind::PowerLoad,
        ]
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch types known to the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BranchKind {
    Line,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Line => f.write_str("Line"),
        }
    }
}

/// Direction of a reserve product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReserveDirection {
    /// Headroom above the scheduled output
    Up,
    /// Footroom below the scheduled output
    Down,
}

/// Service types known to the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceKind {
    ReserveUp,
    ReserveDown,
}

impl ServiceKind {
    pub fn direction(&self) -> ReserveDirection {
        match self {
            ServiceKind::ReserveUp => ReserveDirection::Up,
            ServiceKind::ReserveDown => ReserveDirection::Down,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::ReserveUp => f.write_str("VariableReserveUp"),
            ServiceKind::ReserveDown => f.write_str("VariableReserveDown"),
        }
    }
}

/// Dispatchable thermal unit with a linear energy cost.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalStandard {
    pub name: String,
    pub bus: BusId,
    /// Current active power set-point
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    pub pmin: Megawatts,
    pub pmax: Megawatts,
    pub qmin: Megavars,
    pub qmax: Megavars,
    /// Marginal energy cost ($/MWh)
    pub variable_cost: f64,
    pub available: bool,
}

impl ThermalStandard {
    pub fn new(name: impl Into<String>, bus: BusId) -> Self {
        Self {
            name: name.into(),
            bus,
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
            pmin: Megawatts(0.0),
            pmax: Megawatts(0.0),
            qmin: Megavars(0.0),
            qmax: Megavars(0.0),
            variable_cost: 0.0,
            available: true,
        }
    }

    pub fn with_active_power_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = Megawatts(pmin);
        self.pmax = Megawatts(pmax);
        self
    }

    pub fn with_reactive_power_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = Megavars(qmin);
        self.qmax = Megavars(qmax);
        self
    }

    pub fn with_variable_cost(mut self, cost: f64) -> Self {
        self.variable_cost = cost;
        self
    }
}

/// Curtailable renewable plant. Its forecast is normalized to `rating`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenewableDispatch {
    pub name: String,
    pub bus: BusId,
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    /// Nameplate active power
    pub rating: Megawatts,
    pub qmin: Megavars,
    pub qmax: Megavars,
    pub variable_cost: f64,
    pub available: bool,
}

impl RenewableDispatch {
    pub fn new(name: impl Into<String>, bus: BusId, rating: f64) -> Self {
        Self {
            name: name.into(),
            bus,
            active_power: Megawatts(rating),
            reactive_power: Megavars(0.0),
            rating: Megawatts(rating),
            qmin: Megavars(0.0),
            qmax: Megavars(0.0),
            variable_cost: 0.0,
            available: true,
        }
    }

    pub fn with_active_power(mut self, p: f64) -> Self {
        self.active_power = Megawatts(p);
        self
    }

    pub fn with_reactive_power(mut self, q: f64) -> Self {
        self.reactive_power = Megavars(q);
        self
    }

    pub fn with_reactive_power_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = Megavars(qmin);
        self.qmax = Megavars(qmax);
        self
    }

    pub fn with_variable_cost(mut self, cost: f64) -> Self {
        self.variable_cost = cost;
        self
    }
}

/// Fixed demand. Its forecast is normalized to `max_active_power`.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLoad {
    pub name: String,
    pub bus: BusId,
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    pub max_active_power: Megawatts,
    pub max_reactive_power: Megavars,
    pub available: bool,
}

impl PowerLoad {
    pub fn new(name: impl Into<String>, bus: BusId, max_active_power: f64) -> Self {
        Self {
            name: name.into(),
            bus,
            active_power: Megawatts(max_active_power),
            reactive_power: Megavars(0.0),
            max_active_power: Megawatts(max_active_power),
            max_reactive_power: Megavars(0.0),
            available: true,
        }
    }

    pub fn with_active_power(mut self, p: f64) -> Self {
        self.active_power = Megawatts(p);
        self
    }

    pub fn with_max_reactive_power(mut self, q: f64) -> Self {
        self.max_reactive_power = Megavars(q);
        self.reactive_power = Megavars(q);
        self
    }
}

/// Any injection device.
#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    Thermal(ThermalStandard),
    Renewable(RenewableDispatch),
    Load(PowerLoad),
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Thermal(_) => DeviceKind::ThermalStandard,
            Device::Renewable(_) => DeviceKind::RenewableDispatch,
            Device::Load(_) => DeviceKind::PowerLoad,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Device::Thermal(d) => &d.name,
            Device::Renewable(d) => &d.name,
            Device::Load(d) => &d.name,
        }
    }

    pub fn bus(&self) -> BusId {
        match self {
            Device::Thermal(d) => d.bus,
            Device::Renewable(d) => d.bus,
            Device::Load(d) => d.bus,
        }
    }

    pub fn available(&self) -> bool {
        match self {
            Device::Thermal(d) => d.available,
            Device::Renewable(d) => d.available,
            Device::Load(d) => d.available,
        }
    }

    /// Current active power set-point.
    pub fn active_power(&self) -> Megawatts {
        match self {
            Device::Thermal(d) => d.active_power,
            Device::Renewable(d) => d.active_power,
            Device::Load(d) => d.active_power,
        }
    }

    /// Current reactive power set-point.
    pub fn reactive_power(&self) -> Megavars {
        match self {
            Device::Thermal(d) => d.reactive_power,
            Device::Renewable(d) => d.reactive_power,
            Device::Load(d) => d.reactive_power,
        }
    }

    /// Largest active power the device can produce (or consume, for loads).
    pub fn max_active_power(&self) -> Megawatts {
        match self {
            Device::Thermal(d) => d.pmax,
            Device::Renewable(d) => d.rating,
            Device::Load(d) => d.max_active_power,
        }
    }

    pub fn min_active_power(&self) -> Megawatts {
        match self {
            Device::Thermal(d) => d.pmin,
            Device::Renewable(_) | Device::Load(_) => Megawatts(0.0),
        }
    }

    pub fn reactive_power_limits(&self) -> (Megavars, Megavars) {
        match self {
            Device::Thermal(d) => (d.qmin, d.qmax),
            Device::Renewable(d) => (d.qmin, d.qmax),
            Device::Load(d) => (d.max_reactive_power, d.max_reactive_power),
        }
    }

    pub fn max_reactive_power(&self) -> Megavars {
        self.reactive_power_limits().1
    }

    /// Linear energy cost ($/MWh); zero for loads.
    pub fn variable_cost(&self) -> f64 {
        match self {
            Device::Thermal(d) => d.variable_cost,
            Device::Renewable(d) => d.variable_cost,
            Device::Load(_) => 0.0,
        }
    }
}

/// Reserve requirement shared by a set of contributing devices.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveService {
    pub name: String,
    pub direction: ReserveDirection,
    /// Static requirement scalar (MW) applied to the `requirement` series
    pub requirement: f64,
    /// Offer cost per MW of reserve held ($/MW)
    pub offer_cost: f64,
    /// Names of devices allowed to provide the reserve
    pub contributing_devices: Vec<String>,
    pub available: bool,
}

impl ReserveService {
    pub fn new(name: impl Into<String>, direction: ReserveDirection, requirement: f64) -> Self {
        Self {
            name: name.into(),
            direction,
            requirement,
            offer_cost: 0.0,
            contributing_devices: Vec::new(),
            available: true,
        }
    }

    pub fn with_contributors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contributing_devices = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offer_cost(mut self, cost: f64) -> Self {
        self.offer_cost = cost;
        self
    }
}

/// Any ancillary service.
#[derive(Debug, Clone, PartialEq)]
pub enum Service {
    Reserve(ReserveService),
}

impl Service {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Service::Reserve(r) => match r.direction {
                ReserveDirection::Up => ServiceKind::ReserveUp,
                ReserveDirection::Down => ServiceKind::ReserveDown,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Service::Reserve(r) => &r.name,
        }
    }
}
