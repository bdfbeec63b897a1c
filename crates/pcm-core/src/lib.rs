//! # pcm-core: System data for operations problems
//!
//! Provides the read-only system snapshot that the problem-assembly engine in
//! `pcm-model` consumes: buses, lines, injection devices, reserve services and
//! their forecast time series.
//!
//! ## Quick Start
//!
//! ```rust
//! use pcm_core::*;
//!
//! let mut system = System::new(100.0);
//! system.add_bus(Bus::new(BusId::new(1), "bus1").with_type(BusType::Ref)).unwrap();
//! system.add_bus(Bus::new(BusId::new(2), "bus2")).unwrap();
//! system
//!     .add_line(Line::new("line1_2", BusId::new(1), BusId::new(2), 0.1).with_rating(50.0))
//!     .unwrap();
//! system
//!     .add_device(Device::Thermal(
//!         ThermalStandard::new("gen1", BusId::new(1))
//!             .with_active_power_limits(0.0, 100.0)
//!             .with_variable_cost(10.0),
//!     ))
//!     .unwrap();
//! system
//!     .add_device(Device::Load(PowerLoad::new("load2", BusId::new(2), 40.0)))
//!     .unwrap();
//!
//! assert_eq!(system.devices(DeviceKind::ThermalStandard).len(), 1);
//! assert_eq!(system.islands().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`devices`] - Device and service records
//! - [`source`] - The [`DataSource`] contract and the in-memory [`System`]
//! - [`timeseries`] - Forecast series
//! - [`units`] - Unit newtypes

use serde::{Deserialize, Serialize};

pub mod devices;
pub mod error;
pub mod source;
pub mod timeseries;
pub mod units;

pub use devices::{
    BranchKind, Device, DeviceKind, PowerLoad, RenewableDispatch, ReserveDirection,
    ReserveService, Service, ServiceKind, ThermalStandard,
};
pub use error::{PcmError, PcmResult};
pub use source::{islands, reference_bus, DataSource, ForecastWindow, System};
pub use timeseries::TimeSeries;
pub use units::{MegavoltAmperes, Megavars, Megawatts, PerUnit};

/// Bus identifier (newtype for type safety).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Bus role in the power flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BusType {
    /// Angle reference (slack)
    Ref,
    PV,
    #[default]
    PQ,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub bus_type: BusType,
    /// Base voltage in kilovolts
    pub base_kv: f64,
    /// Voltage magnitude limits in per-unit (min, max)
    pub voltage_limits: (PerUnit, PerUnit),
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bus_type: BusType::PQ,
            base_kv: 0.0,
            voltage_limits: (PerUnit(0.9), PerUnit(1.1)),
        }
    }

    pub fn with_type(mut self, bus_type: BusType) -> Self {
        self.bus_type = bus_type;
        self
    }

    pub fn with_voltage_limits(mut self, vmin: f64, vmax: f64) -> Self {
        self.voltage_limits = (PerUnit(vmin), PerUnit(vmax));
        self
    }
}

/// AC line between two buses.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series reactance (per-unit)
    pub reactance: f64,
    /// Thermal rating; `None` means unlimited
    pub rating: Option<MegavoltAmperes>,
    pub available: bool,
}

impl Line {
    pub fn new(name: impl Into<String>, from_bus: BusId, to_bus: BusId, reactance: f64) -> Self {
        Self {
            name: name.into(),
            from_bus,
            to_bus,
            reactance,
            rating: None,
            available: true,
        }
    }

    pub fn with_rating(mut self, rating_mva: f64) -> Self {
        self.rating = Some(MegavoltAmperes(rating_mva));
        self
    }

    /// Series susceptance `1/x`.
    pub fn susceptance(&self) -> f64 {
        1.0 / self.reactance
    }

    pub fn kind(&self) -> BranchKind {
        BranchKind::Line
    }
}
