//! Typed registry keys.
//!
//! Every array in the container is addressed by a key built from closed enums
//! rather than a free-form name, so two distinct quantities can never alias
//! one another. The `Display` form (`ActivePowerVariable__ThermalStandard`) is
//! what appears in results tables and exported models.

use pcm_core::{BranchKind, DeviceKind, ServiceKind};
use serde::Serialize;
use std::fmt;

/// Owner of a container entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Device(DeviceKind),
    Branch(BranchKind),
    Service(ServiceKind),
    Bus,
    System,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Device(kind) => write!(f, "{kind}"),
            EntityKind::Branch(kind) => write!(f, "{kind}"),
            EntityKind::Service(kind) => write!(f, "{kind}"),
            EntityKind::Bus => f.write_str("ACBus"),
            EntityKind::System => f.write_str("System"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum VariableKind {
    ActivePower,
    ReactivePower,
    ActivePowerReserve,
    VoltageAngle,
    VoltageMagnitude,
    FlowActivePower,
    FlowReactivePower,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::ActivePower => "ActivePowerVariable",
            VariableKind::ReactivePower => "ReactivePowerVariable",
            VariableKind::ActivePowerReserve => "ActivePowerReserveVariable",
            VariableKind::VoltageAngle => "VoltageAngle",
            VariableKind::VoltageMagnitude => "VoltageMagnitude",
            VariableKind::FlowActivePower => "FlowActivePowerVariable",
            VariableKind::FlowReactivePower => "FlowReactivePowerVariable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintKind {
    ActivePowerRangeUb,
    ActivePowerRangeLb,
    /// Upper bound that follows a forecast (renewables)
    ActivePowerTimeSeriesLimit,
    Requirement,
    ActivePowerBalance,
    ReactivePowerBalance,
    FlowActivePowerDefinition,
    FlowReactivePowerDefinition,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::ActivePowerRangeUb => "ActivePowerVariableLimitsConstraint_ub",
            ConstraintKind::ActivePowerRangeLb => "ActivePowerVariableLimitsConstraint_lb",
            ConstraintKind::ActivePowerTimeSeriesLimit => "ActivePowerVariableTimeSeriesLimitsConstraint",
            ConstraintKind::Requirement => "RequirementConstraint",
            ConstraintKind::ActivePowerBalance => "ActivePowerBalance",
            ConstraintKind::ReactivePowerBalance => "ReactivePowerBalance",
            ConstraintKind::FlowActivePowerDefinition => "FlowActivePowerConstraint",
            ConstraintKind::FlowReactivePowerDefinition => "FlowReactivePowerConstraint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ExpressionKind {
    ActivePowerBalance,
    ReactivePowerBalance,
    /// Terms added to a device's upper range constraint (up reserves)
    ActivePowerRangeUb,
    /// Terms subtracted in a device's lower range constraint (down reserves)
    ActivePowerRangeLb,
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpressionKind::ActivePowerBalance => "ActivePowerBalance",
            ExpressionKind::ReactivePowerBalance => "ReactivePowerBalance",
            ExpressionKind::ActivePowerRangeUb => "ActivePowerRangeExpressionUB",
            ExpressionKind::ActivePowerRangeLb => "ActivePowerRangeExpressionLB",
        };
        f.write_str(name)
    }
}

macro_rules! container_key {
    ($(#[$doc:meta])* $name:ident, $kind:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name {
            pub kind: $kind,
            pub entity: EntityKind,
            /// Disambiguates entries of the same kind and entity (service name)
            pub meta: Option<String>,
        }

        impl $name {
            pub fn new(kind: $kind, entity: EntityKind) -> Self {
                Self {
                    kind,
                    entity,
                    meta: None,
                }
            }

            pub fn with_meta(kind: $kind, entity: EntityKind, meta: impl Into<String>) -> Self {
                Self {
                    kind,
                    entity,
                    meta: Some(meta.into()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}__{}", self.kind, self.entity)?;
                if let Some(meta) = &self.meta {
                    write!(f, "__{meta}")?;
                }
                Ok(())
            }
        }
    };
}

container_key!(
    /// Key of a variable array.
    VariableKey,
    VariableKind
);
container_key!(
    /// Key of a constraint array.
    ConstraintKey,
    ConstraintKind
);
container_key!(
    /// Key of an expression array.
    ExpressionKey,
    ExpressionKind
);
