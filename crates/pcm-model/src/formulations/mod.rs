//! Built-in formulations.
//!
//! Each submodule exposes builder functions with the signatures expected by
//! [`crate::registry::BuilderRegistry`]. The helpers here are shared by the
//! dispatchable device formulations.

pub mod branches;
pub mod load;
pub mod network;
pub mod nodal;
pub mod renewable;
pub mod services;
pub mod thermal;
pub mod ts_info;

use pcm_core::{Device, DeviceKind};

use crate::container::{
    AffineExpr, ConstraintKey, ConstraintKind, ConstraintRow, ContainerArray, EntityKind,
    ExpressionKey, ExpressionKind, ProblemContainer, Sense, VariableId, VariableKey, VariableKind,
};
use crate::error::BuildResult;

pub(crate) fn device_names(devices: &[&Device]) -> Vec<String> {
    devices.iter().map(|d| d.name().to_string()).collect()
}

/// Free active power variable per device and step, injected into the active balance.
pub(crate) fn add_active_power(
    container: &mut ProblemContainer,
    kind: DeviceKind,
    devices: &[&Device],
) -> BuildResult<ContainerArray<VariableId>> {
    let key = VariableKey::new(VariableKind::ActivePower, EntityKind::Device(kind));
    let vars = container
        .add_variables(key, device_names(devices), |_, _| (None, None))?
        .clone();
    add_to_balance(container, ExpressionKind::ActivePowerBalance, devices, &vars)?;
    Ok(vars)
}

/// Reactive power variable bounded by the device's limits, only under
/// reactive-capable networks.
pub(crate) fn add_reactive_power(
    container: &mut ProblemContainer,
    kind: DeviceKind,
    devices: &[&Device],
) -> BuildResult<()> {
    if !container.network().supports_reactive_power() {
        return Ok(());
    }
    let key = VariableKey::new(VariableKind::ReactivePower, EntityKind::Device(kind));
    let vars = container
        .add_variables(key, device_names(devices), |name, _| {
            devices
                .iter()
                .find(|d| d.name() == name)
                .map(|d| {
                    let (qmin, qmax) = d.reactive_power_limits();
                    (Some(qmin.value()), Some(qmax.value()))
                })
                .unwrap_or((None, None))
        })?
        .clone();
    add_to_balance(container, ExpressionKind::ReactivePowerBalance, devices, &vars)
}

fn add_to_balance(
    container: &mut ProblemContainer,
    balance: ExpressionKind,
    devices: &[&Device],
    vars: &ContainerArray<VariableId>,
) -> BuildResult<()> {
    let key = container.balance_key(balance);
    for device in devices {
        let row = container.balance_row(device.bus())?.to_string();
        for (t, var) in (1..).zip(vars.row(device.name()).unwrap_or_default()) {
            container
                .expression_cell_mut(&key, &row, t)?
                .add_variable(*var, 1.0);
        }
    }
    Ok(())
}

/// `p + up_reserves <= pmax` and `p - down_reserves >= pmin`.
///
/// Reserve terms are read from the range expressions that services filled in
/// earlier; without services the constraints are plain bounds.
pub(crate) fn add_range_constraints(
    container: &mut ProblemContainer,
    kind: DeviceKind,
    devices: &[&Device],
    vars: &ContainerArray<VariableId>,
) -> BuildResult<()> {
    let entity = EntityKind::Device(kind);
    let up = container.expression(&ExpressionKey::new(ExpressionKind::ActivePowerRangeUb, entity));
    let down =
        container.expression(&ExpressionKey::new(ExpressionKind::ActivePowerRangeLb, entity));

    let mut ub_rows: Vec<ConstraintRow> = Vec::with_capacity(vars.values().len());
    let mut lb_rows: Vec<ConstraintRow> = Vec::with_capacity(vars.values().len());
    for device in devices {
        for (name, t, var) in vars.iter().filter(|(n, _, _)| *n == device.name()) {
            let mut ub = AffineExpr::from_variable(*var, 1.0);
            if let Some(cell) = up.and_then(|e| e.get(name, t)) {
                ub.add_scaled(cell, 1.0);
            }
            ub_rows.push((ub, Sense::LessEqual, device.max_active_power().value()));

            let mut lb = AffineExpr::from_variable(*var, 1.0);
            if let Some(cell) = down.and_then(|e| e.get(name, t)) {
                lb.add_scaled(cell, -1.0);
            }
            lb_rows.push((lb, Sense::GreaterEqual, device.min_active_power().value()));
        }
    }

    let axis = device_names(devices);
    container.add_constraints(
        ConstraintKey::new(ConstraintKind::ActivePowerRangeUb, entity),
        axis.clone(),
        ub_rows,
    )?;
    container.add_constraints(
        ConstraintKey::new(ConstraintKind::ActivePowerRangeLb, entity),
        axis,
        lb_rows,
    )?;
    Ok(())
}

/// Linear energy cost, $/MWh scaled to the step length.
pub(crate) fn add_variable_cost(
    container: &mut ProblemContainer,
    devices: &[&Device],
    vars: &ContainerArray<VariableId>,
) {
    let hours = container.resolution_hours();
    for device in devices {
        let coeff = device.variable_cost() * hours;
        for var in vars.row(device.name()).unwrap_or_default() {
            container.add_to_objective(*var, coeff);
        }
    }
}
