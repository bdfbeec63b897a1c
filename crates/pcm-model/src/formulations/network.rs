//! Network stage: balance constraints and bus state variables.
//!
//! Under `CopperPlate` the single system balance is closed as is. Angle-based
//! formulations add bus angles (one reference per island fixed at zero) and
//! subtract the linearized line flows from each bus balance before closing
//! it, so the balance does not depend on branch flow variables:
//!
//! ```text
//! injections(i) - Σ_j base * b_ij * (θ_i - θ_j) = 0
//! ```
//!
//! `DecoupledAcPower` does the same for reactive power with voltage
//! magnitudes in place of angles.

use pcm_core::{islands, reference_bus, BusId, DataSource};
use std::collections::HashSet;
use tracing::info;

use crate::container::{
    ConstraintKey, ConstraintKind, ConstraintRow, ContainerArray, EntityKind, ExpressionKind,
    ProblemContainer, Sense, VariableId, VariableKey, VariableKind,
};
use crate::error::BuildResult;
use crate::template::NetworkFormulation;

pub fn angle_key() -> VariableKey {
    VariableKey::new(VariableKind::VoltageAngle, EntityKind::Bus)
}

pub fn magnitude_key() -> VariableKey {
    VariableKey::new(VariableKind::VoltageMagnitude, EntityKind::Bus)
}

pub fn construct_network(
    container: &mut ProblemContainer,
    source: &dyn DataSource,
) -> BuildResult<()> {
    let network = container.network();
    match network {
        NetworkFormulation::CopperPlate => {}
        NetworkFormulation::DcPower => {
            let angles = add_angles(container, source)?;
            add_linear_flows(container, source, ExpressionKind::ActivePowerBalance, &angles)?;
        }
        NetworkFormulation::DecoupledAcPower => {
            let angles = add_angles(container, source)?;
            add_linear_flows(container, source, ExpressionKind::ActivePowerBalance, &angles)?;
            let magnitudes = add_magnitudes(container, source)?;
            add_linear_flows(
                container,
                source,
                ExpressionKind::ReactivePowerBalance,
                &magnitudes,
            )?;
        }
    }

    close_balance(container, ExpressionKind::ActivePowerBalance)?;
    if network.supports_reactive_power() {
        close_balance(container, ExpressionKind::ReactivePowerBalance)?;
    }
    info!(%network, buses = source.buses().len(), "constructed network");
    Ok(())
}

fn add_angles(
    container: &mut ProblemContainer,
    source: &dyn DataSource,
) -> BuildResult<ContainerArray<VariableId>> {
    let references: HashSet<BusId> = islands(source.buses(), source.lines())
        .iter()
        .filter_map(|island| reference_bus(source.buses(), island))
        .collect();
    let reference_names: HashSet<&str> = source
        .buses()
        .iter()
        .filter(|b| references.contains(&b.id))
        .map(|b| b.name.as_str())
        .collect();
    let axis = source.buses().iter().map(|b| b.name.clone()).collect();
    let angles = container.add_variables(angle_key(), axis, |name, _| {
        if reference_names.contains(name) {
            (Some(0.0), Some(0.0))
        } else {
            (None, None)
        }
    })?;
    Ok(angles.clone())
}

fn add_magnitudes(
    container: &mut ProblemContainer,
    source: &dyn DataSource,
) -> BuildResult<ContainerArray<VariableId>> {
    let axis = source.buses().iter().map(|b| b.name.clone()).collect();
    let magnitudes = container.add_variables(magnitude_key(), axis, |name, _| {
        source
            .buses()
            .iter()
            .find(|b| b.name == name)
            .map(|b| (Some(b.voltage_limits.0.value()), Some(b.voltage_limits.1.value())))
            .unwrap_or((None, None))
    })?;
    Ok(magnitudes.clone())
}

/// Subtract `base * b * (x_i - x_j)` from both ends' balance for every
/// in-service line.
fn add_linear_flows(
    container: &mut ProblemContainer,
    source: &dyn DataSource,
    balance: ExpressionKind,
    state: &ContainerArray<VariableId>,
) -> BuildResult<()> {
    let key = container.balance_key(balance);
    let base = source.base_power();
    for line in source.lines().iter().filter(|l| l.available) {
        let from = container.bus_name(line.from_bus)?.to_string();
        let to = container.bus_name(line.to_bus)?.to_string();
        let b = base * line.susceptance();
        for t in container.time_steps() {
            let (Some(x_from), Some(x_to)) = (state.get(&from, t), state.get(&to, t)) else {
                continue;
            };
            let (x_from, x_to) = (*x_from, *x_to);
            let cell = container.expression_cell_mut(&key, &from, t)?;
            cell.add_variable(x_from, -b);
            cell.add_variable(x_to, b);
            let cell = container.expression_cell_mut(&key, &to, t)?;
            cell.add_variable(x_to, -b);
            cell.add_variable(x_from, b);
        }
    }
    Ok(())
}

/// `balance[row, t] == 0` for every cell of the balance expression.
fn close_balance(container: &mut ProblemContainer, balance: ExpressionKind) -> BuildResult<()> {
    let key = container.balance_key(balance);
    let cells = container.expression_mut(&key)?;
    let axis = cells.axis().to_vec();
    let rows: Vec<ConstraintRow> = cells
        .values()
        .iter()
        .map(|e| (e.clone(), Sense::Equal, 0.0))
        .collect();
    let kind = match balance {
        ExpressionKind::ReactivePowerBalance => ConstraintKind::ReactivePowerBalance,
        _ => ConstraintKind::ActivePowerBalance,
    };
    container.add_constraints(ConstraintKey::new(kind, key.entity), axis, rows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ProblemSettings;
    use pcm_core::{Bus, BusType, ForecastWindow, Line, System};

    fn system() -> System {
        let mut sys = System::new(100.0).with_forecast_window(ForecastWindow {
            horizon: 1,
            ..ForecastWindow::default()
        });
        sys.add_bus(Bus::new(BusId::new(1), "b1")).unwrap();
        sys.add_bus(Bus::new(BusId::new(2), "b2").with_type(BusType::Ref))
            .unwrap();
        sys.add_bus(Bus::new(BusId::new(3), "b3")).unwrap();
        sys.add_line(Line::new("l12", BusId::new(1), BusId::new(2), 0.5))
            .unwrap();
        sys
    }

    #[test]
    fn test_copper_plate_closes_one_system_balance() {
        let sys = system();
        let mut c =
            ProblemContainer::new(&ProblemSettings::default(), NetworkFormulation::CopperPlate, &sys)
                .unwrap();
        construct_network(&mut c, &sys).unwrap();
        let key = ConstraintKey::new(ConstraintKind::ActivePowerBalance, EntityKind::System);
        assert_eq!(c.constraints(&key).unwrap().shape(), (1, 1));
        assert!(!c.has_variables(&angle_key()));
    }

    #[test]
    fn test_dc_balance_carries_linearized_flows() {
        let sys = system();
        let mut c =
            ProblemContainer::new(&ProblemSettings::default(), NetworkFormulation::DcPower, &sys)
                .unwrap();
        construct_network(&mut c, &sys).unwrap();

        let angles = c.variables(&angle_key()).unwrap().clone();
        let theta1 = *angles.get("b1", 1).unwrap();
        let theta2 = *angles.get("b2", 1).unwrap();
        let theta3 = *angles.get("b3", 1).unwrap();
        // b2 is the declared reference; b3 is its own island
        assert_eq!(c.variable_decl(theta2).upper, Some(0.0));
        assert_eq!(c.variable_decl(theta3).lower, Some(0.0));
        assert_eq!(c.variable_decl(theta1).lower, None);

        let key = ConstraintKey::new(ConstraintKind::ActivePowerBalance, EntityKind::Bus);
        let rows = c.constraints(&key).unwrap();
        let b1 = c.resolved_constraint(*rows.get("b1", 1).unwrap());
        assert_eq!(b1.coefficient(theta1), -200.0);
        assert_eq!(b1.coefficient(theta2), 200.0);
        assert_eq!(b1.sense, Sense::Equal);
    }

    #[test]
    fn test_decoupled_ac_adds_magnitudes_and_reactive_balance() {
        let sys = system();
        let mut c = ProblemContainer::new(
            &ProblemSettings::default(),
            NetworkFormulation::DecoupledAcPower,
            &sys,
        )
        .unwrap();
        construct_network(&mut c, &sys).unwrap();
        let vm = c.variables(&magnitude_key()).unwrap();
        let decl = c.variable_decl(*vm.get("b1", 1).unwrap());
        assert_eq!((decl.lower, decl.upper), (Some(0.9), Some(1.1)));
        let key = ConstraintKey::new(ConstraintKind::ReactivePowerBalance, EntityKind::Bus);
        assert_eq!(c.constraints(&key).unwrap().shape(), (3, 1));
    }
}
