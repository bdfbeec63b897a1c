//! Branch flows.

use pcm_core::Line;
use tracing::{debug, info};

use super::network::{angle_key, magnitude_key};
use crate::container::{
    AffineExpr, ConstraintKey, ConstraintKind, ConstraintRow, ContainerArray, EntityKind,
    ProblemContainer, Sense, VariableId, VariableKey, VariableKind,
};
use crate::error::BuildResult;
use crate::registry::BranchContext;
use crate::template::BranchFormulation;

/// Flow variables defined from bus angles (and magnitudes under
/// `DecoupledAcPower`): `f - base * b * (x_from - x_to) = 0`.
///
/// `StaticBranch` bounds flows by the line rating; `StaticBranchUnbounded`
/// leaves them free.
pub fn construct_static_branch(
    container: &mut ProblemContainer,
    ctx: &BranchContext<'_>,
) -> BuildResult<()> {
    let lines: Vec<&Line> = ctx.source.lines().iter().filter(|l| l.available).collect();
    if lines.is_empty() {
        return Ok(());
    }
    let bounded = ctx.model.formulation == BranchFormulation::StaticBranch;
    let entity = EntityKind::Branch(ctx.model.kind);
    let base = ctx.source.base_power();

    let angles = container.variables(&angle_key())?.clone();
    add_flows(
        container,
        &lines,
        bounded,
        base,
        VariableKey::new(VariableKind::FlowActivePower, entity),
        ConstraintKey::new(ConstraintKind::FlowActivePowerDefinition, entity),
        &angles,
    )?;

    if container.network().supports_reactive_power() {
        let magnitudes = container.variables(&magnitude_key())?.clone();
        add_flows(
            container,
            &lines,
            bounded,
            base,
            VariableKey::new(VariableKind::FlowReactivePower, entity),
            ConstraintKey::new(ConstraintKind::FlowReactivePowerDefinition, entity),
            &magnitudes,
        )?;
    }
    info!(model = ctx.name, lines = lines.len(), bounded, "constructed branch flows");
    Ok(())
}

/// Branches carry nothing without bus state variables.
pub fn skip_without_network(
    _container: &mut ProblemContainer,
    ctx: &BranchContext<'_>,
) -> BuildResult<()> {
    debug!(model = ctx.name, "branches are not modeled under CopperPlate");
    Ok(())
}

fn add_flows(
    container: &mut ProblemContainer,
    lines: &[&Line],
    bounded: bool,
    base: f64,
    var_key: VariableKey,
    con_key: ConstraintKey,
    state: &ContainerArray<VariableId>,
) -> BuildResult<()> {
    let axis: Vec<String> = lines.iter().map(|l| l.name.clone()).collect();
    let flows = container
        .add_variables(var_key, axis.clone(), |name, _| {
            let rating = lines
                .iter()
                .find(|l| l.name == name)
                .and_then(|l| l.rating)
                .filter(|_| bounded);
            match rating {
                Some(r) => (Some(-r.value()), Some(r.value())),
                None => (None, None),
            }
        })?
        .clone();

    let mut rows: Vec<ConstraintRow> = Vec::with_capacity(flows.values().len());
    for line in lines {
        let from = container.bus_name(line.from_bus)?;
        let to = container.bus_name(line.to_bus)?;
        let b = base * line.susceptance();
        for t in container.time_steps() {
            let mut expr = AffineExpr::new();
            if let Some(f) = flows.get(&line.name, t) {
                expr.add_variable(*f, 1.0);
            }
            if let (Some(x_from), Some(x_to)) = (state.get(from, t), state.get(to, t)) {
                expr.add_variable(*x_from, -b);
                expr.add_variable(*x_to, b);
            }
            rows.push((expr, Sense::Equal, 0.0));
        }
    }
    container.add_constraints(con_key, axis, rows)?;
    Ok(())
}
