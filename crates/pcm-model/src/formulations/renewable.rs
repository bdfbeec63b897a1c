//! Renewable plants: curtailable dispatch or fixed forecast output.

use tracing::{debug, info};

use super::nodal::{add_nodal_expressions, MAX_ACTIVE_POWER_LABEL};
use super::ts_info::{time_series_terms, DeviceTimeSeriesConstraintInfo, PeakValue};
use super::{add_active_power, add_range_constraints, add_reactive_power, add_variable_cost};
use crate::container::{
    AffineExpr, ConstraintKey, ConstraintKind, ConstraintRow, EntityKind, ExpressionKey,
    ExpressionKind, ParameterKind, ProblemContainer, Sense, UpdateRef,
};
use crate::error::BuildResult;
use crate::registry::DeviceContext;

/// Dispatchable output capped by `rating * forecast[t]`.
pub fn construct_full_dispatch(
    container: &mut ProblemContainer,
    ctx: &DeviceContext<'_>,
) -> BuildResult<()> {
    let kind = ctx.model.kind;
    let devices = ctx.source.devices(kind);
    if devices.is_empty() {
        debug!(model = ctx.name, %kind, "no available devices");
        return Ok(());
    }

    let p = add_active_power(container, kind, &devices)?;
    add_range_constraints(container, kind, &devices, &p)?;

    let infos = devices
        .iter()
        .map(|d| {
            DeviceTimeSeriesConstraintInfo::for_device(
                container,
                ctx.source,
                d,
                MAX_ACTIVE_POWER_LABEL,
                PeakValue::MaxActivePower,
            )
        })
        .collect::<BuildResult<Vec<_>>>()?;
    let update = UpdateRef::new(
        EntityKind::Device(kind),
        ParameterKind::ActivePowerTimeSeries,
        MAX_ACTIVE_POWER_LABEL,
    );
    let limits = time_series_terms(container, &update, &infos, 1.0)?;

    // Up reserves are held against the forecast, not the nameplate.
    let up = container.expression(&ExpressionKey::new(
        ExpressionKind::ActivePowerRangeUb,
        EntityKind::Device(kind),
    ));
    let mut rows: Vec<ConstraintRow> = Vec::with_capacity(p.values().len());
    for (info, per_step) in infos.iter().zip(&limits) {
        let vars = p.row(&info.name).unwrap_or_default();
        for ((t, var), limit) in (1..).zip(vars).zip(per_step) {
            let mut expr = AffineExpr::from_variable(*var, 1.0);
            if let Some(cell) = up.and_then(|e| e.get(&info.name, t)) {
                expr.add_scaled(cell, 1.0);
            }
            expr.add_scaled(limit, -1.0);
            rows.push((expr, Sense::LessEqual, 0.0));
        }
    }
    container.add_constraints(
        ConstraintKey::new(ConstraintKind::ActivePowerTimeSeriesLimit, EntityKind::Device(kind)),
        infos.iter().map(|i| i.name.clone()).collect(),
        rows,
    )?;

    add_reactive_power(container, kind, &devices)?;
    add_variable_cost(container, &devices, &p);

    info!(model = ctx.name, %kind, devices = devices.len(), "constructed renewable dispatch");
    Ok(())
}

/// Output equals the forecast and enters the balance as an injection.
pub fn construct_fixed_output(
    container: &mut ProblemContainer,
    ctx: &DeviceContext<'_>,
) -> BuildResult<()> {
    add_nodal_expressions(container, ctx.source, ctx.model.kind)?;
    info!(model = ctx.name, kind = %ctx.model.kind, "constructed fixed renewable output");
    Ok(())
}
