//! Reserve requirements.
//!
//! Services are built before devices. Each reserve variable is written into
//! the contributing device's range expression (upper for up reserves, lower
//! for down reserves) so the device's range constraints pick it up when they
//! are built later.

use pcm_core::{DataSource, Device, ReserveDirection, ReserveService, Service};
use std::collections::HashMap;
use tracing::{info, warn};

use super::ts_info::{forecast_window, time_series_terms, DeviceTimeSeriesConstraintInfo};
use crate::container::{
    AffineExpr, ConstraintKey, ConstraintKind, ConstraintRow, EntityKind, ExpressionKey,
    ExpressionKind, ParameterKind, ProblemContainer, Sense, UpdateRef, VariableKey, VariableKind,
};
use crate::error::BuildResult;
use crate::registry::ServiceContext;
use crate::template::ProblemTemplate;

/// Label of the normalized requirement forecast on reserve services.
pub const REQUIREMENT_LABEL: &str = "requirement";

/// One reserve variable per contributor and step, bounded by the
/// contributor's capability, with `Σ r[d,t] >= requirement * forecast[t]`.
pub fn construct_range_reserve(
    container: &mut ProblemContainer,
    ctx: &ServiceContext<'_>,
) -> BuildResult<()> {
    let kind = ctx.model.kind;
    let reserves: Vec<&ReserveService> = ctx
        .source
        .services(kind)
        .into_iter()
        .map(|s| match s {
            Service::Reserve(r) => r,
        })
        .collect();
    if reserves.is_empty() {
        return Ok(());
    }
    let range = match kind.direction() {
        ReserveDirection::Up => ExpressionKind::ActivePowerRangeUb,
        ReserveDirection::Down => ExpressionKind::ActivePowerRangeLb,
    };

    let infos = reserves
        .iter()
        .map(|r| requirement_info(container, ctx.source, r))
        .collect::<BuildResult<Vec<_>>>()?;
    let update = UpdateRef::new(
        EntityKind::Service(kind),
        ParameterKind::RequirementTimeSeries,
        REQUIREMENT_LABEL,
    );
    let requirements = time_series_terms(container, &update, &infos, 1.0)?;

    for (reserve, requirement) in reserves.iter().zip(requirements) {
        let contributors = contributing_devices(ctx.template, ctx.source, reserve);
        if contributors.is_empty() {
            warn!(service = %reserve.name, "reserve has no contributing devices");
        }
        let names: Vec<String> = contributors.iter().map(|d| d.name().to_string()).collect();
        let capability: HashMap<&str, f64> = contributors
            .iter()
            .map(|d| (d.name(), d.max_active_power().value()))
            .collect();

        let entity = EntityKind::Service(kind);
        let vars = container
            .add_variables(
                VariableKey::with_meta(VariableKind::ActivePowerReserve, entity, &reserve.name),
                names.clone(),
                |name, _| (Some(0.0), capability.get(name).copied()),
            )?
            .clone();

        let rows: Vec<ConstraintRow> = (1..=container.horizon())
            .zip(&requirement)
            .map(|(t, req)| {
                let mut expr = AffineExpr::new();
                for name in &names {
                    if let Some(var) = vars.get(name, t) {
                        expr.add_variable(*var, 1.0);
                    }
                }
                expr.add_scaled(req, -1.0);
                (expr, Sense::GreaterEqual, 0.0)
            })
            .collect();
        container.add_constraints(
            ConstraintKey::with_meta(ConstraintKind::Requirement, entity, &reserve.name),
            vec![reserve.name.clone()],
            rows,
        )?;

        for device in &contributors {
            let device_kind = device.kind();
            let axis = ctx
                .source
                .devices(device_kind)
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            let cells = container.expression_or_insert(
                ExpressionKey::new(range, EntityKind::Device(device_kind)),
                axis,
            );
            for (name, t, var) in vars.iter().filter(|(n, _, _)| *n == device.name()) {
                if let Some(cell) = cells.get_mut(name, t) {
                    cell.add_variable(*var, 1.0);
                }
            }
        }

        for var in vars.values() {
            container.add_to_objective(*var, reserve.offer_cost);
        }
        info!(
            service = %reserve.name,
            %kind,
            contributors = names.len(),
            "constructed range reserve"
        );
    }
    Ok(())
}

fn requirement_info(
    container: &ProblemContainer,
    source: &dyn DataSource,
    reserve: &ReserveService,
) -> BuildResult<DeviceTimeSeriesConstraintInfo> {
    let series = if container.settings().use_forecast_data {
        forecast_window(container, source, &reserve.name, REQUIREMENT_LABEL)?
    } else {
        vec![1.0; container.horizon()]
    };
    Ok(DeviceTimeSeriesConstraintInfo {
        name: reserve.name.clone(),
        bus: None,
        limit: reserve.requirement,
        multiplier: reserve.requirement,
        series,
    })
}

/// Contributors that exist, are available, and whose kind is modeled with a
/// formulation that honors reserve terms.
fn contributing_devices<'a>(
    template: &ProblemTemplate,
    source: &'a dyn DataSource,
    reserve: &ReserveService,
) -> Vec<&'a Device> {
    let mut devices: Vec<&Device> = Vec::new();
    for name in &reserve.contributing_devices {
        let Some(device) = source.device(name) else {
            warn!(service = %reserve.name, device = %name, "contributing device not found");
            continue;
        };
        if !device.available() {
            warn!(service = %reserve.name, device = %name, "skipping unavailable contributor");
            continue;
        }
        let Some(model) = template.model_for_device(device.kind()) else {
            warn!(
                service = %reserve.name,
                device = %name,
                kind = %device.kind(),
                "skipping contributor whose device kind has no model"
            );
            continue;
        };
        if !model.formulation.provides_reserves() {
            warn!(
                service = %reserve.name,
                device = %name,
                formulation = %model.formulation,
                "skipping contributor whose formulation cannot hold reserves"
            );
            continue;
        }
        if devices.iter().any(|d| d.name() == device.name()) {
            continue;
        }
        devices.push(device);
    }
    devices
}
