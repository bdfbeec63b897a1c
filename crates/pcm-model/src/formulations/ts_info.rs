//! Per-device time-series snapshots and the literal/parameter branch point.
//!
//! Every builder that scales a forecast goes through [`time_series_terms`].
//! It is the only place that looks at `use_parameters`, so the literal and
//! parameterized paths cannot drift apart.

use pcm_core::{BusId, DataSource, Device};

use crate::container::{AffineExpr, ProblemContainer, UpdateRef};
use crate::error::{BuildError, BuildResult};

/// Device scalar that a normalized forecast is multiplied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PeakValue {
    MaxActivePower,
    MaxReactivePower,
    /// Current reactive set-point
    ReactivePower,
}

impl PeakValue {
    pub fn of(&self, device: &Device) -> f64 {
        match self {
            PeakValue::MaxActivePower => device.max_active_power().value(),
            PeakValue::MaxReactivePower => device.max_reactive_power().value(),
            PeakValue::ReactivePower => device.reactive_power().value(),
        }
    }
}

/// Snapshot of one entity's scaled forecast for a build pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTimeSeriesConstraintInfo {
    pub name: String,
    /// `None` for services
    pub bus: Option<BusId>,
    /// Active power limit of the owner
    pub limit: f64,
    pub multiplier: f64,
    /// One value per time step
    pub series: Vec<f64>,
}

impl DeviceTimeSeriesConstraintInfo {
    /// Snapshot for `device`, scaled by `peak`.
    pub fn for_device(
        container: &ProblemContainer,
        source: &dyn DataSource,
        device: &Device,
        label: &str,
        peak: PeakValue,
    ) -> BuildResult<Self> {
        let series = if container.settings().use_forecast_data {
            forecast_window(container, source, device.name(), label)?
        } else {
            operating_point_series(device, container.horizon())
        };
        Ok(Self {
            name: device.name().to_string(),
            bus: Some(device.bus()),
            limit: device.max_active_power().value(),
            multiplier: peak.of(device),
            series,
        })
    }

    /// `multiplier * series[t]` (1-based `t`).
    pub fn scaled(&self, t: usize) -> f64 {
        self.multiplier * self.series[t - 1]
    }
}

/// `horizon` values of `owner`'s `label` series starting at the container's first step.
pub fn forecast_window(
    container: &ProblemContainer,
    source: &dyn DataSource,
    owner: &str,
    label: &str,
) -> BuildResult<Vec<f64>> {
    let series = source
        .time_series(owner, label)
        .ok_or_else(|| BuildError::MissingTimeSeries {
            owner: owner.to_string(),
            label: label.to_string(),
        })?;
    Ok(series
        .window(container.initial_time(), container.horizon())?
        .to_vec())
}

/// Current active set-point normalized by the device's peak, held flat.
pub fn operating_point_series(device: &Device, horizon: usize) -> Vec<f64> {
    let peak = device.max_active_power().value();
    let value = if peak.abs() > f64::EPSILON {
        device.active_power().value() / peak
    } else {
        0.0
    };
    vec![value; horizon]
}

/// Per-entity, per-step terms `sign * multiplier * series[t]`.
///
/// With parameters enabled each term is a parameter (registered under
/// `update` and bound to the series) with coefficient `sign * multiplier`;
/// otherwise it is that product folded into a constant. The result is indexed
/// `[entity][t - 1]` in the order of `infos`.
pub fn time_series_terms(
    container: &mut ProblemContainer,
    update: &UpdateRef,
    infos: &[DeviceTimeSeriesConstraintInfo],
    sign: f64,
) -> BuildResult<Vec<Vec<AffineExpr>>> {
    if !container.settings().use_parameters {
        return Ok(infos
            .iter()
            .map(|info| {
                let coeff = sign * info.multiplier;
                info.series
                    .iter()
                    .map(|v| {
                        let mut expr = AffineExpr::new();
                        expr.add_constant(coeff * v);
                        expr
                    })
                    .collect()
            })
            .collect());
    }

    let horizon = container.horizon();
    let axis = infos.iter().map(|i| i.name.clone()).collect();
    let params = container.parameters_mut();
    params.register(update.clone(), axis, horizon)?;

    let mut terms = Vec::with_capacity(infos.len());
    for info in infos {
        let ids = params.bind(update, &info.name, &info.series, info.multiplier)?;
        let coeff = sign * info.multiplier;
        terms.push(
            ids.into_iter()
                .map(|id| {
                    let mut expr = AffineExpr::new();
                    expr.add_parameter(id, coeff);
                    expr
                })
                .collect(),
        );
    }
    Ok(terms)
}
