//! Nodal balance contributions of devices that follow a forecast.
//!
//! Fixed injections and withdrawals enter the balance expressions as
//! constants (or parameters) rather than variables. Which forecast, which
//! parameter kind, which scalar and which sign is resolved per
//! (device kind, balance, network) by [`nodal_expression_inputs`].

use pcm_core::{DataSource, DeviceKind};
use tracing::debug;

use super::ts_info::{time_series_terms, DeviceTimeSeriesConstraintInfo, PeakValue};
use crate::container::{EntityKind, ExpressionKind, ParameterKind, ProblemContainer, UpdateRef};
use crate::error::{BuildError, BuildResult};
use crate::template::NetworkFormulation;

/// Label of the normalized active power forecast on devices.
pub const MAX_ACTIVE_POWER_LABEL: &str = "max_active_power";

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct NodalExpressionInputs {
    pub label: &'static str,
    pub parameter: ParameterKind,
    pub peak: PeakValue,
    /// +1 for injections, -1 for withdrawals
    pub multiplier: f64,
}

pub fn nodal_expression_inputs(
    kind: DeviceKind,
    balance: ExpressionKind,
    network: NetworkFormulation,
) -> BuildResult<NodalExpressionInputs> {
    use ExpressionKind::{ActivePowerBalance, ReactivePowerBalance};

    let reactive = network.supports_reactive_power();
    let inputs = match (kind, balance) {
        (DeviceKind::PowerLoad, ActivePowerBalance) => NodalExpressionInputs {
            label: MAX_ACTIVE_POWER_LABEL,
            parameter: ParameterKind::ActivePowerTimeSeries,
            peak: PeakValue::MaxActivePower,
            multiplier: -1.0,
        },
        (DeviceKind::PowerLoad, ReactivePowerBalance) if reactive => NodalExpressionInputs {
            label: MAX_ACTIVE_POWER_LABEL,
            parameter: ParameterKind::ReactivePowerTimeSeries,
            peak: PeakValue::MaxReactivePower,
            multiplier: -1.0,
        },
        (DeviceKind::RenewableDispatch, ActivePowerBalance) => NodalExpressionInputs {
            label: MAX_ACTIVE_POWER_LABEL,
            parameter: ParameterKind::ActivePowerTimeSeries,
            peak: PeakValue::MaxActivePower,
            multiplier: 1.0,
        },
        (DeviceKind::RenewableDispatch, ReactivePowerBalance) if reactive => {
            NodalExpressionInputs {
                label: MAX_ACTIVE_POWER_LABEL,
                parameter: ParameterKind::ReactivePowerTimeSeries,
                peak: PeakValue::ReactivePower,
                multiplier: 1.0,
            }
        }
        _ => {
            return Err(BuildError::UnimplementedFormulation {
                entity: kind.to_string(),
                formulation: format!("nodal {balance}"),
                network: network.to_string(),
            })
        }
    };
    Ok(inputs)
}

/// Add every available device of `kind` to the active balance and, under a
/// reactive-capable network, to the reactive balance.
pub fn add_nodal_expressions(
    container: &mut ProblemContainer,
    source: &dyn DataSource,
    kind: DeviceKind,
) -> BuildResult<()> {
    let devices = source.devices(kind);
    if devices.is_empty() {
        return Ok(());
    }
    let network = container.network();
    let mut balances = vec![ExpressionKind::ActivePowerBalance];
    if network.supports_reactive_power() {
        balances.push(ExpressionKind::ReactivePowerBalance);
    }

    for balance in balances {
        let inputs = nodal_expression_inputs(kind, balance, network)?;
        let infos = devices
            .iter()
            .map(|d| {
                DeviceTimeSeriesConstraintInfo::for_device(
                    container,
                    source,
                    d,
                    inputs.label,
                    inputs.peak,
                )
            })
            .collect::<BuildResult<Vec<_>>>()?;
        let update = UpdateRef::new(EntityKind::Device(kind), inputs.parameter, inputs.label);
        let terms = time_series_terms(container, &update, &infos, inputs.multiplier)?;

        let key = container.balance_key(balance);
        for (info, per_step) in infos.iter().zip(terms) {
            let bus = info.bus.ok_or_else(|| BuildError::MissingEntry {
                kind: "bus",
                name: info.name.clone(),
            })?;
            let row = container.balance_row(bus)?.to_string();
            for (t, term) in (1..).zip(per_step) {
                container
                    .expression_cell_mut(&key, &row, t)?
                    .add_scaled(&term, 1.0);
            }
        }
        debug!(
            device_kind = %kind,
            balance = %balance,
            devices = infos.len(),
            parameterized = container.settings().use_parameters,
            "added nodal expressions"
        );
    }
    Ok(())
}
