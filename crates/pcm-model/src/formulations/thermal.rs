//! Thermal unit dispatch.

use tracing::{debug, info};

use super::{add_active_power, add_range_constraints, add_reactive_power, add_variable_cost};
use crate::container::ProblemContainer;
use crate::error::BuildResult;
use crate::registry::DeviceContext;

/// Active power variable between `pmin` and `pmax` (net of reserves) with a
/// linear energy cost; reactive power within limits when the network carries it.
pub fn construct_thermal_dispatch(
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
    add_reactive_power(container, kind, &devices)?;
    add_variable_cost(container, &devices, &p);

    info!(model = ctx.name, %kind, devices = devices.len(), "constructed thermal dispatch");
    Ok(())
}
