//! Static loads.

use tracing::info;

use super::nodal::add_nodal_expressions;
use crate::container::ProblemContainer;
use crate::error::BuildResult;
use crate::registry::DeviceContext;

/// Withdraw `max_active_power * forecast[t]` at the load's bus.
pub fn construct_static_load(
    container: &mut ProblemContainer,
    ctx: &DeviceContext<'_>,
) -> BuildResult<()> {
    add_nodal_expressions(container, ctx.source, ctx.model.kind)?;
    info!(model = ctx.name, kind = %ctx.model.kind, "constructed static loads");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{EntityKind, ExpressionKind, ParameterKind, UpdateRef};
    use crate::formulations::nodal::MAX_ACTIVE_POWER_LABEL;
    use crate::settings::ProblemSettings;
    use crate::template::{DeviceFormulation, DeviceModel, NetworkFormulation};
    use chrono::TimeDelta;
    use pcm_core::{Bus, BusId, Device, DeviceKind, ForecastWindow, PowerLoad, System, TimeSeries};

    fn system() -> System {
        let window = ForecastWindow {
            horizon: 2,
            ..ForecastWindow::default()
        };
        let mut sys = System::new(100.0).with_forecast_window(window);
        sys.add_bus(Bus::new(BusId::new(1), "b1")).unwrap();
        sys.add_bus(Bus::new(BusId::new(2), "b2")).unwrap();
        for (name, bus) in [("l1", 1), ("l2", 1), ("l3", 2)] {
            sys.add_device(Device::Load(
                PowerLoad::new(name, BusId::new(bus), 10.0).with_max_reactive_power(2.0),
            ))
            .unwrap();
            sys.add_time_series(
                name,
                MAX_ACTIVE_POWER_LABEL,
                TimeSeries::new(window.initial_time, TimeDelta::hours(1), vec![0.5, 1.0]),
            )
            .unwrap();
        }
        sys
    }

    fn build(settings: ProblemSettings, network: NetworkFormulation) -> ProblemContainer {
        let sys = system();
        let mut c = ProblemContainer::new(&settings, network, &sys).unwrap();
        let model = DeviceModel::new(DeviceKind::PowerLoad, DeviceFormulation::StaticPowerLoad);
        let ctx = DeviceContext {
            name: "Load",
            model: &model,
            source: &sys,
        };
        construct_static_load(&mut c, &ctx).unwrap();
        c
    }

    #[test]
    fn test_loads_sharing_a_bus_accumulate() {
        let c = build(ProblemSettings::default(), NetworkFormulation::DcPower);
        let balance = c
            .expression(&c.balance_key(ExpressionKind::ActivePowerBalance))
            .unwrap();
        assert_eq!(balance.get("b1", 1).unwrap().constant(), -10.0);
        assert_eq!(balance.get("b1", 2).unwrap().constant(), -20.0);
        assert_eq!(balance.get("b2", 2).unwrap().constant(), -10.0);
    }

    #[test]
    fn test_reactive_pass_only_under_decoupled_ac() {
        let dc = build(
            ProblemSettings::default().with_parameters(true),
            NetworkFormulation::DcPower,
        );
        assert_eq!(dc.parameters().len(), 1);

        let ac = build(
            ProblemSettings::default().with_parameters(true),
            NetworkFormulation::DecoupledAcPower,
        );
        assert_eq!(ac.parameters().len(), 2);
        let q_ref = UpdateRef::new(
            EntityKind::Device(DeviceKind::PowerLoad),
            ParameterKind::ReactivePowerTimeSeries,
            MAX_ACTIVE_POWER_LABEL,
        );
        let q = ac.parameters().get(&q_ref).unwrap();
        assert_eq!(*q.multipliers().get("l3", 1).unwrap(), 2.0);

        let reactive = ac
            .expression(&ac.balance_key(ExpressionKind::ReactivePowerBalance))
            .unwrap();
        let resolved = reactive.get("b1", 2).unwrap().resolve(ac.parameters().values());
        assert_eq!(resolved.constant(), -4.0);
    }
}
