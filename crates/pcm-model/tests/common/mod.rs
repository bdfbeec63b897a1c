//! Shared fixtures for the pcm-model integration tests.

#![allow(dead_code)]

use chrono::TimeDelta;
use pcm_core::*;
use pcm_model::formulations::nodal::MAX_ACTIVE_POWER_LABEL;
use pcm_model::formulations::services::REQUIREMENT_LABEL;
use pcm_model::*;

pub fn window(horizon: usize) -> ForecastWindow {
    ForecastWindow {
        horizon,
        ..ForecastWindow::default()
    }
}

pub fn series(window: &ForecastWindow, values: Vec<f64>) -> TimeSeries {
    TimeSeries::new(window.initial_time, TimeDelta::hours(1), values)
}

/// Two 8 MW thermal units on one bus, a 4 MW load and a 10 MW up reserve
/// both units can carry.
pub fn reserve_system(horizon: usize) -> System {
    let window = window(horizon);
    let mut sys = System::new(100.0).with_forecast_window(window);
    sys.add_bus(Bus::new(BusId::new(1), "bus1").with_type(BusType::Ref))
        .unwrap();
    for (name, cost) in [("gen1", 10.0), ("gen2", 20.0)] {
        sys.add_device(Device::Thermal(
            ThermalStandard::new(name, BusId::new(1))
                .with_active_power_limits(0.0, 8.0)
                .with_variable_cost(cost),
        ))
        .unwrap();
    }
    sys.add_device(Device::Load(PowerLoad::new("load1", BusId::new(1), 4.0)))
        .unwrap();
    sys.add_time_series("load1", MAX_ACTIVE_POWER_LABEL, series(&window, vec![1.0; horizon]))
        .unwrap();
    sys.add_service(Service::Reserve(
        ReserveService::new("spin", ReserveDirection::Up, 10.0)
            .with_contributors(["gen1", "gen2"])
            .with_offer_cost(1.0),
    ))
    .unwrap();
    sys.add_time_series("spin", REQUIREMENT_LABEL, series(&window, vec![1.0; horizon]))
        .unwrap();
    sys
}

pub fn reserve_template(network: NetworkFormulation) -> ProblemTemplate {
    let mut template = ProblemTemplate::economic_dispatch(network);
    template
        .add_service_model(
            "Spin",
            ServiceModel::new(ServiceKind::ReserveUp, ServiceFormulation::RangeReserve),
        )
        .unwrap();
    template
}

/// Two 40 MW thermal units serving a 30 MW load, with a 10 MW down reserve.
pub fn down_reserve_system(horizon: usize) -> System {
    let window = window(horizon);
    let mut sys = System::new(100.0).with_forecast_window(window);
    sys.add_bus(Bus::new(BusId::new(1), "bus1").with_type(BusType::Ref))
        .unwrap();
    for (name, cost) in [("gen1", 10.0), ("gen2", 20.0)] {
        sys.add_device(Device::Thermal(
            ThermalStandard::new(name, BusId::new(1))
                .with_active_power_limits(0.0, 40.0)
                .with_variable_cost(cost),
        ))
        .unwrap();
    }
    sys.add_device(Device::Load(PowerLoad::new("load1", BusId::new(1), 30.0)))
        .unwrap();
    sys.add_time_series("load1", MAX_ACTIVE_POWER_LABEL, series(&window, vec![1.0; horizon]))
        .unwrap();
    sys.add_service(Service::Reserve(
        ReserveService::new("regdown", ReserveDirection::Down, 10.0)
            .with_contributors(["gen1", "gen2"])
            .with_offer_cost(1.0),
    ))
    .unwrap();
    sys.add_time_series("regdown", REQUIREMENT_LABEL, series(&window, vec![1.0; horizon]))
        .unwrap();
    sys
}

pub fn down_reserve_template() -> ProblemTemplate {
    let mut template = ProblemTemplate::economic_dispatch(NetworkFormulation::CopperPlate);
    template
        .add_service_model(
            "RegDown",
            ServiceModel::new(ServiceKind::ReserveDown, ServiceFormulation::RangeReserve),
        )
        .unwrap();
    template
}

/// A 50 MW wind plant at `forecast` of nameplate next to a 100 MW thermal
/// unit, a 5 MW load and an up reserve carried by `contributors`.
pub fn wind_reserve_system(forecast: f64, requirement: f64, contributors: &[&str]) -> System {
    let window = window(2);
    let mut sys = System::new(100.0).with_forecast_window(window);
    sys.add_bus(Bus::new(BusId::new(1), "bus1").with_type(BusType::Ref))
        .unwrap();
    sys.add_device(Device::Thermal(
        ThermalStandard::new("gen1", BusId::new(1))
            .with_active_power_limits(0.0, 100.0)
            .with_variable_cost(30.0),
    ))
    .unwrap();
    sys.add_device(Device::Renewable(RenewableDispatch::new("wind", BusId::new(1), 50.0)))
        .unwrap();
    sys.add_time_series("wind", MAX_ACTIVE_POWER_LABEL, series(&window, vec![forecast; 2]))
        .unwrap();
    sys.add_device(Device::Load(PowerLoad::new("load1", BusId::new(1), 5.0)))
        .unwrap();
    sys.add_time_series("load1", MAX_ACTIVE_POWER_LABEL, series(&window, vec![1.0; 2]))
        .unwrap();
    sys.add_service(Service::Reserve(
        ReserveService::new("spin", ReserveDirection::Up, requirement)
            .with_contributors(contributors.iter().copied())
            .with_offer_cost(1.0),
    ))
    .unwrap();
    sys.add_time_series("spin", REQUIREMENT_LABEL, series(&window, vec![1.0; 2]))
        .unwrap();
    sys
}

pub fn wind_reserve_template(wind: DeviceFormulation) -> ProblemTemplate {
    let mut template = ProblemTemplate::new(NetworkFormulation::CopperPlate);
    template
        .add_device_model(
            "Thermal",
            DeviceModel::new(DeviceKind::ThermalStandard, DeviceFormulation::ThermalDispatch),
        )
        .unwrap();
    template
        .add_device_model("Wind", DeviceModel::new(DeviceKind::RenewableDispatch, wind))
        .unwrap();
    template
        .add_device_model(
            "Load",
            DeviceModel::new(DeviceKind::PowerLoad, DeviceFormulation::StaticPowerLoad),
        )
        .unwrap();
    template
        .add_service_model(
            "Spin",
            ServiceModel::new(ServiceKind::ReserveUp, ServiceFormulation::RangeReserve),
        )
        .unwrap();
    template
}

/// Three buses in a line with loads and renewables on every bus.
pub fn three_bus_system() -> System {
    let window = window(3);
    let mut sys = System::new(100.0).with_forecast_window(window);
    sys.add_bus(Bus::new(BusId::new(1), "bus1").with_type(BusType::Ref))
        .unwrap();
    sys.add_bus(Bus::new(BusId::new(2), "bus2")).unwrap();
    sys.add_bus(Bus::new(BusId::new(3), "bus3")).unwrap();
    sys.add_line(Line::new("line1_2", BusId::new(1), BusId::new(2), 0.1).with_rating(60.0))
        .unwrap();
    sys.add_line(Line::new("line2_3", BusId::new(2), BusId::new(3), 0.2).with_rating(60.0))
        .unwrap();
    sys.add_device(Device::Thermal(
        ThermalStandard::new("gen1", BusId::new(1))
            .with_active_power_limits(0.0, 200.0)
            .with_variable_cost(15.0),
    ))
    .unwrap();
    for (name, bus, peak, profile) in [
        ("load2a", 2, 40.0, vec![0.5, 0.75, 1.0]),
        ("load2b", 2, 10.0, vec![1.0, 0.9, 0.8]),
        ("load3", 3, 30.0, vec![0.6, 0.6, 0.7]),
    ] {
        sys.add_device(Device::Load(
            PowerLoad::new(name, BusId::new(bus), peak).with_max_reactive_power(peak * 0.2),
        ))
        .unwrap();
        sys.add_time_series(name, MAX_ACTIVE_POWER_LABEL, series(&window, profile))
            .unwrap();
    }
    sys.add_device(Device::Renewable(RenewableDispatch::new("wind3", BusId::new(3), 25.0)))
        .unwrap();
    sys.add_time_series(
        "wind3",
        MAX_ACTIVE_POWER_LABEL,
        series(&window, vec![0.3, 0.1, 0.9]),
    )
    .unwrap();
    sys
}

/// Backend double that answers with a fixed status and numbered duals.
pub struct MockBackend {
    pub status: TerminationStatus,
    pub report_duals: bool,
}

impl MockBackend {
    pub fn optimal() -> Self {
        Self {
            status: TerminationStatus::Optimal,
            report_duals: true,
        }
    }

    pub fn failing(status: TerminationStatus) -> Self {
        Self {
            status,
            report_duals: false,
        }
    }
}

impl MathBackend for MockBackend {
    fn id(&self) -> &str {
        "mock"
    }

    fn optimize(
        &self,
        program: &LinearProgram,
        _options: &BackendOptions,
    ) -> BuildResult<BackendSolution> {
        if !self.status.is_feasible_point() {
            return Ok(BackendSolution::failed(self.status));
        }
        let primal = vec![0.0; program.variables.len()];
        Ok(BackendSolution {
            termination: self.status,
            primal_status: PrimalStatus::FeasiblePoint,
            dual_status: if self.report_duals {
                DualStatus::FeasiblePoint
            } else {
                DualStatus::NotReported
            },
            objective_value: program.objective.evaluate(&primal),
            primal,
            duals: self
                .report_duals
                .then(|| (0..program.constraints.len()).map(|i| i as f64).collect()),
            solve_time: Some(std::time::Duration::from_millis(5)),
        })
    }
}

/// Compare two resolved programs term by term.
pub fn assert_programs_match(a: &LinearProgram, b: &LinearProgram) {
    assert_eq!(a.variables, b.variables);
    assert_eq!(a.constraints.len(), b.constraints.len());
    for (x, y) in a.constraints.iter().zip(&b.constraints) {
        assert_eq!(x.name, y.name);
        assert_eq!(x.sense, y.sense, "{}", x.name);
        assert_eq!(x.terms, y.terms, "{}", x.name);
        assert!(
            (x.rhs - y.rhs).abs() < 1e-9,
            "{}: {} vs {}",
            x.name,
            x.rhs,
            y.rhs
        );
    }
    assert_eq!(a.objective, b.objective);
}
