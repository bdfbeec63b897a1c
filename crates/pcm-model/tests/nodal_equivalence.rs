//! Parameterized and literal builds must describe the same program.

mod common;

use common::*;
use pcm_model::*;

fn build(network: NetworkFormulation, use_parameters: bool, fixed_renewables: bool) -> ProblemContainer {
    let sys = three_bus_system();
    let mut template = ProblemTemplate::economic_dispatch(network);
    if fixed_renewables {
        template
            .set_device_model(
                "Renewable",
                DeviceModel::new(
                    pcm_core::DeviceKind::RenewableDispatch,
                    DeviceFormulation::FixedOutput,
                ),
            )
            .unwrap();
    }
    let registry = BuilderRegistry::with_defaults();
    let settings = ProblemSettings::default().with_parameters(use_parameters);
    ConstructionPipeline::new(&template, &registry, &sys)
        .build(&settings)
        .unwrap()
}

#[test]
fn test_parameterized_matches_literal_for_every_network() {
    for network in [
        NetworkFormulation::CopperPlate,
        NetworkFormulation::DcPower,
        NetworkFormulation::DecoupledAcPower,
    ] {
        for fixed in [false, true] {
            let literal = build(network, false, fixed);
            let param = build(network, true, fixed);
            assert!(literal.parameters().is_empty());
            assert!(!param.parameters().is_empty());
            assert_programs_match(&literal.linear_program(), &param.linear_program());
            assert_eq!(literal.structure().variables, param.structure().variables);
            assert_eq!(literal.structure().constraints, param.structure().constraints);
        }
    }
}

#[test]
fn test_loads_on_one_bus_accumulate_in_balance() {
    let c = build(NetworkFormulation::DcPower, true, true);
    let key = ConstraintKey::new(ConstraintKind::ActivePowerBalance, EntityKind::Bus);
    let rows = c.constraints(&key).unwrap();

    // bus2 at t=3: -(40 * 1.0) - (10 * 0.8)
    let bus2 = c.resolved_constraint(*rows.get("bus2", 3).unwrap());
    assert!((bus2.rhs - 48.0).abs() < 1e-9);

    // bus3 at t=1: -(30 * 0.6) + 25 * 0.3 from the fixed wind output
    let bus3 = c.resolved_constraint(*rows.get("bus3", 1).unwrap());
    assert!((bus3.rhs - 10.5).abs() < 1e-9);
}

#[test]
fn test_reactive_balance_only_under_decoupled_ac() {
    let reactive = ConstraintKey::new(ConstraintKind::ReactivePowerBalance, EntityKind::Bus);
    assert!(!build(NetworkFormulation::DcPower, false, false).has_constraints(&reactive));

    let c = build(NetworkFormulation::DecoupledAcPower, false, false);
    let rows = c.constraints(&reactive).unwrap();
    // 8 MVAr * 0.5 + 2 MVAr * 1.0, scaled by the active power profile
    let bus2 = c.resolved_constraint(*rows.get("bus2", 1).unwrap());
    assert!((bus2.rhs - 6.0).abs() < 1e-9);
}
