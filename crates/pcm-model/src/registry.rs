//! Dispatch table from (entity kind, formulation, network) to builder.
//!
//! The pipeline never matches on formulations itself. It looks the template
//! entry up here and calls whatever builder was registered; a missing entry is
//! an [`BuildError::UnimplementedFormulation`].

use pcm_core::{BranchKind, DataSource, DeviceKind, ServiceKind};
use std::collections::HashMap;
use tracing::debug;

use crate::container::ProblemContainer;
use crate::error::{BuildError, BuildResult};
use crate::formulations::{branches, load, renewable, services, thermal};
use crate::template::{
    BranchFormulation, BranchModel, DeviceFormulation, DeviceModel, NetworkFormulation,
    ProblemTemplate, ServiceFormulation, ServiceModel,
};

/// What a device builder sees besides the container.
pub struct DeviceContext<'a> {
    /// Template entry name
    pub name: &'a str,
    pub model: &'a DeviceModel,
    pub source: &'a dyn DataSource,
}

pub struct BranchContext<'a> {
    pub name: &'a str,
    pub model: &'a BranchModel,
    pub source: &'a dyn DataSource,
}

/// Services also see the template so they can resolve contributing devices.
pub struct ServiceContext<'a> {
    pub name: &'a str,
    pub model: &'a ServiceModel,
    pub template: &'a ProblemTemplate,
    pub source: &'a dyn DataSource,
}

pub type DeviceBuilder = fn(&mut ProblemContainer, &DeviceContext<'_>) -> BuildResult<()>;
pub type BranchBuilder = fn(&mut ProblemContainer, &BranchContext<'_>) -> BuildResult<()>;
pub type ServiceBuilder = fn(&mut ProblemContainer, &ServiceContext<'_>) -> BuildResult<()>;

type DeviceTriple = (DeviceKind, DeviceFormulation, NetworkFormulation);
type BranchTriple = (BranchKind, BranchFormulation, NetworkFormulation);

const ALL_NETWORKS: [NetworkFormulation; 3] = [
    NetworkFormulation::CopperPlate,
    NetworkFormulation::DcPower,
    NetworkFormulation::DecoupledAcPower,
];

/// Holds all registered builders.
///
/// Create with `BuilderRegistry::new()` for empty or
/// `BuilderRegistry::with_defaults()` for the built-in formulations.
#[derive(Default, Clone)]
pub struct BuilderRegistry {
    devices: HashMap<DeviceTriple, DeviceBuilder>,
    branches: HashMap<BranchTriple, BranchBuilder>,
    services: HashMap<(ServiceKind, ServiceFormulation), ServiceBuilder>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every shipped formulation.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for network in ALL_NETWORKS {
            registry.register_device(
                DeviceKind::ThermalStandard,
                DeviceFormulation::ThermalDispatch,
                network,
                thermal::construct_thermal_dispatch,
            );
            registry.register_device(
                DeviceKind::RenewableDispatch,
                DeviceFormulation::RenewableFullDispatch,
                network,
                renewable::construct_full_dispatch,
            );
            registry.register_device(
                DeviceKind::RenewableDispatch,
                DeviceFormulation::FixedOutput,
                network,
                renewable::construct_fixed_output,
            );
            registry.register_device(
                DeviceKind::PowerLoad,
                DeviceFormulation::StaticPowerLoad,
                network,
                load::construct_static_load,
            );
        }

        for formulation in [
            BranchFormulation::StaticBranch,
            BranchFormulation::StaticBranchUnbounded,
        ] {
            registry.register_branch(
                BranchKind::Line,
                formulation,
                NetworkFormulation::CopperPlate,
                branches::skip_without_network,
            );
            for network in [NetworkFormulation::DcPower, NetworkFormulation::DecoupledAcPower] {
                registry.register_branch(
                    BranchKind::Line,
                    formulation,
                    network,
                    branches::construct_static_branch,
                );
            }
        }

        for kind in [ServiceKind::ReserveUp, ServiceKind::ReserveDown] {
            registry.register_service(
                kind,
                ServiceFormulation::RangeReserve,
                services::construct_range_reserve,
            );
        }
        registry
    }

    /// Register (or replace) a device builder.
    pub fn register_device(
        &mut self,
        kind: DeviceKind,
        formulation: DeviceFormulation,
        network: NetworkFormulation,
        builder: DeviceBuilder,
    ) {
        debug!(%kind, %formulation, %network, "registered device builder");
        self.devices.insert((kind, formulation, network), builder);
    }

    pub fn register_branch(
        &mut self,
        kind: BranchKind,
        formulation: BranchFormulation,
        network: NetworkFormulation,
        builder: BranchBuilder,
    ) {
        debug!(%kind, %formulation, %network, "registered branch builder");
        self.branches.insert((kind, formulation, network), builder);
    }

    pub fn register_service(
        &mut self,
        kind: ServiceKind,
        formulation: ServiceFormulation,
        builder: ServiceBuilder,
    ) {
        debug!(%kind, %formulation, "registered service builder");
        self.services.insert((kind, formulation), builder);
    }

    pub fn device(
        &self,
        model: &DeviceModel,
        network: NetworkFormulation,
    ) -> BuildResult<DeviceBuilder> {
        self.devices
            .get(&(model.kind, model.formulation, network))
            .copied()
            .ok_or_else(|| BuildError::UnimplementedFormulation {
                entity: model.kind.to_string(),
                formulation: model.formulation.to_string(),
                network: network.to_string(),
            })
    }

    pub fn branch(
        &self,
        model: &BranchModel,
        network: NetworkFormulation,
    ) -> BuildResult<BranchBuilder> {
        self.branches
            .get(&(model.kind, model.formulation, network))
            .copied()
            .ok_or_else(|| BuildError::UnimplementedFormulation {
                entity: model.kind.to_string(),
                formulation: model.formulation.to_string(),
                network: network.to_string(),
            })
    }

    pub fn service(&self, model: &ServiceModel) -> BuildResult<ServiceBuilder> {
        self.services
            .get(&(model.kind, model.formulation))
            .copied()
            .ok_or_else(|| BuildError::UnimplementedFormulation {
                entity: model.kind.to_string(),
                formulation: model.formulation.to_string(),
                network: "any".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.devices.len() + self.branches.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
