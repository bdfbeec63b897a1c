//! Declarative problem templates.
//!
//! A [`ProblemTemplate`] names the network formulation and, for each entity
//! kind that should appear in the problem, the formulation to build it with.
//! Entries are kept in registration order, which is also the order in which
//! devices are constructed.

use pcm_core::{BranchKind, DeviceKind, ServiceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BuildError, BuildResult};

/// How the network couples nodal injections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkFormulation {
    /// One system-wide balance per step; branches are ignored
    #[default]
    CopperPlate,
    /// Bus angles with linearized active flows
    DcPower,
    /// Angles plus voltage magnitudes, separate active and reactive balances
    DecoupledAcPower,
}

impl NetworkFormulation {
    pub fn supports_reactive_power(&self) -> bool {
        matches!(self, NetworkFormulation::DecoupledAcPower)
    }

    pub fn uses_angles(&self) -> bool {
        !matches!(self, NetworkFormulation::CopperPlate)
    }
}

impl fmt::Display for NetworkFormulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceFormulation {
    ThermalDispatch,
    RenewableFullDispatch,
    /// Output follows the forecast and enters the balance as a constant
    FixedOutput,
    StaticPowerLoad,
}

impl DeviceFormulation {
    /// Whether the formulation builds range constraints that read the
    /// reserve terms services write into range expressions.
    pub fn provides_reserves(&self) -> bool {
        matches!(
            self,
            DeviceFormulation::ThermalDispatch | DeviceFormulation::RenewableFullDispatch
        )
    }
}

impl fmt::Display for DeviceFormulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchFormulation {
    /// Flows bounded by the thermal rating
    StaticBranch,
    StaticBranchUnbounded,
}

impl fmt::Display for BranchFormulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceFormulation {
    RangeReserve,
}

impl fmt::Display for ServiceFormulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub kind: DeviceKind,
    pub formulation: DeviceFormulation,
}

impl DeviceModel {
    pub fn new(kind: DeviceKind, formulation: DeviceFormulation) -> Self {
        Self { kind, formulation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchModel {
    pub kind: BranchKind,
    pub formulation: BranchFormulation,
}

impl BranchModel {
    pub fn new(kind: BranchKind, formulation: BranchFormulation) -> Self {
        Self { kind, formulation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModel {
    pub kind: ServiceKind,
    pub formulation: ServiceFormulation,
}

impl ServiceModel {
    pub fn new(kind: ServiceKind, formulation: ServiceFormulation) -> Self {
        Self { kind, formulation }
    }
}

/// Model entries that share an entity kind type.
trait EntityModel {
    type Kind: PartialEq + fmt::Display;
    fn entity_kind(&self) -> Self::Kind;
}

impl EntityModel for DeviceModel {
    type Kind = DeviceKind;
    fn entity_kind(&self) -> DeviceKind {
        self.kind
    }
}

impl EntityModel for BranchModel {
    type Kind = BranchKind;
    fn entity_kind(&self) -> BranchKind {
        self.kind
    }
}

impl EntityModel for ServiceModel {
    type Kind = ServiceKind;
    fn entity_kind(&self) -> ServiceKind {
        self.kind
    }
}

/// Network formulation plus ordered name → model tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemTemplate {
    network: NetworkFormulation,
    devices: Vec<(String, DeviceModel)>,
    branches: Vec<(String, BranchModel)>,
    services: Vec<(String, ServiceModel)>,
}

impl ProblemTemplate {
    pub fn new(network: NetworkFormulation) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Thermal dispatch, full renewable dispatch, static loads and, when the
    /// network has angles, bounded lines.
    pub fn economic_dispatch(network: NetworkFormulation) -> Self {
        let mut template = Self::new(network);
        template.devices = vec![
            (
                "Thermal".to_string(),
                DeviceModel::new(DeviceKind::ThermalStandard, DeviceFormulation::ThermalDispatch),
            ),
            (
                "Renewable".to_string(),
                DeviceModel::new(
                    DeviceKind::RenewableDispatch,
                    DeviceFormulation::RenewableFullDispatch,
                ),
            ),
            (
                "Load".to_string(),
                DeviceModel::new(DeviceKind::PowerLoad, DeviceFormulation::StaticPowerLoad),
            ),
        ];
        if network.uses_angles() {
            template.branches = vec![(
                "Lines".to_string(),
                BranchModel::new(BranchKind::Line, BranchFormulation::StaticBranch),
            )];
        }
        template
    }

    pub fn network(&self) -> NetworkFormulation {
        self.network
    }

    pub fn set_network(&mut self, network: NetworkFormulation) {
        self.network = network;
    }

    pub fn devices(&self) -> &[(String, DeviceModel)] {
        &self.devices
    }

    pub fn branches(&self) -> &[(String, BranchModel)] {
        &self.branches
    }

    pub fn services(&self) -> &[(String, ServiceModel)] {
        &self.services
    }

    pub fn device_model(&self, name: &str) -> Option<&DeviceModel> {
        lookup(&self.devices, name)
    }

    pub fn branch_model(&self, name: &str) -> Option<&BranchModel> {
        lookup(&self.branches, name)
    }

    pub fn service_model(&self, name: &str) -> Option<&ServiceModel> {
        lookup(&self.services, name)
    }

    /// Model registered for a device kind, if any.
    pub fn model_for_device(&self, kind: DeviceKind) -> Option<&DeviceModel> {
        self.devices.iter().map(|(_, m)| m).find(|m| m.kind == kind)
    }

    pub fn add_device_model(&mut self, name: impl Into<String>, model: DeviceModel) -> BuildResult<()> {
        insert(&mut self.devices, "device model", name.into(), model)
    }

    pub fn add_branch_model(&mut self, name: impl Into<String>, model: BranchModel) -> BuildResult<()> {
        insert(&mut self.branches, "branch model", name.into(), model)
    }

    pub fn add_service_model(
        &mut self,
        name: impl Into<String>,
        model: ServiceModel,
    ) -> BuildResult<()> {
        insert(&mut self.services, "service model", name.into(), model)
    }

    pub fn set_device_model(&mut self, name: &str, model: DeviceModel) -> BuildResult<()> {
        replace(&mut self.devices, "device model", name, model)
    }

    pub fn set_branch_model(&mut self, name: &str, model: BranchModel) -> BuildResult<()> {
        replace(&mut self.branches, "branch model", name, model)
    }

    pub fn set_service_model(&mut self, name: &str, model: ServiceModel) -> BuildResult<()> {
        replace(&mut self.services, "service model", name, model)
    }

    /// Replace the whole device table, keeping the given order.
    pub fn set_devices(&mut self, devices: Vec<(String, DeviceModel)>) -> BuildResult<()> {
        self.devices = collect(devices, "device model")?;
        Ok(())
    }

    pub fn set_branches(&mut self, branches: Vec<(String, BranchModel)>) -> BuildResult<()> {
        self.branches = collect(branches, "branch model")?;
        Ok(())
    }

    pub fn set_services(&mut self, services: Vec<(String, ServiceModel)>) -> BuildResult<()> {
        self.services = collect(services, "service model")?;
        Ok(())
    }
}

fn lookup<'a, M>(table: &'a [(String, M)], name: &str) -> Option<&'a M> {
    table.iter().find(|(n, _)| n == name).map(|(_, m)| m)
}

// A name or an entity kind may appear only once per table.
fn check_conflict<M: EntityModel>(
    table: &[(String, M)],
    kind: &'static str,
    name: &str,
    model: &M,
) -> BuildResult<()> {
    if table.iter().any(|(n, _)| n == name) {
        return Err(BuildError::ConflictingRegistration {
            kind,
            name: name.to_string(),
        });
    }
    if let Some((other, _)) = table
        .iter()
        .find(|(_, m)| m.entity_kind() == model.entity_kind())
    {
        return Err(BuildError::ConflictingRegistration {
            kind,
            name: format!("{} (already modeled as '{other}')", model.entity_kind()),
        });
    }
    Ok(())
}

fn insert<M: EntityModel>(
    table: &mut Vec<(String, M)>,
    kind: &'static str,
    name: String,
    model: M,
) -> BuildResult<()> {
    check_conflict(table, kind, &name, &model)?;
    table.push((name, model));
    Ok(())
}

fn replace<M: EntityModel>(
    table: &mut [(String, M)],
    kind: &'static str,
    name: &str,
    model: M,
) -> BuildResult<()> {
    let idx = table
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| BuildError::MissingEntry {
            kind,
            name: name.to_string(),
        })?;
    let clash = table
        .iter()
        .enumerate()
        .any(|(i, (_, m))| i != idx && m.entity_kind() == model.entity_kind());
    if clash {
        return Err(BuildError::ConflictingRegistration {
            kind,
            name: model.entity_kind().to_string(),
        });
    }
    table[idx].1 = model;
    Ok(())
}

fn collect<M: EntityModel>(
    entries: Vec<(String, M)>,
    kind: &'static str,
) -> BuildResult<Vec<(String, M)>> {
    let mut table = Vec::with_capacity(entries.len());
    for (name, model) in entries {
        insert(&mut table, kind, name, model)?;
    }
    Ok(table)
}
