//! The operations problem façade.
//!
//! [`OperationsProblem`] owns a template, a data source and at most one built
//! container. It moves through three states:
//!
//! ```text
//! Unbuilt --build--> Built --solve--> Solved
//!    ^                 |  ^              |
//!    +-----reset-------+  +--update------+
//! ```
//!
//! Template setters work in every state. Once built, a setter rebuilds a fresh
//! container from the changed template and swaps it in only if the rebuild
//! succeeds; on failure the previous template and container are kept.

use pcm_core::DataSource;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::container::{ConstraintKey, ProblemContainer, UpdateRef, VariableKey};
use crate::error::{BuildError, BuildResult};
use crate::pipeline::ConstructionPipeline;
use crate::registry::BuilderRegistry;
use crate::results::{write_json, OptimizationResults, ValueTable};
use crate::settings::ProblemSettings;
use crate::template::{BranchModel, DeviceModel, NetworkFormulation, ProblemTemplate, ServiceModel};
use crate::traits::{BackendOptions, MathBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemState {
    Unbuilt,
    Built,
    Solved,
}

impl fmt::Display for ProblemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProblemState::Unbuilt => "unbuilt",
            ProblemState::Built => "built",
            ProblemState::Solved => "solved",
        };
        f.write_str(s)
    }
}

/// Per-call solve options.
#[derive(Default)]
pub struct SolveOptions {
    /// Used instead of the attached backend for this call
    pub backend: Option<Box<dyn MathBackend>>,
    /// Results are written here after a successful solve
    pub save_path: Option<PathBuf>,
}

impl SolveOptions {
    pub fn with_backend(mut self, backend: impl MathBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }
}

pub struct OperationsProblem<S: DataSource> {
    template: ProblemTemplate,
    source: S,
    settings: ProblemSettings,
    registry: BuilderRegistry,
    backend: Option<Box<dyn MathBackend>>,
    container: Option<ProblemContainer>,
    results: Option<OptimizationResults>,
    state: ProblemState,
}

impl<S: DataSource> OperationsProblem<S> {
    pub fn new(template: ProblemTemplate, source: S, settings: ProblemSettings) -> Self {
        Self {
            template,
            source,
            settings,
            registry: BuilderRegistry::with_defaults(),
            backend: None,
            container: None,
            results: None,
            state: ProblemState::Unbuilt,
        }
    }

    pub fn with_backend(mut self, backend: impl MathBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Replace the builder registry, e.g. to add custom formulations.
    pub fn with_registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn set_backend(&mut self, backend: Box<dyn MathBackend>) {
        self.backend = Some(backend);
    }

    pub fn state(&self) -> ProblemState {
        self.state
    }

    pub fn template(&self) -> &ProblemTemplate {
        &self.template
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &ProblemSettings {
        &self.settings
    }

    pub fn container(&self) -> Option<&ProblemContainer> {
        self.container.as_ref()
    }

    fn name(&self) -> &str {
        &self.settings.problem_name
    }

    fn invalid(&self, operation: &'static str) -> BuildError {
        BuildError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn construct(&self) -> BuildResult<ProblemContainer> {
        ConstructionPipeline::new(&self.template, &self.registry, &self.source)
            .build(&self.settings)
    }

    pub fn build(&mut self) -> BuildResult<()> {
        if self.state != ProblemState::Unbuilt {
            return Err(self.invalid("build"));
        }
        self.container = Some(self.construct()?);
        self.state = ProblemState::Built;
        Ok(())
    }

    /// Solve the built problem with `options.backend` or the attached backend.
    ///
    /// A termination status without a feasible point is an error; the problem
    /// stays built and holds no results.
    pub fn solve(&mut self, options: SolveOptions) -> BuildResult<&OptimizationResults> {
        let Some(container) = self.container.as_ref() else {
            return Err(self.invalid("solve"));
        };
        let backend: &dyn MathBackend = match options.backend.as_deref() {
            Some(backend) => backend,
            None => self
                .backend
                .as_deref()
                .ok_or_else(|| BuildError::MissingBackend(self.settings.problem_name.clone()))?,
        };

        let program = container.linear_program();
        let backend_options = BackendOptions {
            time_limit: self.settings.time_limit(),
        };
        info!(
            problem = %self.settings.problem_name,
            backend = backend.id(),
            variables = program.variables.len(),
            constraints = program.constraints.len(),
            "solving"
        );
        let solution = backend.optimize(&program, &backend_options)?;
        if !solution.termination.is_feasible_point() {
            self.results = None;
            self.state = ProblemState::Built;
            return Err(BuildError::Infeasible {
                problem: self.settings.problem_name.clone(),
                status: solution.termination,
            });
        }

        let results = OptimizationResults::from_solution(container, backend.id(), &solution);
        if let Some(dir) = &options.save_path {
            results.write(dir)?;
        }
        info!(
            problem = %self.settings.problem_name,
            status = %solution.termination,
            objective = results.objective_value,
            "solved"
        );
        self.state = ProblemState::Solved;
        Ok(self.results.insert(results))
    }

    /// Drop the container and results; keep template and data.
    pub fn reset(&mut self) {
        self.container = None;
        self.results = None;
        self.state = ProblemState::Unbuilt;
        info!(problem = %self.settings.problem_name, "reset");
    }

    // ---- template changes -------------------------------------------------

    fn mutate<F>(&mut self, operation: &'static str, change: F) -> BuildResult<()>
    where
        F: FnOnce(&mut ProblemTemplate) -> BuildResult<()>,
    {
        let previous = self.template.clone();
        if let Err(err) = change(&mut self.template) {
            self.template = previous;
            return Err(err);
        }
        if self.state == ProblemState::Unbuilt {
            return Ok(());
        }
        match self.construct() {
            Ok(container) => {
                self.container = Some(container);
                self.results = None;
                self.state = ProblemState::Built;
                info!(problem = %self.settings.problem_name, operation, "rebuilt after template change");
                Ok(())
            }
            Err(err) => {
                warn!(
                    problem = %self.settings.problem_name,
                    operation,
                    error = %err,
                    "rebuild failed; keeping the previous template"
                );
                self.template = previous;
                Err(err)
            }
        }
    }

    pub fn set_transmission_model(&mut self, network: NetworkFormulation) -> BuildResult<()> {
        self.mutate("set_transmission_model", |t| {
            t.set_network(network);
            Ok(())
        })
    }

    pub fn set_devices_template(&mut self, devices: Vec<(String, DeviceModel)>) -> BuildResult<()> {
        self.mutate("set_devices_template", |t| t.set_devices(devices))
    }

    pub fn set_branches_template(&mut self, branches: Vec<(String, BranchModel)>) -> BuildResult<()> {
        self.mutate("set_branches_template", |t| t.set_branches(branches))
    }

    pub fn set_services_template(&mut self, services: Vec<(String, ServiceModel)>) -> BuildResult<()> {
        self.mutate("set_services_template", |t| t.set_services(services))
    }

    pub fn set_device_model(&mut self, name: &str, model: DeviceModel) -> BuildResult<()> {
        self.mutate("set_device_model", |t| t.set_device_model(name, model))
    }

    pub fn set_branch_model(&mut self, name: &str, model: BranchModel) -> BuildResult<()> {
        self.mutate("set_branch_model", |t| t.set_branch_model(name, model))
    }

    pub fn set_service_model(&mut self, name: &str, model: ServiceModel) -> BuildResult<()> {
        self.mutate("set_service_model", |t| t.set_service_model(name, model))
    }

    pub fn construct_device(&mut self, name: &str, model: DeviceModel) -> BuildResult<()> {
        self.mutate("construct_device", |t| t.add_device_model(name, model))
    }

    pub fn construct_branch(&mut self, name: &str, model: BranchModel) -> BuildResult<()> {
        self.mutate("construct_branch", |t| t.add_branch_model(name, model))
    }

    pub fn construct_service(&mut self, name: &str, model: ServiceModel) -> BuildResult<()> {
        self.mutate("construct_service", |t| t.add_service_model(name, model))
    }

    // ---- parameters -------------------------------------------------------

    /// Replace `name`'s series under `update` without rebuilding.
    ///
    /// Any results are stale afterwards and are dropped.
    pub fn update_parameter(
        &mut self,
        update: &UpdateRef,
        name: &str,
        series: &[f64],
    ) -> BuildResult<()> {
        if !self.settings.use_parameters {
            return Err(self.invalid("update_parameter"));
        }
        let Some(container) = self.container.as_mut() else {
            return Err(self.invalid("update_parameter"));
        };
        container.parameters_mut().update(update, name, series)?;
        self.results = None;
        self.state = ProblemState::Built;
        info!(problem = %self.settings.problem_name, %update, device = name, "updated parameter");
        Ok(())
    }

    /// Current values (times multipliers) of a parameter array.
    pub fn parameter_values(&self, update: &UpdateRef) -> BuildResult<ValueTable> {
        let Some(container) = self.container.as_ref() else {
            return Err(self.invalid("parameter_values"));
        };
        let array = container
            .parameters()
            .get(update)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "parameter",
                name: update.to_string(),
            })?;
        Ok(ValueTable::from_parameters(container, array))
    }

    // ---- results ----------------------------------------------------------

    pub fn results(&self) -> BuildResult<&OptimizationResults> {
        match (&self.results, self.state) {
            (Some(results), ProblemState::Solved) => Ok(results),
            _ => Err(self.invalid("results")),
        }
    }

    pub fn variable_values(&self, key: &VariableKey) -> BuildResult<&ValueTable> {
        let name = key.to_string();
        self.results()?
            .variables
            .get(&name)
            .ok_or(BuildError::MissingEntry {
                kind: "variable",
                name,
            })
    }

    /// Empty tables when the backend reported no duals.
    pub fn dual_values(&self, key: &ConstraintKey) -> BuildResult<&ValueTable> {
        let name = key.to_string();
        self.results()?
            .duals
            .get(&name)
            .ok_or(BuildError::MissingEntry {
                kind: "constraint",
                name,
            })
    }

    /// Write the resolved program as JSON.
    pub fn export_model(&self, path: impl AsRef<Path>) -> BuildResult<()> {
        let Some(container) = self.container.as_ref() else {
            return Err(self.invalid("export_model"));
        };
        write_json(path.as_ref(), &container.linear_program())?;
        info!(problem = self.name(), path = %path.as_ref().display(), "exported model");
        Ok(())
    }

    pub fn write_results(&self, dir: impl AsRef<Path>) -> BuildResult<()> {
        self.results()?.write(dir.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{EntityKind, ParameterKind, VariableKind};
    use crate::container::LinearProgram;
    use crate::formulations::nodal::MAX_ACTIVE_POWER_LABEL;
    use crate::formulations::{load, renewable, thermal};
    use crate::registry::DeviceBuilder;
    use crate::template::BranchFormulation;
    use crate::traits::{BackendSolution, DualStatus, PrimalStatus, TerminationStatus};
    use chrono::TimeDelta;
    use pcm_core::{
        Bus, BusId, BranchKind, Device, DeviceKind, ForecastWindow, PowerLoad, System,
        ThermalStandard, TimeSeries,
    };

    /// Reports every variable at its lower bound (or zero).
    struct LowerBound(TerminationStatus);

    impl MathBackend for LowerBound {
        fn id(&self) -> &str {
            "lower-bound"
        }

        fn optimize(
            &self,
            program: &LinearProgram,
            _options: &BackendOptions,
        ) -> BuildResult<BackendSolution> {
            if !self.0.is_feasible_point() {
                return Ok(BackendSolution::failed(self.0));
            }
            let primal: Vec<f64> = program
                .variables
                .iter()
                .map(|v| v.lower.unwrap_or(0.0))
                .collect();
            Ok(BackendSolution {
                termination: self.0,
                primal_status: PrimalStatus::FeasiblePoint,
                dual_status: DualStatus::NotReported,
                objective_value: program.objective.evaluate(&primal),
                primal,
                duals: None,
                solve_time: None,
            })
        }
    }

    fn system() -> System {
        let window = ForecastWindow {
            horizon: 2,
            ..ForecastWindow::default()
        };
        let mut sys = System::new(100.0).with_forecast_window(window);
        sys.add_bus(Bus::new(BusId::new(1), "b1")).unwrap();
        sys.add_device(Device::Thermal(
            ThermalStandard::new("g1", BusId::new(1)).with_active_power_limits(0.0, 50.0),
        ))
        .unwrap();
        sys.add_device(Device::Load(PowerLoad::new("d1", BusId::new(1), 20.0)))
            .unwrap();
        sys.add_time_series(
            "d1",
            MAX_ACTIVE_POWER_LABEL,
            TimeSeries::new(window.initial_time, TimeDelta::hours(1), vec![0.5, 1.0]),
        )
        .unwrap();
        sys
    }

    fn problem(use_parameters: bool) -> OperationsProblem<System> {
        OperationsProblem::new(
            ProblemTemplate::economic_dispatch(NetworkFormulation::CopperPlate),
            system(),
            ProblemSettings::default().with_parameters(use_parameters),
        )
    }

    /// Test Unbuilt -> Built -> Solved -> Unbuilt.
    #[test]
    fn test_state_machine_transitions() {
        let mut p = problem(false).with_backend(LowerBound(TerminationStatus::Optimal));
        assert_eq!(p.state(), ProblemState::Unbuilt);
        assert!(matches!(
            p.solve(SolveOptions::default()),
            Err(BuildError::InvalidState { state: ProblemState::Unbuilt, .. })
        ));
        p.build().unwrap();
        assert!(matches!(p.build(), Err(BuildError::InvalidState { .. })));
        assert!(p.results().is_err());
        p.solve(SolveOptions::default()).unwrap();
        assert_eq!(p.state(), ProblemState::Solved);
        p.reset();
        assert_eq!(p.state(), ProblemState::Unbuilt);
        assert!(p.container().is_none());
    }

    /// Test solving with no backend attached.
    #[test]
    fn test_solve_without_backend_fails_before_solving() {
        let mut p = problem(false);
        p.build().unwrap();
        assert!(matches!(
            p.solve(SolveOptions::default()),
            Err(BuildError::MissingBackend(_))
        ));
        assert_eq!(p.state(), ProblemState::Built);
    }

    /// Test that a non-optimal status is an error and keeps the container.
    #[test]
    fn test_infeasible_status_keeps_problem_built() {
        let mut p = problem(false);
        p.build().unwrap();
        let err = p
            .solve(SolveOptions::default().with_backend(LowerBound(TerminationStatus::Infeasible)))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Infeasible {
                status: TerminationStatus::Infeasible,
                ..
            }
        ));
        assert_eq!(p.state(), ProblemState::Built);
        assert!(p.results().is_err());
    }

    /// Test that setters rebuild a built problem.
    #[test]
    fn test_setter_on_built_problem_rebuilds() {
        let mut p = problem(false);
        p.build().unwrap();
        p.set_transmission_model(NetworkFormulation::DcPower).unwrap();
        assert_eq!(p.state(), ProblemState::Built);
        assert_eq!(p.container().unwrap().network(), NetworkFormulation::DcPower);
    }

    /// Test that a failed rebuild rolls the template back.
    #[test]
    fn test_failed_rebuild_restores_template() {
        let mut p = problem(false);
        p.build().unwrap();
        let before = p.container().unwrap().structure();
        // a registry that knows devices but no branch formulation
        let mut registry = BuilderRegistry::new();
        for (_, model) in p.template().devices() {
            let builder: DeviceBuilder = match model.kind {
                DeviceKind::ThermalStandard => thermal::construct_thermal_dispatch,
                DeviceKind::RenewableDispatch => renewable::construct_full_dispatch,
                DeviceKind::PowerLoad => load::construct_static_load,
            };
            registry.register_device(
                model.kind,
                model.formulation,
                NetworkFormulation::CopperPlate,
                builder,
            );
        }
        p.registry = registry;
        let err = p
            .construct_branch(
                "Lines",
                BranchModel::new(BranchKind::Line, BranchFormulation::StaticBranch),
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::UnimplementedFormulation { .. }));
        assert!(p.template().branch_model("Lines").is_none());
        assert_eq!(p.container().unwrap().structure(), before);
    }

    /// Test parameter updates with parameters disabled and enabled.
    #[test]
    fn test_parameter_updates_require_parameters() {
        let update = UpdateRef::new(
            EntityKind::Device(DeviceKind::PowerLoad),
            ParameterKind::ActivePowerTimeSeries,
            MAX_ACTIVE_POWER_LABEL,
        );
        let mut literal = problem(false);
        literal.build().unwrap();
        assert!(matches!(
            literal.update_parameter(&update, "d1", &[1.0, 1.0]),
            Err(BuildError::InvalidState { .. })
        ));

        let mut p = problem(true).with_backend(LowerBound(TerminationStatus::Optimal));
        p.build().unwrap();
        p.solve(SolveOptions::default()).unwrap();
        p.update_parameter(&update, "d1", &[0.25, 0.75]).unwrap();
        assert_eq!(p.state(), ProblemState::Built);
        let table = p.parameter_values(&update).unwrap();
        assert_eq!(table.get("d1", 1), Some(5.0));
        assert_eq!(table.get("d1", 2), Some(15.0));
    }

    /// Test reading solved values by variable key.
    #[test]
    fn test_results_are_keyed_by_variable() {
        let mut p = problem(false).with_backend(LowerBound(TerminationStatus::Optimal));
        p.build().unwrap();
        p.solve(SolveOptions::default()).unwrap();
        let key = VariableKey::new(
            VariableKind::ActivePower,
            EntityKind::Device(DeviceKind::ThermalStandard),
        );
        assert_eq!(p.variable_values(&key).unwrap().get("g1", 1), Some(0.0));
        let missing = VariableKey::new(VariableKind::ActivePower, EntityKind::System);
        assert!(matches!(
            p.variable_values(&missing),
            Err(BuildError::MissingEntry { .. })
        ));
    }

    /// Test the JSON model export.
    #[test]
    fn test_export_model_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = problem(false);
        assert!(p.export_model(dir.path().join("model.json")).is_err());
        p.build().unwrap();
        p.export_model(dir.path().join("model.json")).unwrap();
        let text = std::fs::read_to_string(dir.path().join("model.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(json["variables"].as_array().unwrap().len() >= 2);
    }
}
