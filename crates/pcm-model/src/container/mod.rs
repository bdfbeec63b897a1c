//! The problem container.
//!
//! [`ProblemContainer`] is the single owner of everything a build pass
//! produces: typed variable, constraint and expression arrays, the parameter
//! registry, the objective and the flat declaration lists a backend consumes.
//! Entries are only ever added; a template change replaces the whole
//! container.

mod array;
mod expr;
mod keys;
mod parameters;

use chrono::{NaiveDateTime, TimeDelta};
use pcm_core::{BusId, DataSource};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

pub use array::ContainerArray;
pub use expr::{
    AffineExpr, ConstraintDecl, ConstraintId, LinearConstraint, LinearObjective, LinearProgram,
    ObjectiveSense, ParameterId, Sense, VariableDecl, VariableId,
};
pub use keys::{
    ConstraintKey, ConstraintKind, EntityKind, ExpressionKey, ExpressionKind, VariableKey,
    VariableKind,
};
pub use parameters::{ParameterArray, ParameterKind, ParameterRegistry, UpdateRef};

use expr::Declarations;

use crate::error::{BuildError, BuildResult};
use crate::settings::ProblemSettings;
use crate::template::NetworkFormulation;

/// Row name of the single balance under [`NetworkFormulation::CopperPlate`].
pub const SYSTEM_BALANCE_ROW: &str = "system";

/// Construction stages, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BuildStage {
    Initialized,
    Services,
    Devices,
    Network,
    Branches,
    Objective,
}

/// Names and shapes of everything in a container, for comparing builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerStructure {
    pub variables: BTreeMap<String, (usize, usize)>,
    pub constraints: BTreeMap<String, (usize, usize)>,
    pub expressions: BTreeMap<String, (usize, usize)>,
    pub parameters: Vec<String>,
}

/// A `(expression, sense, rhs)` row passed to [`ProblemContainer::add_constraints`].
pub type ConstraintRow = (AffineExpr, Sense, f64);

#[derive(Debug, Clone)]
pub struct ProblemContainer {
    settings: ProblemSettings,
    horizon: usize,
    initial_time: NaiveDateTime,
    resolution: TimeDelta,
    base_power: f64,
    network: NetworkFormulation,
    stage: BuildStage,
    variables: BTreeMap<VariableKey, ContainerArray<VariableId>>,
    constraints: BTreeMap<ConstraintKey, ContainerArray<ConstraintId>>,
    expressions: BTreeMap<ExpressionKey, ContainerArray<AffineExpr>>,
    parameters: ParameterRegistry,
    objective: AffineExpr,
    objective_sense: ObjectiveSense,
    decls: Declarations,
    bus_rows: HashMap<BusId, String>,
}

impl ProblemContainer {
    /// Fresh container with empty balance expressions for `network`.
    pub fn new<S: DataSource + ?Sized>(
        settings: &ProblemSettings,
        network: NetworkFormulation,
        source: &S,
    ) -> BuildResult<Self> {
        settings.validate()?;
        let horizon = settings.horizon.unwrap_or_else(|| source.forecast_horizon());
        if horizon == 0 {
            return Err(BuildError::Config("horizon must be at least 1".into()));
        }
        let bus_rows: HashMap<BusId, String> = source
            .buses()
            .iter()
            .map(|b| (b.id, b.name.clone()))
            .collect();

        let mut container = Self {
            settings: settings.clone(),
            horizon,
            initial_time: settings
                .initial_time
                .unwrap_or_else(|| source.forecast_initial_time()),
            resolution: source.forecast_resolution(),
            base_power: source.base_power(),
            network,
            stage: BuildStage::Initialized,
            variables: BTreeMap::new(),
            constraints: BTreeMap::new(),
            expressions: BTreeMap::new(),
            parameters: ParameterRegistry::new(),
            objective: AffineExpr::new(),
            objective_sense: ObjectiveSense::Minimize,
            decls: Declarations::default(),
            bus_rows,
        };

        let axis: Vec<String> = match network {
            NetworkFormulation::CopperPlate => vec![SYSTEM_BALANCE_ROW.to_string()],
            _ => source.buses().iter().map(|b| b.name.clone()).collect(),
        };
        let active = container.balance_key(ExpressionKind::ActivePowerBalance);
        container.expression_or_insert(active, axis.clone());
        if network.supports_reactive_power() {
            let reactive = container.balance_key(ExpressionKind::ReactivePowerBalance);
            container.expression_or_insert(reactive, axis);
        }
        Ok(container)
    }

    pub fn settings(&self) -> &ProblemSettings {
        &self.settings
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn time_steps(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.horizon
    }

    pub fn initial_time(&self) -> NaiveDateTime {
        self.initial_time
    }

    pub fn resolution(&self) -> TimeDelta {
        self.resolution
    }

    /// Step length in hours, used to turn $/MWh costs into $ per step.
    pub fn resolution_hours(&self) -> f64 {
        self.resolution.num_seconds() as f64 / 3600.0
    }

    pub fn time_stamps(&self) -> Vec<NaiveDateTime> {
        (0..self.horizon)
            .map(|i| self.initial_time + self.resolution * i as i32)
            .collect()
    }

    pub fn base_power(&self) -> f64 {
        self.base_power
    }

    pub fn network(&self) -> NetworkFormulation {
        self.network
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Move to `stage`. Re-entering the current stage is allowed; going back is not.
    pub fn enter_stage(&mut self, stage: BuildStage) -> BuildResult<()> {
        if stage < self.stage {
            return Err(BuildError::StageOrder {
                current: self.stage,
                requested: stage,
            });
        }
        if stage != self.stage {
            info!(
                problem = %self.settings.problem_name,
                stage = ?stage,
                variables = self.decls.variables.len(),
                constraints = self.decls.constraints.len(),
                "entering build stage"
            );
        }
        self.stage = stage;
        Ok(())
    }

    // ---- variables --------------------------------------------------------

    /// Declare one variable per `(name, t)` with bounds from `bounds`.
    pub fn add_variables<F>(
        &mut self,
        key: VariableKey,
        axis: Vec<String>,
        mut bounds: F,
    ) -> BuildResult<&ContainerArray<VariableId>>
    where
        F: FnMut(&str, usize) -> (Option<f64>, Option<f64>),
    {
        if self.variables.contains_key(&key) {
            return Err(BuildError::ConflictingRegistration {
                kind: "variable",
                name: key.to_string(),
            });
        }
        let decls = &mut self.decls;
        let array = ContainerArray::from_fn(axis, self.horizon, |name, t| {
            let (lower, upper) = bounds(name, t);
            decls.push_variable(VariableDecl {
                name: format!("{key}[{name},{t}]"),
                lower,
                upper,
            })
        });
        debug!(variable = %key, count = array.values().len(), "added variables");
        Ok(self.variables.entry(key).or_insert(array))
    }

    pub fn variables(&self, key: &VariableKey) -> BuildResult<&ContainerArray<VariableId>> {
        self.variables.get(key).ok_or_else(|| BuildError::MissingEntry {
            kind: "variable",
            name: key.to_string(),
        })
    }

    pub fn has_variables(&self, key: &VariableKey) -> bool {
        self.variables.contains_key(key)
    }

    pub fn variable_arrays(&self) -> impl Iterator<Item = (&VariableKey, &ContainerArray<VariableId>)> {
        self.variables.iter()
    }

    pub fn variable_decl(&self, id: VariableId) -> &VariableDecl {
        &self.decls.variables[id.index()]
    }

    pub fn num_variables(&self) -> usize {
        self.decls.variables.len()
    }

    // ---- constraints ------------------------------------------------------

    /// Declare constraints from row-major `rows` (`axis.len() * horizon` of them).
    pub fn add_constraints(
        &mut self,
        key: ConstraintKey,
        axis: Vec<String>,
        rows: Vec<ConstraintRow>,
    ) -> BuildResult<&ContainerArray<ConstraintId>> {
        if self.constraints.contains_key(&key) {
            return Err(BuildError::ConflictingRegistration {
                kind: "constraint",
                name: key.to_string(),
            });
        }
        if rows.len() != axis.len() * self.horizon {
            return Err(BuildError::Config(format!(
                "{key}: {} rows for {} entries over {} steps",
                rows.len(),
                axis.len(),
                self.horizon
            )));
        }
        let horizon = self.horizon;
        let mut ids = Vec::with_capacity(rows.len());
        for (i, (expr, sense, rhs)) in rows.into_iter().enumerate() {
            let name = format!("{key}[{},{}]", axis[i / horizon], i % horizon + 1);
            ids.push(self.decls.push_constraint(ConstraintDecl {
                name,
                expr,
                sense,
                rhs,
            }));
        }
        let count = ids.len();
        let array = ContainerArray::from_cells(axis, horizon, ids).ok_or_else(|| {
            BuildError::Config(format!("{key}: constraint array shape mismatch"))
        })?;
        debug!(constraint = %key, count, "added constraints");
        Ok(self.constraints.entry(key).or_insert(array))
    }

    pub fn constraints(&self, key: &ConstraintKey) -> BuildResult<&ContainerArray<ConstraintId>> {
        self.constraints
            .get(key)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "constraint",
                name: key.to_string(),
            })
    }

    pub fn has_constraints(&self, key: &ConstraintKey) -> bool {
        self.constraints.contains_key(key)
    }

    pub fn constraint_arrays(
        &self,
    ) -> impl Iterator<Item = (&ConstraintKey, &ContainerArray<ConstraintId>)> {
        self.constraints.iter()
    }

    pub fn constraint_decl(&self, id: ConstraintId) -> &ConstraintDecl {
        &self.decls.constraints[id.index()]
    }

    /// The constraint with current parameter values folded in.
    pub fn resolved_constraint(&self, id: ConstraintId) -> LinearConstraint {
        self.constraint_decl(id).resolve(self.parameters.values())
    }

    pub fn num_constraints(&self) -> usize {
        self.decls.constraints.len()
    }

    // ---- expressions ------------------------------------------------------

    /// The expression array under `key`, created with zero cells over `axis`
    /// if it does not exist yet. An existing array keeps its own axis.
    pub fn expression_or_insert(
        &mut self,
        key: ExpressionKey,
        axis: Vec<String>,
    ) -> &mut ContainerArray<AffineExpr> {
        let horizon = self.horizon;
        self.expressions.entry(key).or_insert_with_key(|key| {
            debug!(expression = %key, rows = axis.len(), "added expression array");
            ContainerArray::filled(axis, horizon, AffineExpr::new())
        })
    }

    pub fn expression(&self, key: &ExpressionKey) -> Option<&ContainerArray<AffineExpr>> {
        self.expressions.get(key)
    }

    pub fn expression_mut(&mut self, key: &ExpressionKey) -> BuildResult<&mut ContainerArray<AffineExpr>> {
        self.expressions
            .get_mut(key)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "expression",
                name: key.to_string(),
            })
    }

    /// The cell `(name, t)` of an existing expression array.
    pub fn expression_cell_mut(
        &mut self,
        key: &ExpressionKey,
        name: &str,
        t: usize,
    ) -> BuildResult<&mut AffineExpr> {
        self.expression_mut(key)?
            .get_mut(name, t)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "expression cell",
                name: format!("{key}[{name},{t}]"),
            })
    }

    pub fn expression_arrays(
        &self,
    ) -> impl Iterator<Item = (&ExpressionKey, &ContainerArray<AffineExpr>)> {
        self.expressions.iter()
    }

    /// Key of the active or reactive balance for this container's network.
    pub fn balance_key(&self, kind: ExpressionKind) -> ExpressionKey {
        let entity = match self.network {
            NetworkFormulation::CopperPlate => EntityKind::System,
            _ => EntityKind::Bus,
        };
        ExpressionKey::new(kind, entity)
    }

    /// Balance row a device at `bus` contributes to.
    pub fn balance_row(&self, bus: BusId) -> BuildResult<&str> {
        if self.network == NetworkFormulation::CopperPlate {
            return Ok(SYSTEM_BALANCE_ROW);
        }
        self.bus_rows
            .get(&bus)
            .map(String::as_str)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "bus",
                name: bus.value().to_string(),
            })
    }

    pub fn bus_name(&self, bus: BusId) -> BuildResult<&str> {
        self.bus_rows
            .get(&bus)
            .map(String::as_str)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "bus",
                name: bus.value().to_string(),
            })
    }

    // ---- parameters -------------------------------------------------------

    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.parameters
    }

    // ---- objective --------------------------------------------------------

    pub fn add_to_objective(&mut self, var: VariableId, coeff: f64) {
        if coeff != 0.0 {
            self.objective.add_variable(var, coeff);
        }
    }

    pub fn objective(&self) -> &AffineExpr {
        &self.objective
    }

    pub fn objective_sense(&self) -> ObjectiveSense {
        self.objective_sense
    }

    pub fn set_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective_sense = sense;
    }

    // ---- solver-facing views ----------------------------------------------

    /// Parameter-free program with the current parameter values folded in.
    pub fn linear_program(&self) -> LinearProgram {
        let values = self.parameters.values();
        let objective = self.objective.resolve(values);
        LinearProgram {
            variables: self.decls.variables.clone(),
            constraints: self
                .decls
                .constraints
                .iter()
                .map(|c| c.resolve(values))
                .collect(),
            objective: LinearObjective {
                sense: self.objective_sense,
                terms: objective
                    .variables()
                    .map(|(v, c)| (v.index(), c))
                    .collect(),
                constant: objective.constant(),
            },
        }
    }

    pub fn structure(&self) -> ContainerStructure {
        ContainerStructure {
            variables: self
                .variables
                .iter()
                .map(|(k, a)| (k.to_string(), a.shape()))
                .collect(),
            constraints: self
                .constraints
                .iter()
                .map(|(k, a)| (k.to_string(), a.shape()))
                .collect(),
            expressions: self
                .expressions
                .iter()
                .map(|(k, a)| (k.to_string(), a.shape()))
                .collect(),
            parameters: self.parameters.iter().map(|(k, _)| k.to_string()).collect(),
        }
    }
}
