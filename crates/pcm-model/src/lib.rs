//! # pcm-model: Operations problem assembly
//!
//! Turns a [`ProblemTemplate`] (which formulation models each device kind,
//! branch kind, reserve service and the network) plus a read-only
//! [`pcm_core::DataSource`] into a linear optimization problem over a
//! forecast horizon, hands it to a [`MathBackend`], and maps the solution back
//! onto typed keys.
//!
//! ## Architecture
//!
//! | Piece | Role |
//! |-------|------|
//! | [`ProblemContainer`] | Owns variables, constraints, expressions, parameters and objective |
//! | [`BuilderRegistry`] | (kind, formulation, network) to builder dispatch |
//! | [`ConstructionPipeline`] | Runs services, devices, network, branches, objective in order |
//! | [`OperationsProblem`] | `Unbuilt -> Built -> Solved` façade |
//! | [`MathBackend`] | Solves a resolved [`LinearProgram`]; [`ClarabelBackend`] ships |
//!
//! Injections of forecast-driven devices are accumulated into per-bus (or
//! system-wide) balance expressions; the network stage turns those into
//! balance constraints. With `use_parameters` the forecast values are
//! parameters that [`OperationsProblem::update_parameter`] patches in place.
//!
//! ## Example
//!
//! ```no_run
//! use pcm_core::*;
//! use pcm_model::*;
//!
//! let mut system = System::new(100.0);
//! system.add_bus(Bus::new(BusId::new(1), "bus1")).unwrap();
//! system
//!     .add_device(Device::Thermal(
//!         ThermalStandard::new("gen1", BusId::new(1))
//!             .with_active_power_limits(0.0, 100.0)
//!             .with_variable_cost(10.0),
//!     ))
//!     .unwrap();
//!
//! let template = ProblemTemplate::economic_dispatch(NetworkFormulation::CopperPlate);
//! let mut problem = OperationsProblem::new(template, system, ProblemSettings::default())
//!     .with_backend(ClarabelBackend);
//! problem.build()?;
//! let results = problem.solve(SolveOptions::default())?;
//! println!("cost: {:.2}", results.objective_value);
//! # Ok::<(), BuildError>(())
//! ```

pub mod backends;
pub mod container;
pub mod error;
pub mod formulations;
pub mod logging;
pub mod pipeline;
pub mod problem;
pub mod registry;
pub mod results;
pub mod settings;
pub mod template;
pub mod traits;

pub use backends::ClarabelBackend;
pub use container::{
    AffineExpr, BuildStage, ConstraintKey, ConstraintKind, ContainerArray, ContainerStructure,
    EntityKind, ExpressionKey, ExpressionKind, LinearConstraint, LinearProgram, ParameterKind,
    ProblemContainer, Sense, UpdateRef, VariableKey, VariableKind,
};
pub use error::{BuildError, BuildResult};
pub use pipeline::ConstructionPipeline;
pub use problem::{OperationsProblem, ProblemState, SolveOptions};
pub use registry::BuilderRegistry;
pub use results::{OptimizationResults, SolverDiagnostics, ValueTable};
pub use settings::ProblemSettings;
pub use template::{
    BranchFormulation, BranchModel, DeviceFormulation, DeviceModel, NetworkFormulation,
    ProblemTemplate, ServiceFormulation, ServiceModel,
};
pub use traits::{
    BackendOptions, BackendSolution, DualStatus, MathBackend, PrimalStatus, TerminationStatus,
};
