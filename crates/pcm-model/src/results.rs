//! Solved values mapped back to container keys, and their file sinks.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::container::{ContainerArray, ParameterArray, ProblemContainer};
use crate::traits::{BackendSolution, DualStatus, PrimalStatus, TerminationStatus};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One time-indexed table: a column per component, a row per step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTable {
    pub columns: Vec<String>,
    pub time_stamps: Vec<NaiveDateTime>,
    /// `values[t - 1][column]`; empty when the backend reported nothing
    pub values: Vec<Vec<f64>>,
}

impl ValueTable {
    fn from_array<T, F>(array: &ContainerArray<T>, time_stamps: &[NaiveDateTime], mut f: F) -> Self
    where
        F: FnMut(&T) -> f64,
    {
        let columns = array.axis().to_vec();
        let values = array
            .time_steps()
            .map(|t| {
                columns
                    .iter()
                    .map(|name| array.get(name, t).map_or(f64::NAN, &mut f))
                    .collect()
            })
            .collect();
        Self {
            columns,
            time_stamps: time_stamps.to_vec(),
            values,
        }
    }

    fn empty(columns: &[String], time_stamps: &[NaiveDateTime]) -> Self {
        Self {
            columns: columns.to_vec(),
            time_stamps: time_stamps.to_vec(),
            values: Vec::new(),
        }
    }

    /// Current parameter values times their multipliers.
    pub(crate) fn from_parameters(
        container: &ProblemContainer,
        array: &ParameterArray,
    ) -> Self {
        let params = container.parameters();
        let stamps = container.time_stamps();
        let mut table = Self::from_array(array.ids(), &stamps, |id| params.value(*id));
        for (row, t) in table.values.iter_mut().zip(array.ids().time_steps()) {
            for (value, name) in row.iter_mut().zip(&table.columns) {
                *value *= array.multipliers().get(name, t).copied().unwrap_or(1.0);
            }
        }
        table
    }

    /// Value of `column` at 1-based step `t`.
    pub fn get(&self, column: &str, t: usize) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.values.get(t.checked_sub(1)?)?.get(col).copied()
    }

    pub fn column(&self, column: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|c| c == column)?;
        Some(self.values.iter().filter_map(|row| row.get(col).copied()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating CSV writer for {}", path.display()))?;
        let mut header = vec!["DateTime".to_string()];
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header).context("writing CSV header")?;
        for (stamp, row) in self.time_stamps.iter().zip(&self.values) {
            let mut record = vec![stamp.format(TIME_FORMAT).to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            wtr.write_record(&record).context("writing CSV record")?;
        }
        wtr.flush().context("flushing CSV writer")?;
        Ok(())
    }
}

/// How the solve went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverDiagnostics {
    pub backend: String,
    pub termination: TerminationStatus,
    pub primal_status: PrimalStatus,
    pub dual_status: DualStatus,
    /// `NaN` when the backend did not time itself
    pub solve_time_seconds: f64,
    /// Not tracked by any shipped backend
    pub allocated_bytes: Option<u64>,
}

/// Everything read back from one successful solve.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResults {
    pub problem_name: String,
    pub base_power: f64,
    pub objective_value: f64,
    pub time_stamps: Vec<NaiveDateTime>,
    pub variables: BTreeMap<String, ValueTable>,
    pub duals: BTreeMap<String, ValueTable>,
    pub parameters: BTreeMap<String, ValueTable>,
    pub diagnostics: SolverDiagnostics,
}

#[derive(Serialize)]
struct Summary<'a> {
    problem_name: &'a str,
    base_power: f64,
    objective_value: f64,
    time_stamps: Vec<String>,
    diagnostics: &'a SolverDiagnostics,
}

impl OptimizationResults {
    pub fn from_solution(
        container: &ProblemContainer,
        backend: &str,
        solution: &BackendSolution,
    ) -> Self {
        let stamps = container.time_stamps();

        let variables = container
            .variable_arrays()
            .map(|(key, array)| {
                let table = ValueTable::from_array(array, &stamps, |id| {
                    solution.primal.get(id.index()).copied().unwrap_or(f64::NAN)
                });
                (key.to_string(), table)
            })
            .collect();

        if solution.duals.is_none() {
            warn!(backend, "backend reported no duals; dual tables are empty");
        }
        let duals = container
            .constraint_arrays()
            .map(|(key, array)| {
                let table = match &solution.duals {
                    Some(duals) => ValueTable::from_array(array, &stamps, |id| {
                        duals.get(id.index()).copied().unwrap_or(f64::NAN)
                    }),
                    None => ValueTable::empty(array.axis(), &stamps),
                };
                (key.to_string(), table)
            })
            .collect();

        let parameters = container
            .parameters()
            .iter()
            .map(|(update, array)| {
                (update.to_string(), ValueTable::from_parameters(container, array))
            })
            .collect();

        let solve_time_seconds = match solution.solve_time {
            Some(elapsed) => elapsed.as_secs_f64(),
            None => {
                warn!(backend, "backend reported no solve time");
                f64::NAN
            }
        };

        Self {
            problem_name: container.settings().problem_name.clone(),
            base_power: container.base_power(),
            objective_value: solution.objective_value,
            time_stamps: stamps,
            variables,
            duals,
            parameters,
            diagnostics: SolverDiagnostics {
                backend: backend.to_string(),
                termination: solution.termination,
                primal_status: solution.primal_status,
                dual_status: solution.dual_status,
                solve_time_seconds,
                allocated_bytes: None,
            },
        }
    }

    /// `variables/`, `duals/` and `parameters/` CSVs plus `summary.json` under `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        for (sub, tables) in [
            ("variables", &self.variables),
            ("duals", &self.duals),
            ("parameters", &self.parameters),
        ] {
            let target = dir.join(sub);
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
            for (name, table) in tables {
                table.write_csv(&target.join(format!("{name}.csv")))?;
            }
        }

        let summary = Summary {
            problem_name: &self.problem_name,
            base_power: self.base_power,
            objective_value: self.objective_value,
            time_stamps: self
                .time_stamps
                .iter()
                .map(|t| t.format(TIME_FORMAT).to_string())
                .collect(),
            diagnostics: &self.diagnostics,
        };
        let path = dir.join("summary.json");
        write_json(&path, &summary)?;
        info!(dir = %dir.display(), tables = self.variables.len(), "wrote results");
        Ok(())
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serializing to JSON")?;
    fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))?;
    Ok(())
}
