//! Adjustable parameters keyed by [`UpdateRef`].
//!
//! A parameter array holds one parameter per (device, time step) plus the
//! multiplier it is scaled by and the series that last set it. Constraints and
//! expressions store [`ParameterId`]s, so updating a series only rewrites
//! values here and never touches the built structure.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use super::array::ContainerArray;
use super::expr::ParameterId;
use super::keys::EntityKind;
use crate::error::{BuildError, BuildResult};

/// What a parameter array represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ParameterKind {
    ActivePowerTimeSeries,
    ReactivePowerTimeSeries,
    RequirementTimeSeries,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::ActivePowerTimeSeries => f.write_str("ActivePowerTimeSeriesParameter"),
            ParameterKind::ReactivePowerTimeSeries => {
                f.write_str("ReactivePowerTimeSeriesParameter")
            }
            ParameterKind::RequirementTimeSeries => f.write_str("RequirementTimeSeriesParameter"),
        }
    }
}

/// Identifies what varies over time: owner kind, parameter kind, forecast label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UpdateRef {
    pub entity: EntityKind,
    pub parameter: ParameterKind,
    pub label: String,
}

impl UpdateRef {
    pub fn new(entity: EntityKind, parameter: ParameterKind, label: impl Into<String>) -> Self {
        Self {
            entity,
            parameter,
            label: label.into(),
        }
    }
}

impl fmt::Display for UpdateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}__{}", self.parameter, self.entity, self.label)
    }
}

/// Parameters for one [`UpdateRef`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterArray {
    ids: ContainerArray<ParameterId>,
    multipliers: ContainerArray<f64>,
    series: BTreeMap<String, Vec<f64>>,
}

impl ParameterArray {
    pub fn ids(&self) -> &ContainerArray<ParameterId> {
        &self.ids
    }

    pub fn multipliers(&self) -> &ContainerArray<f64> {
        &self.multipliers
    }

    /// Series last bound to `name`.
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }
}

/// All parameter arrays of a container and the flat value store they index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterRegistry {
    arrays: BTreeMap<UpdateRef, ParameterArray>,
    values: Vec<f64>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an array of parameters over `axis × 1..=horizon`.
    ///
    /// Registering the same key twice is a conflict: one `UpdateRef` owns
    /// exactly one live array.
    pub fn register(
        &mut self,
        key: UpdateRef,
        axis: Vec<String>,
        horizon: usize,
    ) -> BuildResult<&ParameterArray> {
        if self.arrays.contains_key(&key) {
            return Err(BuildError::ConflictingRegistration {
                kind: "parameter",
                name: key.to_string(),
            });
        }
        let first = self.values.len();
        let count = axis.len() * horizon;
        self.values.resize(first + count, 0.0);
        let mut next = first;
        let ids = ContainerArray::from_fn(axis.clone(), horizon, |_, _| {
            let id = ParameterId::new(next);
            next += 1;
            id
        });
        let multipliers = ContainerArray::filled(axis, horizon, 0.0);
        debug!(parameter = %key, count, "registered parameter array");
        let array = self.arrays.entry(key).or_insert(ParameterArray {
            ids,
            multipliers,
            series: BTreeMap::new(),
        });
        Ok(array)
    }

    /// Set `name`'s parameters to `series` and record its multiplier.
    pub fn bind(
        &mut self,
        key: &UpdateRef,
        name: &str,
        series: &[f64],
        multiplier: f64,
    ) -> BuildResult<Vec<ParameterId>> {
        let array = self
            .arrays
            .get_mut(key)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "parameter",
                name: key.to_string(),
            })?;
        let ids = array
            .ids
            .row(name)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "parameter row",
                name: format!("{key}[{name}]"),
            })?
            .to_vec();
        check_length(key, name, ids.len(), series.len())?;
        for (t, (id, value)) in ids.iter().zip(series).enumerate() {
            self.values[id.index()] = *value;
            if let Some(m) = array.multipliers.get_mut(name, t + 1) {
                *m = multiplier;
            }
        }
        array.series.insert(name.to_string(), series.to_vec());
        Ok(ids)
    }

    /// Overwrite the values bound to `name` without touching anything else.
    pub fn update(&mut self, key: &UpdateRef, name: &str, series: &[f64]) -> BuildResult<()> {
        let array = self
            .arrays
            .get_mut(key)
            .ok_or_else(|| BuildError::MissingEntry {
                kind: "parameter",
                name: key.to_string(),
            })?;
        let ids = array.ids.row(name).ok_or_else(|| BuildError::MissingEntry {
            kind: "parameter row",
            name: format!("{key}[{name}]"),
        })?;
        check_length(key, name, ids.len(), series.len())?;
        for (id, value) in ids.iter().zip(series) {
            self.values[id.index()] = *value;
        }
        array.series.insert(name.to_string(), series.to_vec());
        debug!(parameter = %key, device = name, "updated parameter values");
        Ok(())
    }

    pub fn get(&self, key: &UpdateRef) -> Option<&ParameterArray> {
        self.arrays.get(key)
    }

    pub fn contains(&self, key: &UpdateRef) -> bool {
        self.arrays.contains_key(key)
    }

    pub fn value(&self, id: ParameterId) -> f64 {
        self.values[id.index()]
    }

    /// Flat value store indexed by [`ParameterId::index`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UpdateRef, &ParameterArray)> {
        self.arrays.iter()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

fn check_length(key: &UpdateRef, name: &str, expected: usize, actual: usize) -> BuildResult<()> {
    if expected != actual {
        return Err(BuildError::Config(format!(
            "series for {key}[{name}] has {actual} values, horizon is {expected}"
        )));
    }
    Ok(())
}
