//! Dense `(entity name, time step)` arrays.

use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Two-axis array addressed by entity name and a 1-based time step.
///
/// Rows follow the order of the axis passed at construction; time steps are
/// always the contiguous range `1..=horizon`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerArray<T> {
    axis: Vec<String>,
    lookup: HashMap<String, usize>,
    horizon: usize,
    data: Vec<T>,
}

impl<T> ContainerArray<T> {
    pub fn from_fn<F>(axis: Vec<String>, horizon: usize, mut f: F) -> Self
    where
        F: FnMut(&str, usize) -> T,
    {
        let mut data = Vec::with_capacity(axis.len() * horizon);
        for name in &axis {
            for t in 1..=horizon {
                data.push(f(name, t));
            }
        }
        let lookup = index_axis(&axis);
        Self {
            axis,
            lookup,
            horizon,
            data,
        }
    }

    /// Build from row-major cells (`axis.len() * horizon` of them).
    pub fn from_cells(axis: Vec<String>, horizon: usize, cells: Vec<T>) -> Option<Self> {
        if cells.len() != axis.len() * horizon {
            return None;
        }
        let lookup = index_axis(&axis);
        Some(Self {
            axis,
            lookup,
            horizon,
            data: cells,
        })
    }

    pub fn axis(&self) -> &[String] {
        &self.axis
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn time_steps(&self) -> RangeInclusive<usize> {
        1..=self.horizon
    }

    /// `(rows, time steps)`
    pub fn shape(&self) -> (usize, usize) {
        (self.axis.len(), self.horizon)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    fn offset(&self, name: &str, t: usize) -> Option<usize> {
        if t == 0 || t > self.horizon {
            return None;
        }
        self.lookup.get(name).map(|row| row * self.horizon + t - 1)
    }

    pub fn get(&self, name: &str, t: usize) -> Option<&T> {
        self.offset(name, t).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, name: &str, t: usize) -> Option<&mut T> {
        self.offset(name, t).map(|i| &mut self.data[i])
    }

    /// All steps of one row.
    pub fn row(&self, name: &str) -> Option<&[T]> {
        self.lookup
            .get(name)
            .map(|row| &self.data[row * self.horizon..(row + 1) * self.horizon])
    }

    /// `(name, t, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &T)> + '_ {
        self.data.iter().enumerate().map(move |(i, v)| {
            (
                self.axis[i / self.horizon].as_str(),
                i % self.horizon + 1,
                v,
            )
        })
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }
}

fn index_axis(axis: &[String]) -> HashMap<String, usize> {
    axis.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect()
}

impl<T: Clone> ContainerArray<T> {
    pub fn filled(axis: Vec<String>, horizon: usize, value: T) -> Self {
        Self::from_fn(axis, horizon, |_, _| value.clone())
    }
}
