//! Forecast time series attached to components.
//!
//! A series is a regularly sampled sequence of values starting at
//! `initial_time`. Values are usually normalized to the owning component's
//! peak (e.g. a load profile between 0 and 1) and scaled by the assembly layer.

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{PcmError, PcmResult};

/// Regularly sampled forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub initial_time: NaiveDateTime,
    /// Sampling interval
    pub resolution: TimeDelta,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(initial_time: NaiveDateTime, resolution: TimeDelta, values: Vec<f64>) -> Self {
        Self {
            initial_time,
            resolution,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamps for every sample.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        (0..self.values.len())
            .map(|i| self.initial_time + self.resolution * i as i32)
            .collect()
    }

    /// The first `horizon` values starting at `start`.
    ///
    /// Fails when `start` is not aligned with the series or when fewer than
    /// `horizon` samples remain.
    pub fn window(&self, start: NaiveDateTime, horizon: usize) -> PcmResult<&[f64]> {
        let offset = start - self.initial_time;
        if offset < TimeDelta::zero() {
            return Err(PcmError::TimeSeries(format!(
                "window start {start} precedes series start {}",
                self.initial_time
            )));
        }
        let step = self.resolution.num_seconds();
        if step <= 0 || offset.num_seconds() % step != 0 {
            return Err(PcmError::TimeSeries(format!(
                "window start {start} is not aligned to resolution {}s",
                step
            )));
        }
        let first = (offset.num_seconds() / step) as usize;
        self.values.get(first..first + horizon).ok_or_else(|| {
            PcmError::TimeSeries(format!(
                "series has {} samples, need {} from offset {first}",
                self.values.len(),
                horizon
            ))
        })
    }
}
