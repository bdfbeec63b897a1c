//! Problem settings.
//!
//! Settings are plain serde data and may be loaded from TOML. Unspecified
//! fields use their defaults, so partial files are valid:
//!
//! ```toml
//! problem_name = "DayAhead"
//! horizon = 24
//! use_parameters = true
//! time_limit_seconds = 60.0
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemSettings {
    /// Name used in logs, errors and result summaries.
    pub problem_name: String,

    /// Number of time steps; defaults to the data source's forecast horizon.
    pub horizon: Option<usize>,

    /// Read device forecasts. When false, each device's current operating
    /// point is repeated over the horizon.
    pub use_forecast_data: bool,

    /// Build time-series terms against adjustable parameters instead of
    /// literal values.
    pub use_parameters: bool,

    /// First time stamp; defaults to the data source's forecast start.
    pub initial_time: Option<NaiveDateTime>,

    /// Wall-clock limit handed to the backend.
    pub time_limit_seconds: Option<f64>,
}

impl Default for ProblemSettings {
    fn default() -> Self {
        Self {
            problem_name: "OperationsProblem".to_string(),
            horizon: None,
            use_forecast_data: true,
            use_parameters: false,
            initial_time: None,
            time_limit_seconds: None,
        }
    }
}

impl ProblemSettings {
    pub fn from_toml_str(contents: &str) -> BuildResult<Self> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn with_parameters(mut self, enabled: bool) -> Self {
        self.use_parameters = enabled;
        self
    }

    pub fn with_forecast_data(mut self, enabled: bool) -> Self {
        self.use_forecast_data = enabled;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.problem_name = name.into();
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.horizon == Some(0) {
            return Err(BuildError::Config("horizon must be at least 1".into()));
        }
        if let Some(limit) = self.time_limit_seconds {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(BuildError::Config(format!(
                    "time_limit_seconds must be positive, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ProblemSettings::default();
        assert!(settings.use_forecast_data);
        assert!(!settings.use_parameters);
        assert!(settings.horizon.is_none());
        assert!(settings.time_limit().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let settings = ProblemSettings::from_toml_str(
            r#"
            horizon = 3
            use_parameters = true
            initial_time = "2024-01-01T00:00:00"
            "#,
        )
        .unwrap();
        assert_eq!(settings.horizon, Some(3));
        assert!(settings.use_parameters);
        assert!(settings.use_forecast_data);
        assert_eq!(settings.problem_name, "OperationsProblem");
        assert_eq!(
            settings.initial_time.unwrap().to_string(),
            "2024-01-01 00:00:00"
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ProblemSettings::from_toml_str("horizon = 0").is_err());
        assert!(ProblemSettings::from_toml_str("time_limit_seconds = -1.0").is_err());
        assert!(matches!(
            ProblemSettings::from_toml_str("horizon = \"x\""),
            Err(BuildError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problem.toml");
        std::fs::write(&path, "problem_name = \"DA\"\ntime_limit_seconds = 2.5\n").unwrap();
        let settings = ProblemSettings::load(&path).unwrap();
        assert_eq!(settings.problem_name, "DA");
        assert_eq!(settings.time_limit(), Some(Duration::from_millis(2500)));
    }
}
