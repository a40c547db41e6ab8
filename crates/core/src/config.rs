//! TOML configuration for a complete landscape analysis
//!
//! Every section is optional and falls back to the reference setup:
//!
//! ```toml
//! [parameters]
//! age_max = 150
//! microbial_efficiency = 0.25
//!
//! [scenario]
//! start_year = 1915
//! years = 200
//! replicates = 1000
//! seed = 7
//!
//! [scenario.infestation]
//! start_year = 2005
//! end_year = 2015
//! cumulative_probability = 0.8
//!
//! [scenario.fire]
//! return_interval = 200
//!
//! [turnover]
//! litterfall = 0.2
//! ```
//!
//! Parameters not named in `[parameters]` keep their reference values;
//! unknown parameter names are rejected.

use crate::core_types::{CarbonPools, Fraction};
use crate::disturbance::{FireRegime, InfestationWindow, DEFAULT_RESIDUAL};
use crate::error::{CarbonError, CarbonResult};
use crate::growth::TurnoverSchedule;
use crate::landscape::{ScenarioConfig, ValidatedScenario};
use crate::parameters::{GrowthParameters, ParameterSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Infestation window as written in configuration
///
/// Give either `cumulative_probability` (spread over the window) or
/// `annual_probability`, not both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfestationSection {
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_probability: Option<f64>,
}

impl Default for InfestationSection {
    fn default() -> Self {
        InfestationSection {
            start_year: 2005,
            end_year: 2015,
            cumulative_probability: Some(0.8),
            annual_probability: None,
        }
    }
}

impl InfestationSection {
    fn window(&self) -> CarbonResult<InfestationWindow> {
        match (self.cumulative_probability, self.annual_probability) {
            (Some(_), Some(_)) => Err(CarbonError::Config(
                "give either cumulative_probability or annual_probability, not both".into(),
            )),
            (Some(cumulative), None) => {
                InfestationWindow::from_cumulative(self.start_year, self.end_year, cumulative)
            }
            (None, annual) => {
                let annual = annual.unwrap_or(0.0);
                let annual_probability = Fraction::try_new(annual).ok_or_else(|| {
                    CarbonError::InvalidScenario(format!(
                        "annual infestation probability {annual} not in [0, 1]"
                    ))
                })?;
                let window = InfestationWindow {
                    start_year: self.start_year,
                    end_year: self.end_year,
                    annual_probability,
                };
                window.validate()?;
                Ok(window)
            }
        }
    }
}

/// `[scenario]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioSection {
    pub start_year: i32,
    pub years: usize,
    pub replicates: usize,
    pub seed: u64,
    pub parallel: bool,
    pub residual: f64,
    pub infestation: InfestationSection,
    pub fire: FireRegime,
    #[serde(default = "CarbonPools::reference_initial")]
    pub initial: CarbonPools,
}

impl Default for ScenarioSection {
    fn default() -> Self {
        let reference = ScenarioConfig::reference();
        ScenarioSection {
            start_year: reference.start_year,
            years: reference.years,
            replicates: reference.replicates,
            seed: reference.seed,
            parallel: reference.parallel,
            residual: DEFAULT_RESIDUAL,
            infestation: InfestationSection::default(),
            fire: reference.fire,
            initial: reference.initial,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Overrides of the reference parameter values, by name
    pub parameters: BTreeMap<String, f64>,
    pub scenario: ScenarioSection,
    pub turnover: TurnoverSchedule,
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> CarbonResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> CarbonResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| CarbonError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reference parameter set with this file's overrides applied
    pub fn parameter_set(&self) -> CarbonResult<ParameterSet> {
        let mut set = ParameterSet::reference();
        for (name, value) in &self.parameters {
            set.set_by_name(name, *value)?;
        }
        Ok(set)
    }

    /// Scenario definition, not yet validated
    pub fn scenario_config(&self) -> CarbonResult<ScenarioConfig> {
        let s = &self.scenario;
        Ok(ScenarioConfig {
            start_year: s.start_year,
            years: s.years,
            replicates: s.replicates,
            seed: s.seed,
            parallel: s.parallel,
            residual: s.residual,
            infestation: s.infestation.window()?,
            fire: s.fire,
            initial: s.initial,
            turnover: self.turnover,
        })
    }

    /// Validate everything before any simulation starts
    pub fn validate(&self) -> CarbonResult<(GrowthParameters, ValidatedScenario)> {
        let params = self.parameter_set()?.validate()?;
        let scenario = self.scenario_config()?.validate()?;
        Ok((params, scenario))
    }
}
