//! Harvest vs. no-harvest landscape comparison
//!
//! The carbon deficit of salvage harvesting is the landscape carbon the
//! baseline holds that the harvested landscape does not:
//!
//! ```text
//! deficit(t)           = total_no_harvest(t) - total_harvest(t)
//! cumulative_removed(t) = Σ_{k ≤ t} harvested(k)
//! ```
//!
//! Both series share the year axis of the scenario runs and are the flux
//! series handed to downstream life-cycle accounting.

use crate::error::{CarbonError, CarbonResult};
use crate::landscape::ScenarioRun;
use serde::{Deserialize, Serialize};

/// Year-by-year difference between two scenario runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeComparison {
    pub years: Vec<i32>,
    /// No-harvest total minus harvest total (MgC)
    pub deficit: Vec<f64>,
    /// Running sum of harvested carbon (MgC)
    pub cumulative_removed: Vec<f64>,
}

impl LandscapeComparison {
    /// Compare a baseline run against a harvest run on the same year axis
    pub fn compare(no_harvest: &ScenarioRun, harvest: &ScenarioRun) -> CarbonResult<Self> {
        if no_harvest.years != harvest.years {
            return Err(CarbonError::InvalidScenario(format!(
                "scenario runs cover different years ({} vs {} entries)",
                no_harvest.years.len(),
                harvest.years.len()
            )));
        }
        Self::from_series(
            no_harvest.years.clone(),
            &no_harvest.total_carbon,
            &harvest.total_carbon,
            &harvest.harvested,
        )
    }

    /// Build a comparison from raw total-carbon and harvested series
    pub fn from_series(
        years: Vec<i32>,
        no_harvest_total: &[f64],
        harvest_total: &[f64],
        harvested: &[f64],
    ) -> CarbonResult<Self> {
        let len = years.len();
        if no_harvest_total.len() != len || harvest_total.len() != len || harvested.len() != len {
            return Err(CarbonError::InvalidScenario(format!(
                "series lengths differ: years={}, no_harvest={}, harvest={}, harvested={}",
                len,
                no_harvest_total.len(),
                harvest_total.len(),
                harvested.len()
            )));
        }

        let deficit = no_harvest_total
            .iter()
            .zip(harvest_total)
            .map(|(base, managed)| base - managed)
            .collect();

        let cumulative_removed = harvested
            .iter()
            .scan(0.0, |running, h| {
                *running += h;
                Some(*running)
            })
            .collect();

        Ok(LandscapeComparison {
            years,
            deficit,
            cumulative_removed,
        })
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// The per-year deficit series
    pub fn running_deficit(&self) -> &[f64] {
        &self.deficit
    }

    /// Trapezoidal integral of the deficit over the year axis (MgC·yr)
    pub fn integrated_deficit(&self) -> f64 {
        self.years
            .windows(2)
            .zip(self.deficit.windows(2))
            .map(|(y, d)| 0.5 * (d[0] + d[1]) * f64::from(y[1] - y[0]))
            .sum()
    }

    /// Deficit in the last year
    pub fn final_deficit(&self) -> Option<f64> {
        self.deficit.last().copied()
    }

    /// Total harvested carbon over the run
    pub fn total_removed(&self) -> f64 {
        self.cumulative_removed.last().copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> LandscapeComparison {
        LandscapeComparison::from_series(
            vec![2000, 2001, 2002, 2003],
            &[10.0, 12.0, 15.0, 20.0],
            &[10.0, 11.0, 9.0, 14.0],
            &[0.0, 0.5, 3.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_deficit_is_baseline_minus_harvest() {
        let c = sample();
        assert_eq!(c.deficit, vec![0.0, 1.0, 6.0, 6.0]);
        assert_eq!(c.running_deficit(), &[0.0, 1.0, 6.0, 6.0]);
        assert_eq!(c.final_deficit(), Some(6.0));
    }

    #[test]
    fn test_cumulative_removed_is_running_sum_from_zero() {
        let c = sample();
        assert_eq!(c.cumulative_removed, vec![0.0, 0.5, 3.5, 3.5]);
        assert_eq!(c.total_removed(), 3.5);
    }

    #[test]
    fn test_integrated_deficit_trapezoid() {
        // (0+1)/2 + (1+6)/2 + (6+6)/2
        assert_relative_eq!(sample().integrated_deficit(), 0.5 + 3.5 + 6.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result =
            LandscapeComparison::from_series(vec![0, 1], &[1.0, 2.0], &[1.0], &[0.0, 0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_series() {
        let c = LandscapeComparison::from_series(Vec::new(), &[], &[], &[]).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.integrated_deficit(), 0.0);
        assert_eq!(c.total_removed(), 0.0);
        assert_eq!(c.final_deficit(), None);
    }
}
