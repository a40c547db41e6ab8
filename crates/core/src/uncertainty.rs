//! Uncertainty bounds from repeated landscape comparisons
//!
//! A single landscape comparison is itself a random outcome. Repeating it
//! with independent master seeds gives a distribution of deficit and
//! cumulative-removal trajectories, summarized per year as a [`SeriesBand`].

use crate::comparison::LandscapeComparison;
use crate::error::{CarbonError, CarbonResult};
use crate::landscape::{run_landscape, ValidatedScenario};
use crate::parameters::GrowthParameters;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-year distribution summary across ensemble members
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesBand {
    pub mean: Vec<f64>,
    pub p05: Vec<f64>,
    pub median: Vec<f64>,
    pub p95: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl SeriesBand {
    /// Summarize equally long member series year by year
    pub fn from_members(members: &[&[f64]]) -> CarbonResult<Self> {
        let Some(first) = members.first() else {
            return Ok(Self::default());
        };
        let len = first.len();
        if members.iter().any(|m| m.len() != len) {
            return Err(CarbonError::InvalidScenario(
                "ensemble members have different lengths".into(),
            ));
        }

        let mut band = SeriesBand::default();
        let mut column = Vec::with_capacity(members.len());
        for k in 0..len {
            column.clear();
            column.extend(members.iter().map(|m| m[k]));
            column.sort_by(f64::total_cmp);

            band.mean.push(column.iter().sum::<f64>() / column.len() as f64);
            band.p05.push(percentile_sorted(&column, 5.0));
            band.median.push(percentile_sorted(&column, 50.0));
            band.p95.push(percentile_sorted(&column, 95.0));
            band.min.push(column[0]);
            band.max.push(column[column.len() - 1]);
        }
        Ok(band)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Linear-interpolated percentile of an ascending slice
pub fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

/// Derive an independent master seed for ensemble member `iteration`
pub fn derive_seed(base_seed: u64, iteration: u32) -> u64 {
    splitmix64(base_seed ^ (u64::from(iteration) << 32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Repeated landscape comparisons and their per-year bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyEnsemble {
    pub years: Vec<i32>,
    pub members: Vec<LandscapeComparison>,
    pub deficit: SeriesBand,
    pub cumulative_removed: SeriesBand,
}

impl UncertaintyEnsemble {
    /// Run `iterations` full landscape comparisons with independent seeds
    pub fn run(
        params: &GrowthParameters,
        scenario: &ValidatedScenario,
        iterations: u32,
    ) -> CarbonResult<Self> {
        if iterations == 0 {
            return Err(CarbonError::InvalidScenario(
                "uncertainty ensemble needs at least one iteration".into(),
            ));
        }

        let mut members = Vec::with_capacity(iterations as usize);
        for iteration in 0..iterations {
            info!(
                "Executing landscape analysis iteration {}/{}",
                iteration + 1,
                iterations
            );
            let member = scenario.reseeded(derive_seed(scenario.seed, iteration));
            members.push(run_landscape(params, &member).compare()?);
        }

        Self::from_members(members)
    }

    /// Summarize already computed comparisons
    pub fn from_members(members: Vec<LandscapeComparison>) -> CarbonResult<Self> {
        let years = members.first().map(|m| m.years.clone()).unwrap_or_default();
        if members.iter().any(|m| m.years != years) {
            return Err(CarbonError::InvalidScenario(
                "ensemble members cover different years".into(),
            ));
        }
        let deficits: Vec<&[f64]> = members.iter().map(|m| m.deficit.as_slice()).collect();
        let removed: Vec<&[f64]> = members
            .iter()
            .map(|m| m.cumulative_removed.as_slice())
            .collect();
        Ok(UncertaintyEnsemble {
            deficit: SeriesBand::from_members(&deficits)?,
            cumulative_removed: SeriesBand::from_members(&removed)?,
            years,
            members,
        })
    }

    pub fn iterations(&self) -> usize {
        self.members.len()
    }
}
