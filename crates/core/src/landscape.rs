//! Monte Carlo landscape aggregation
//!
//! A landscape is `N` independent replicate stands that share one initial
//! condition and one disturbance regime. For each harvest policy the
//! replicates are simulated independently (in parallel with rayon unless
//! disabled) and their pools are summed year by year, along with fire and
//! infestation counts and harvested carbon.
//!
//! # Randomness
//!
//! Replicate `i` under policy `p` draws from its own ChaCha8 stream,
//! `seed_from_u64(seed)` with stream `(p << 32) | i`. Replicates never share
//! a generator, so the result depends only on the seed and not on thread
//! scheduling. Validation caps the replicate count at `u32::MAX` so the
//! streams of the two policies cannot collide.
//!
//! # Reduction
//!
//! Replicate runs are collected in index order and summed sequentially, so
//! parallel and sequential execution produce bit-identical totals.

use crate::comparison::LandscapeComparison;
use crate::core_types::{CarbonPools, Trajectory};
use crate::disturbance::{
    DisturbanceRegime, FireRegime, HarvestPolicy, InfestationWindow, RngSource, DEFAULT_RESIDUAL,
};
use crate::error::{CarbonError, CarbonResult};
use crate::growth::TurnoverSchedule;
use crate::parameters::GrowthParameters;
use crate::stand::{entry_year, StandRun, StandSimulator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::{debug, info, warn};

/// Fire return intervals below this leave stands little time to recover
const MIN_REGROWTH_YEARS: f64 = 30.0;

/// Landscape scenario definition shared by both harvest policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Calendar year of the first simulated year
    pub start_year: i32,
    /// Number of simulated years
    pub years: usize,
    /// Replicate stands per policy
    pub replicates: usize,
    /// Master seed for every replicate stream
    pub seed: u64,
    /// Simulate replicates on the rayon thread pool
    pub parallel: bool,
    /// Live biomass left after a stand-replacing event (MgC/ha)
    pub residual: f64,
    pub infestation: InfestationWindow,
    pub fire: FireRegime,
    pub initial: CarbonPools,
    pub turnover: TurnoverSchedule,
}

impl ScenarioConfig {
    /// Reference landscape: 1000 stands, 1915-2114, beetle window 2005-2015
    pub fn reference() -> Self {
        ScenarioConfig {
            start_year: 1915,
            years: 200,
            replicates: 1000,
            seed: 0,
            parallel: true,
            residual: DEFAULT_RESIDUAL,
            infestation: InfestationWindow::reference(),
            fire: FireRegime::reference(),
            initial: CarbonPools::reference_initial(),
            turnover: TurnoverSchedule::default(),
        }
    }

    pub fn regime(&self) -> DisturbanceRegime {
        DisturbanceRegime {
            infestation: self.infestation,
            fire: self.fire,
        }
    }

    /// Check the scenario once, before any year is simulated
    pub fn validate(self) -> CarbonResult<ValidatedScenario> {
        if self.replicates == 0 {
            return Err(CarbonError::InvalidScenario(
                "replicate count must be at least 1".into(),
            ));
        }
        if u32::try_from(self.replicates).is_err() {
            return Err(CarbonError::InvalidScenario(format!(
                "replicate count {} exceeds {} (one random stream per replicate)",
                self.replicates,
                u32::MAX
            )));
        }
        let last_year = i32::try_from(self.years)
            .ok()
            .filter(|_| self.start_year > i32::MIN)
            .and_then(|years| self.start_year.checked_add(years))
            .and_then(|end| end.checked_sub(1))
            .ok_or_else(|| {
                CarbonError::InvalidScenario(format!(
                    "{} years from {} leaves the calendar year range",
                    self.years, self.start_year
                ))
            })?;
        if !self.residual.is_finite() || self.residual < 0.0 {
            return Err(CarbonError::InvalidScenario(format!(
                "residual biomass must be finite and non-negative, got {}",
                self.residual
            )));
        }
        if !self.initial.is_physical() {
            return Err(CarbonError::InvalidScenario(format!(
                "initial pools must be finite and non-negative: {:?}",
                self.initial
            )));
        }
        self.regime().validate()?;
        self.turnover.validate()?;

        if *self.infestation.annual_probability > 0.0
            && (self.infestation.end_year < self.start_year || self.infestation.start_year > last_year)
        {
            warn!(
                "Infestation window {}-{} lies outside simulated years {}-{}",
                self.infestation.start_year, self.infestation.end_year, self.start_year, last_year
            );
        }
        if self.fire.return_interval < MIN_REGROWTH_YEARS {
            warn!(
                "Fire return interval of {} years is shorter than stand regrowth ({} years)",
                self.fire.return_interval, MIN_REGROWTH_YEARS
            );
        }
        if self.replicates < 30 {
            warn!(
                "Only {} replicates per policy; landscape totals will be noisy",
                self.replicates
            );
        }

        Ok(ValidatedScenario(self))
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// A scenario that passed [`ScenarioConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedScenario(ScenarioConfig);

impl ValidatedScenario {
    pub fn config(&self) -> &ScenarioConfig {
        &self.0
    }

    /// Same scenario under a different master seed
    pub fn reseeded(&self, seed: u64) -> Self {
        ValidatedScenario(ScenarioConfig {
            seed,
            ..self.0.clone()
        })
    }

    /// Year axis: one label per trajectory entry, `start_year - 1 ..= start_year + years - 1`
    ///
    /// Entry 0 labels the initial condition (end of the year before the run).
    pub fn year_axis(&self) -> Vec<i32> {
        (0..=self.0.years)
            .map(|k| entry_year(self.0.start_year, k))
            .collect()
    }
}

impl Deref for ValidatedScenario {
    type Target = ScenarioConfig;
    fn deref(&self) -> &ScenarioConfig {
        &self.0
    }
}

/// Per-pool series summed across replicates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolSeries {
    pub foliage: Vec<f64>,
    pub stem: Vec<f64>,
    pub root: Vec<f64>,
    pub litter: Vec<f64>,
    pub coarse: Vec<f64>,
    pub soil: Vec<f64>,
}

impl PoolSeries {
    /// All-zero series of the given length
    pub fn zeros(len: usize) -> Self {
        PoolSeries {
            foliage: vec![0.0; len],
            stem: vec![0.0; len],
            root: vec![0.0; len],
            litter: vec![0.0; len],
            coarse: vec![0.0; len],
            soil: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.foliage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foliage.is_empty()
    }

    /// Add one replicate's trajectory, entry by entry
    pub fn accumulate(&mut self, trajectory: &Trajectory) {
        debug_assert_eq!(trajectory.len(), self.len());
        for (k, state) in trajectory.states().iter().enumerate() {
            let p = state.pools;
            self.foliage[k] += p.foliage;
            self.stem[k] += p.stem;
            self.root[k] += p.root;
            self.litter[k] += p.litter;
            self.coarse[k] += p.coarse;
            self.soil[k] += p.soil;
        }
    }

    /// Pools at one entry
    pub fn at(&self, index: usize) -> CarbonPools {
        CarbonPools {
            foliage: self.foliage[index],
            stem: self.stem[index],
            root: self.root[index],
            litter: self.litter[index],
            coarse: self.coarse[index],
            soil: self.soil[index],
        }
    }

    /// Sum of all pools per entry
    pub fn total(&self) -> Vec<f64> {
        (0..self.len()).map(|k| self.at(k).total()).collect()
    }
}

/// Landscape aggregates for one harvest policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub policy: HarvestPolicy,
    pub replicates: usize,
    /// Year label of each entry (see [`ValidatedScenario::year_axis`])
    pub years: Vec<i32>,
    pub pools: PoolSeries,
    /// Sum of all pools per entry (MgC)
    pub total_carbon: Vec<f64>,
    /// Replicates burned in each year
    pub fires: Vec<u32>,
    /// Replicates infested in each year
    pub infestations: Vec<u32>,
    /// Stem carbon removed by harvest in each year (MgC, zero without harvest)
    pub harvested: Vec<f64>,
    /// Carbon respired or combusted in each year (MgC)
    pub emitted: Vec<f64>,
}

impl ScenarioRun {
    fn empty(policy: HarvestPolicy, scenario: &ValidatedScenario) -> Self {
        let len = scenario.years + 1;
        ScenarioRun {
            policy,
            replicates: 0,
            years: scenario.year_axis(),
            pools: PoolSeries::zeros(len),
            total_carbon: Vec::new(),
            fires: vec![0; len],
            infestations: vec![0; len],
            harvested: vec![0.0; len],
            emitted: vec![0.0; len],
        }
    }

    /// Fold one replicate into the accumulators
    fn absorb(&mut self, run: &StandRun) {
        self.pools.accumulate(&run.trajectory);
        for (k, event) in run.events.iter().enumerate() {
            if event.is_fire() {
                self.fires[k] += 1;
            } else if event.is_infestation() {
                self.infestations[k] += 1;
            }
            self.harvested[k] += run.harvested[k];
            self.emitted[k] += run.emitted[k];
        }
        self.replicates += 1;
    }

    pub fn total_fires(&self) -> u32 {
        self.fires.iter().sum()
    }

    pub fn total_infestations(&self) -> u32 {
        self.infestations.iter().sum()
    }

    pub fn total_harvested(&self) -> f64 {
        self.harvested.iter().sum()
    }
}

/// Both policies' runs for one landscape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeRun {
    pub no_harvest: ScenarioRun,
    pub harvest: ScenarioRun,
}

impl LandscapeRun {
    /// Carbon deficit and cumulative removals between the two policies
    pub fn compare(&self) -> CarbonResult<LandscapeComparison> {
        LandscapeComparison::compare(&self.no_harvest, &self.harvest)
    }
}

/// Random stream of one replicate
fn replicate_rng(seed: u64, policy: HarvestPolicy, replicate: usize) -> ChaCha8Rng {
    let policy_id: u64 = match policy {
        HarvestPolicy::NoHarvest => 0,
        HarvestPolicy::HarvestOnInfestation => 1,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream((policy_id << 32) | replicate as u64);
    rng
}

/// Simulate every replicate under one policy and sum the results
pub fn run_scenario(
    params: &GrowthParameters,
    scenario: &ValidatedScenario,
    policy: HarvestPolicy,
) -> ScenarioRun {
    info!(
        "Simulating {} replicates x {} years under {} (seed={}, parallel={})",
        scenario.replicates,
        scenario.years,
        policy.label(),
        scenario.seed,
        scenario.parallel
    );

    let simulator = StandSimulator::new(params)
        .with_turnover(scenario.turnover)
        .with_residual(scenario.residual)
        .starting_in(scenario.start_year);
    let regime = scenario.regime();

    let simulate = |replicate: usize| -> StandRun {
        let mut source = RngSource::new(replicate_rng(scenario.seed, policy, replicate));
        simulator.run_stochastic(
            scenario.initial,
            scenario.years,
            &regime,
            policy,
            &mut source,
        )
    };

    let runs: Vec<StandRun> = if scenario.parallel {
        (0..scenario.replicates).into_par_iter().map(simulate).collect()
    } else {
        (0..scenario.replicates).map(simulate).collect()
    };

    let mut aggregate = ScenarioRun::empty(policy, scenario);
    for run in &runs {
        aggregate.absorb(run);
    }
    aggregate.total_carbon = aggregate.pools.total();

    debug!(
        "{}: {} fires, {} infestations, {:.2} MgC harvested",
        policy.label(),
        aggregate.total_fires(),
        aggregate.total_infestations(),
        aggregate.total_harvested()
    );

    aggregate
}

/// Run both policies over the same scenario
pub fn run_landscape(params: &GrowthParameters, scenario: &ValidatedScenario) -> LandscapeRun {
    LandscapeRun {
        no_harvest: run_scenario(params, scenario, HarvestPolicy::NoHarvest),
        harvest: run_scenario(params, scenario, HarvestPolicy::HarvestOnInfestation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_scenario() -> ScenarioConfig {
        ScenarioConfig {
            start_year: 2000,
            years: 40,
            replicates: 24,
            seed: 11,
            infestation: InfestationWindow::from_cumulative(2010, 2020, 0.8).unwrap(),
            ..ScenarioConfig::reference()
        }
    }

    #[test]
    fn test_validation_rejects_zero_replicates() {
        let config = ScenarioConfig {
            replicates: 0,
            ..small_scenario()
        };
        assert!(matches!(
            config.validate(),
            Err(CarbonError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_validation_rejects_years_past_calendar_range() {
        let late = ScenarioConfig {
            start_year: i32::MAX - 10,
            years: 50,
            replicates: 1,
            ..small_scenario()
        };
        assert!(matches!(late.validate(), Err(CarbonError::InvalidScenario(_))));

        let earliest = ScenarioConfig {
            start_year: i32::MIN,
            ..small_scenario()
        };
        assert!(matches!(
            earliest.validate(),
            Err(CarbonError::InvalidScenario(_))
        ));

        let last_fitting = ScenarioConfig {
            start_year: i32::MAX - 49,
            years: 50,
            ..small_scenario()
        }
        .validate()
        .unwrap();
        assert_eq!(last_fitting.year_axis().last(), Some(&i32::MAX));
    }

    #[test]
    fn test_validation_rejects_replicates_beyond_stream_space() {
        if let Ok(too_many) = usize::try_from(1_u64 << 32) {
            let config = ScenarioConfig {
                replicates: too_many,
                ..small_scenario()
            };
            assert!(matches!(
                config.validate(),
                Err(CarbonError::InvalidScenario(_))
            ));
        }
    }

    #[test]
    fn test_validation_rejects_negative_initial_pool() {
        let config = ScenarioConfig {
            initial: CarbonPools {
                soil: -1.0,
                ..CarbonPools::reference_initial()
            },
            ..small_scenario()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_year_axis_covers_initial_entry() {
        let scenario = small_scenario().validate().unwrap();
        let axis = scenario.year_axis();
        assert_eq!(axis.len(), 41);
        assert_eq!(axis[0], 1999);
        assert_eq!(axis[40], 2039);
    }

    #[test]
    fn test_replicate_streams_differ() {
        use rand::Rng;
        let mut a = replicate_rng(5, HarvestPolicy::NoHarvest, 0);
        let mut b = replicate_rng(5, HarvestPolicy::NoHarvest, 1);
        let mut c = replicate_rng(5, HarvestPolicy::HarvestOnInfestation, 0);
        let first = a.random::<u64>();
        assert_ne!(first, b.random::<u64>());
        assert_ne!(first, c.random::<u64>());
    }

    #[test]
    fn test_parallel_matches_sequential_bit_for_bit() {
        let params = GrowthParameters::reference();
        let parallel = ScenarioConfig {
            parallel: true,
            ..small_scenario()
        }
        .validate()
        .unwrap();
        let sequential = ScenarioConfig {
            parallel: false,
            ..small_scenario()
        }
        .validate()
        .unwrap();

        for policy in HarvestPolicy::BOTH {
            let a = run_scenario(&params, &parallel, policy);
            let b = run_scenario(&params, &sequential, policy);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_initial_entry_is_replicates_times_initial_pools() {
        let params = GrowthParameters::reference();
        let scenario = small_scenario().validate().unwrap();
        let run = run_scenario(&params, &scenario, HarvestPolicy::NoHarvest);
        assert_eq!(run.replicates, 24);
        assert_relative_eq!(
            run.total_carbon[0],
            24.0 * CarbonPools::reference_initial().total(),
            epsilon = 1e-9
        );
        assert_eq!(run.fires[0], 0);
        assert_eq!(run.infestations[0], 0);
    }

    #[test]
    fn test_no_harvest_policy_never_removes_carbon() {
        let params = GrowthParameters::reference();
        let scenario = small_scenario().validate().unwrap();
        let run = run_scenario(&params, &scenario, HarvestPolicy::NoHarvest);
        assert!(run.harvested.iter().all(|h| *h == 0.0));
    }

    #[test]
    fn test_each_replicate_infested_at_most_once() {
        let params = GrowthParameters::reference();
        let scenario = small_scenario().validate().unwrap();
        let run = run_scenario(&params, &scenario, HarvestPolicy::HarvestOnInfestation);
        assert!(run.total_infestations() as usize <= run.replicates);
        // Infestations only inside the window (entry k is calendar year 1999 + k)
        for (k, count) in run.infestations.iter().enumerate() {
            let year = run.years[k];
            if *count > 0 {
                assert!((2010..=2020).contains(&year), "infestation in {year}");
            }
        }
    }
}
