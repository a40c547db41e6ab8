//! Single-stand annual time stepping
//!
//! A stand is always in one of two macro-states:
//!
//! ```text
//!            no event                    event drawn
//!   GROWING ----------> GROWING   GROWING ----------> DISTURBED (one year)
//!      ^                                                   |
//!      +---------------- age reset to 0 -------------------+
//! ```
//!
//! Each year either a disturbance transition or a growth step is applied,
//! never both. The simulator borrows the validated parameters and owns the
//! evolving [`StandState`] exclusively for the duration of one run; the
//! trajectory it returns is the only record of that state.

use crate::core_types::{CarbonPools, StandState, Trajectory};
use crate::disturbance::{self, Disturbance, DisturbanceRegime, HarvestPolicy, UniformSource};
use crate::growth::{self, TurnoverSchedule};
use crate::parameters::GrowthParameters;
use serde::{Deserialize, Serialize};

/// Calendar year labelling trajectory entry `entry` of a run starting in `start_year`
///
/// Entry 0 is the year before the run. Saturates at the ends of the `i32` range;
/// validated scenarios never get there.
pub(crate) fn entry_year(start_year: i32, entry: usize) -> i32 {
    let entry = i64::try_from(entry).unwrap_or(i64::MAX);
    let year = i64::from(start_year).saturating_add(entry) - 1;
    year.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Everything recorded while simulating one stand
///
/// All series share one index: entry 0 is the initial condition, entry `k`
/// is the outcome of simulated year `k` (calendar year `start_year + k - 1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandRun {
    pub start_year: i32,
    pub trajectory: Trajectory,
    /// Event applied in each year; entry 0 is always `Disturbance::None`
    pub events: Vec<Disturbance>,
    /// Stem carbon removed by salvage harvest in each year (MgC/ha)
    pub harvested: Vec<f64>,
    /// Carbon respired or combusted in each year (MgC/ha)
    pub emitted: Vec<f64>,
}

impl StandRun {
    fn new(start_year: i32, initial: StandState, years: usize) -> Self {
        let mut events = Vec::with_capacity(years + 1);
        events.push(Disturbance::None);
        let mut harvested = Vec::with_capacity(years + 1);
        harvested.push(0.0);
        let mut emitted = Vec::with_capacity(years + 1);
        emitted.push(0.0);
        StandRun {
            start_year,
            trajectory: Trajectory::with_capacity(initial, years),
            events,
            harvested,
            emitted,
        }
    }

    fn record(&mut self, state: StandState, event: Disturbance, harvested: f64, emitted: f64) {
        self.trajectory.push(state);
        self.events.push(event);
        self.harvested.push(harvested);
        self.emitted.push(emitted);
    }

    /// Number of simulated years
    pub fn years(&self) -> usize {
        self.trajectory.years()
    }

    /// Final state of the stand
    pub fn last(&self) -> &StandState {
        let states = self.trajectory.states();
        &states[states.len() - 1]
    }

    pub fn fire_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_fire()).count()
    }

    /// Calendar year of the infestation, if one occurred
    pub fn infestation_year(&self) -> Option<i32> {
        self.events
            .iter()
            .position(|e| e.is_infestation())
            .map(|k| entry_year(self.start_year, k))
    }

    pub fn total_harvested(&self) -> f64 {
        self.harvested.iter().sum()
    }

    /// Calendar year of each entry, starting one year before the first simulated year
    pub fn calendar_years(&self) -> Vec<i32> {
        (0..self.trajectory.len())
            .map(|k| entry_year(self.start_year, k))
            .collect()
    }
}

/// Disturbances pinned to fixed simulation years
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisturbanceSchedule {
    /// `(year offset, event)` pairs; offset 0 is the first simulated year
    events: Vec<(usize, Disturbance)>,
}

impl DisturbanceSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event at a year offset, replacing any event already there
    pub fn with_event(mut self, offset: usize, event: Disturbance) -> Self {
        self.events.retain(|(o, _)| *o != offset);
        self.events.push((offset, event));
        self.events.sort_by_key(|(o, _)| *o);
        self
    }

    /// Fire at year 40, unharvested beetle kill at year 80 (of a 120-year run)
    pub fn reference_demo() -> Self {
        Self::new()
            .with_event(40, Disturbance::Fire)
            .with_event(80, Disturbance::UnharvestedInfestation)
    }

    pub fn event_at(&self, offset: usize) -> Disturbance {
        self.events
            .binary_search_by_key(&offset, |(o, _)| *o)
            .map_or(Disturbance::None, |i| self.events[i].1)
    }

    pub fn events(&self) -> &[(usize, Disturbance)] {
        &self.events
    }
}

/// Drives one replicate's year loop
#[derive(Debug, Clone, Copy)]
pub struct StandSimulator<'a> {
    params: &'a GrowthParameters,
    turnover: TurnoverSchedule,
    residual: f64,
    start_year: i32,
}

impl<'a> StandSimulator<'a> {
    /// Simulator with the reference turnover schedule and residual biomass,
    /// numbering years from 0
    pub fn new(params: &'a GrowthParameters) -> Self {
        StandSimulator {
            params,
            turnover: TurnoverSchedule::default(),
            residual: disturbance::DEFAULT_RESIDUAL,
            start_year: 0,
        }
    }

    pub fn with_turnover(mut self, turnover: TurnoverSchedule) -> Self {
        self.turnover = turnover;
        self
    }

    /// Live biomass left after a stand-replacing event (MgC/ha)
    pub fn with_residual(mut self, residual: f64) -> Self {
        self.residual = residual;
        self
    }

    /// Calendar year of the first simulated year
    pub fn starting_in(mut self, start_year: i32) -> Self {
        self.start_year = start_year;
        self
    }

    /// Stochastic run under a disturbance regime and harvest policy
    ///
    /// At most one infestation occurs per run.
    pub fn run_stochastic<S>(
        &self,
        initial: CarbonPools,
        years: usize,
        regime: &DisturbanceRegime,
        policy: HarvestPolicy,
        source: &mut S,
    ) -> StandRun
    where
        S: UniformSource + ?Sized,
    {
        self.run_with(initial, years, |year, _, state, infested| {
            regime.select(year, &state.pools, infested, policy, &mut *source)
        })
    }

    /// Growth only, no disturbance
    pub fn run_undisturbed(&self, initial: CarbonPools, years: usize) -> StandRun {
        self.run_with(initial, years, |_, _, _, _| Disturbance::None)
    }

    /// Deterministic run with events at fixed year offsets
    pub fn run_scheduled(
        &self,
        initial: CarbonPools,
        years: usize,
        schedule: &DisturbanceSchedule,
    ) -> StandRun {
        self.run_with(initial, years, |_, offset, _, _| schedule.event_at(offset))
    }

    /// Core year loop; `decide(calendar_year, offset, state, already_infested)`
    /// picks each year's event
    fn run_with<F>(&self, initial: CarbonPools, years: usize, mut decide: F) -> StandRun
    where
        F: FnMut(i32, usize, &StandState, bool) -> Disturbance,
    {
        let mut state = StandState::establish(initial);
        let mut run = StandRun::new(self.start_year, state, years);
        let mut infested = false;

        for offset in 0..years {
            let year = entry_year(self.start_year, offset + 1);
            let event = decide(year, offset, &state, infested);

            match disturbance::apply(event, &state, self.params, self.residual) {
                Some(outcome) => {
                    infested |= event.is_infestation();
                    state = outcome.state;
                    run.record(state, event, outcome.harvested, outcome.emitted);
                }
                None => {
                    let step = growth::grow(&state, self.params, &self.turnover);
                    state = step.state;
                    run.record(state, Disturbance::None, 0.0, step.fluxes.respired);
                }
            }
        }

        run
    }
}
