//! Carbon bookkeeping over long stand runs
//!
//! Growth changes total stand carbon by exactly the increment minus what is
//! respired; disturbances change it by exactly seeded minus emitted minus
//! harvested. Pools never go negative.

use approx::assert_relative_eq;
use forest_carbon_core::disturbance::{self, DEFAULT_RESIDUAL};
use forest_carbon_core::growth::{self, TurnoverSchedule};
use forest_carbon_core::{
    CarbonPools, Disturbance, DisturbanceRegime, FireRegime, GrowthParameters, HarvestPolicy,
    InfestationWindow, ParameterKey, ParameterSet, RngSource, StandSimulator, StandState,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const TOLERANCE: f64 = 1e-9;

#[test]
fn test_growth_conserves_carbon_for_three_centuries() {
    let params = GrowthParameters::reference();
    let turnover = TurnoverSchedule::default();
    let mut state = StandState::establish(CarbonPools::reference_initial());

    for year in 0..300 {
        let before = state.pools.total();
        let step = growth::grow(&state, &params, &turnover);
        let after = step.state.pools.total();
        let f = step.fluxes;

        assert!(f.increment >= 0.0, "negative increment in year {year}");
        assert_relative_eq!(
            after - before,
            f.increment - f.respired,
            epsilon = TOLERANCE,
            max_relative = 1e-12
        );
        assert_relative_eq!(after - before, f.net_change(), epsilon = TOLERANCE);
        state = step.state;
    }

    assert_eq!(state.age, 300);
    assert!(state.pools.is_physical());
}

#[test]
fn test_full_microbial_efficiency_respires_only_soil() {
    let mut set = ParameterSet::reference();
    set.set(ParameterKey::MicrobialEfficiency, 1.0);
    let params = set.validate().unwrap();
    let turnover = TurnoverSchedule::default();
    let mut state = StandState::establish(CarbonPools::reference_initial());

    for _ in 0..50 {
        let step = growth::grow(&state, &params, &turnover);
        assert_relative_eq!(
            step.fluxes.respired,
            step.fluxes.soil_turnover,
            epsilon = TOLERANCE
        );
        state = step.state;
    }
}

#[test]
fn test_every_disturbance_conserves_carbon_at_any_age() {
    let params = GrowthParameters::reference();
    let run = StandSimulator::new(&params).run_undisturbed(CarbonPools::reference_initial(), 150);

    let events = [
        Disturbance::Fire,
        Disturbance::UnharvestedInfestation,
        Disturbance::HarvestedInfestation,
    ];
    for state in run.trajectory.states().iter().step_by(10) {
        for event in events {
            let outcome = disturbance::apply(event, state, &params, DEFAULT_RESIDUAL).unwrap();
            let change = outcome.state.pools.total() - state.pools.total();
            assert_relative_eq!(change, outcome.net_change(), epsilon = TOLERANCE);
            assert!(outcome.emitted >= 0.0);
            assert!(outcome.harvested >= 0.0);
            assert_eq!(outcome.state.age, 0);
            assert!(outcome.state.pools.is_physical());
        }
    }
}

#[test]
fn test_only_harvested_infestation_removes_carbon() {
    let params = GrowthParameters::reference();
    let run = StandSimulator::new(&params).run_undisturbed(CarbonPools::reference_initial(), 60);
    let mature = run.last();

    let harvested = disturbance::harvested_infestation(mature, &params, DEFAULT_RESIDUAL);
    let left = disturbance::unharvested_infestation(mature, &params, DEFAULT_RESIDUAL);
    let burned = disturbance::fire(mature, &params, DEFAULT_RESIDUAL);

    assert_relative_eq!(harvested.harvested, mature.pools.stem);
    assert_eq!(left.harvested, 0.0);
    assert_eq!(burned.harvested, 0.0);
    assert_relative_eq!(
        left.state.pools.total() - harvested.state.pools.total(),
        mature.pools.stem,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_pools_stay_non_negative_under_frequent_disturbance() {
    let params = GrowthParameters::reference();
    let regime = DisturbanceRegime {
        infestation: InfestationWindow::from_cumulative(50, 250, 0.9).unwrap(),
        fire: FireRegime {
            return_interval: 10.0,
            fuel_threshold: 2.0,
            ..FireRegime::reference()
        },
    };
    let simulator = StandSimulator::new(&params);

    for seed in 0..20_u64 {
        for policy in HarvestPolicy::BOTH {
            let mut source = RngSource::new(ChaCha8Rng::seed_from_u64(seed));
            let run = simulator.run_stochastic(
                CarbonPools::reference_initial(),
                300,
                &regime,
                policy,
                &mut source,
            );
            assert_eq!(run.trajectory.len(), 301);
            for (k, state) in run.trajectory.states().iter().enumerate() {
                assert!(
                    state.pools.is_physical(),
                    "seed {seed} {policy:?}: negative pool at entry {k}: {:?}",
                    state.pools
                );
            }
            assert!(run.harvested.iter().all(|h| *h >= 0.0));
            assert!(run.emitted.iter().all(|e| *e >= 0.0));
        }
    }
}
