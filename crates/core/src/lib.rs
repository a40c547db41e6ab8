//! Forest Carbon Core Library
//!
//! Stochastic simulation of forest carbon pools under fire and insect
//! disturbance, built to estimate the carbon cost of salvage harvesting
//! after an infestation.
//!
//! ## Layers
//!
//! - Stand growth: a 3-PG style light-use-efficiency model moves carbon
//!   through six pools (foliage, stem, root, litter, coarse fuel, soil)
//! - Disturbance: fire probability scales with surface fuel; infestation
//!   strikes at most once per stand inside a calendar window
//! - Landscape: N replicate stands per harvest policy, simulated in
//!   parallel with independent random streams and summed year by year
//! - Comparison: carbon deficit of harvesting and cumulative removed
//!   carbon, optionally repeated over an uncertainty ensemble
//!
//! All validation happens up front; the year loop itself cannot fail.

// Core types and utilities
pub mod core_types;
pub mod error;
pub mod parameters;

// Stand dynamics
pub mod disturbance;
pub mod growth;
pub mod stand;

// Landscape analysis
pub mod comparison;
pub mod config;
pub mod landscape;
pub mod uncertainty;

// Re-export core types
pub use core_types::{CarbonPools, Fraction, HalfLife, StandState, Trajectory};
pub use error::{CarbonError, CarbonResult};
pub use parameters::{GrowthParameters, Parameter, ParameterKey, ParameterSet};

// Re-export stand dynamics
pub use disturbance::{
    Disturbance, DisturbanceOutcome, DisturbanceRegime, FireRegime, HarvestPolicy,
    InfestationWindow, RngSource, ScriptedSource, UniformSource,
};
pub use growth::{GrowthFluxes, GrowthStep, TurnoverSchedule};
pub use stand::{DisturbanceSchedule, StandRun, StandSimulator};

// Re-export landscape analysis
pub use comparison::LandscapeComparison;
pub use config::SimulationConfig;
pub use landscape::{
    run_landscape, run_scenario, LandscapeRun, PoolSeries, ScenarioConfig, ScenarioRun,
    ValidatedScenario,
};
pub use uncertainty::{SeriesBand, UncertaintyEnsemble};
