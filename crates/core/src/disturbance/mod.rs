//! Stand-replacing disturbances and their carbon transfers
//!
//! A disturbance year replaces growth entirely: the stand is reset to age
//! zero with a small residual of live biomass, and the carbon that was
//! standing before the reset is routed according to the event type.
//!
//! | pool before reset | Fire | Unharvested infestation | Harvested infestation |
//! |-------------------|------|-------------------------|-----------------------|
//! | foliage | combusted | → litter | → litter |
//! | stem | combusted | → coarse fuel | removed as harvest |
//! | root | → soil × efficiency | → soil × efficiency | → soil × efficiency |
//! | litter | combusted, reset to residual | kept | kept |
//! | coarse fuel | combusted, reset to residual | kept | kept |
//! | soil | kept | kept | kept |
//!
//! LAI and interception are zeroed; they are only recomputed by growth.

pub mod draw;
pub mod regime;

pub use draw::{RngSource, ScriptedSource, UniformSource};
pub use regime::{DisturbanceRegime, FireRegime, InfestationWindow};

use crate::core_types::{CarbonPools, StandState};
use crate::parameters::GrowthParameters;
use serde::{Deserialize, Serialize};

/// Live biomass left on site after any stand-replacing event (MgC/ha)
pub const DEFAULT_RESIDUAL: f64 = 0.1;

/// Management response to an insect infestation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestPolicy {
    /// Killed stands are left standing
    NoHarvest,
    /// Killed stems are salvage-harvested and leave the landscape
    HarvestOnInfestation,
}

impl HarvestPolicy {
    /// Both policies, baseline first
    pub const BOTH: [HarvestPolicy; 2] = [HarvestPolicy::NoHarvest, HarvestPolicy::HarvestOnInfestation];

    /// The infestation variant this policy produces
    #[inline]
    pub fn infestation(self) -> Disturbance {
        match self {
            HarvestPolicy::NoHarvest => Disturbance::UnharvestedInfestation,
            HarvestPolicy::HarvestOnInfestation => Disturbance::HarvestedInfestation,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HarvestPolicy::NoHarvest => "no harvest",
            HarvestPolicy::HarvestOnInfestation => "post-infestation harvest",
        }
    }
}

/// Event occurring in one simulated year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Disturbance {
    #[default]
    None,
    Fire,
    UnharvestedInfestation,
    HarvestedInfestation,
}

impl Disturbance {
    #[inline]
    pub fn is_infestation(self) -> bool {
        matches!(
            self,
            Disturbance::UnharvestedInfestation | Disturbance::HarvestedInfestation
        )
    }

    #[inline]
    pub fn is_fire(self) -> bool {
        self == Disturbance::Fire
    }
}

/// Where the carbon went in a disturbance year (MgC/ha)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceOutcome {
    pub event: Disturbance,
    pub state: StandState,
    /// Stem carbon removed by salvage harvest
    pub harvested: f64,
    /// Carbon released on site: combustion plus unstabilized root carbon
    pub emitted: f64,
    /// Residual biomass introduced by the reset
    pub seeded: f64,
}

impl DisturbanceOutcome {
    /// Change in total stand carbon implied by this outcome
    pub fn net_change(&self) -> f64 {
        self.seeded - self.emitted - self.harvested
    }
}

/// Stand-replacing fire
///
/// Everything above ground burns. Root carbon enters soil after the
/// microbial-efficiency discount; litter and coarse fuel restart at the residual.
pub fn fire(current: &StandState, params: &GrowthParameters, residual: f64) -> DisturbanceOutcome {
    let p = current.pools;
    let stabilized = p.root * params.microbial_efficiency;
    let pools = CarbonPools {
        foliage: residual,
        stem: residual,
        root: residual,
        litter: residual,
        coarse: residual,
        soil: p.soil + stabilized,
    };
    DisturbanceOutcome {
        event: Disturbance::Fire,
        state: StandState::establish(pools),
        harvested: 0.0,
        emitted: p.foliage + p.stem + p.litter + p.coarse + (p.root - stabilized),
        seeded: 5.0 * residual,
    }
}

/// Insect kill with the dead stand left on site
///
/// Foliage drops to litter, stems become coarse fuel, roots feed soil.
pub fn unharvested_infestation(
    current: &StandState,
    params: &GrowthParameters,
    residual: f64,
) -> DisturbanceOutcome {
    let p = current.pools;
    let stabilized = p.root * params.microbial_efficiency;
    let pools = CarbonPools {
        foliage: residual,
        stem: residual,
        root: residual,
        litter: p.litter + p.foliage,
        coarse: p.coarse + p.stem,
        soil: p.soil + stabilized,
    };
    DisturbanceOutcome {
        event: Disturbance::UnharvestedInfestation,
        state: StandState::establish(pools),
        harvested: 0.0,
        emitted: p.root - stabilized,
        seeded: 3.0 * residual,
    }
}

/// Insect kill followed by salvage harvest
///
/// As [`unharvested_infestation`], except stem carbon leaves the landscape and
/// is reported in [`DisturbanceOutcome::harvested`].
pub fn harvested_infestation(
    current: &StandState,
    params: &GrowthParameters,
    residual: f64,
) -> DisturbanceOutcome {
    let p = current.pools;
    let stabilized = p.root * params.microbial_efficiency;
    let pools = CarbonPools {
        foliage: residual,
        stem: residual,
        root: residual,
        litter: p.litter + p.foliage,
        coarse: p.coarse,
        soil: p.soil + stabilized,
    };
    DisturbanceOutcome {
        event: Disturbance::HarvestedInfestation,
        state: StandState::establish(pools),
        harvested: p.stem,
        emitted: p.root - stabilized,
        seeded: 3.0 * residual,
    }
}

/// Apply an event's transition, or `None` for a growth year
pub fn apply(
    event: Disturbance,
    current: &StandState,
    params: &GrowthParameters,
    residual: f64,
) -> Option<DisturbanceOutcome> {
    match event {
        Disturbance::None => None,
        Disturbance::Fire => Some(fire(current, params, residual)),
        Disturbance::UnharvestedInfestation => {
            Some(unharvested_infestation(current, params, residual))
        }
        Disturbance::HarvestedInfestation => Some(harvested_infestation(current, params, residual)),
    }
}
