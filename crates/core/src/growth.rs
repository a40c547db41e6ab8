//! Annual stand growth (3-PG light-use-efficiency model)
//!
//! One call to [`grow`] advances an undisturbed stand by one year:
//!
//! 1. Leaf area from foliage carbon and specific leaf area
//! 2. Canopy interception by Beer's law
//! 3. Absorbed PAR from incident short-wave radiation
//! 4. Age modifier (Landsberg & Waring 1997, Eq. 3)
//! 5. Net annual carbon increment
//! 6. Allocation to foliage/stem/root and same-step turnover
//! 7. Detritus and soil transfers, heterotrophic respiration
//!
//! # Carbon flows
//!
//! ```text
//!             increment
//!                 |
//!      +----------+----------+
//!      v          v          v
//!  [FOLIAGE]   [STEM]     [ROOT]
//!      | litterfall | branchfall  | root turnover
//!      v     +------+------+      |
//!  [LITTER] <+ 0.9         0.1 -> [COARSE]
//!      |                      |   |
//!      +---------+------------+---+
//!                | × microbial efficiency   (remainder respired)
//!                v
//!             [SOIL] --- soil turnover ---> respired
//! ```
//!
//! Every transfer is internal except respiration, so a step satisfies
//! `total_after = total_before + increment - respired`.
//!
//! # References
//!
//! - Landsberg, J.J., Waring, R.H. (1997). Forest Ecology and Management, 95, 209-228.

use crate::core_types::{CarbonPools, Fraction, HalfLife, StandState};
use crate::error::{CarbonError, CarbonResult};
use crate::parameters::GrowthParameters;
use serde::{Deserialize, Serialize};

/// Specific leaf area conversion, m²/kg → ha/Mg on a carbon basis
const SLA_CONVERSION: f64 = 0.1;
/// kWh → MJ
const KWH_TO_MJ: f64 = 3.6;
/// Photosynthetically active share of short-wave radiation
const PAR_FRACTION: f64 = 0.45;
/// Universal canopy quantum efficiency (gC/MJ)
const QUANTUM_EFFICIENCY: f64 = 1.8;
/// Net share of gross daily assimilation retained after autotrophic respiration
const NET_ASSIMILATION_FRACTION: f64 = 0.45;
/// Days per year
const DAYS_PER_YEAR: f64 = 365.0;
/// gC/m² → MgC/ha
const G_M2_TO_MG_HA: f64 = 0.01;
/// Relative age at which the age modifier reaches one half
const AGE_MODIFIER_MIDPOINT: f64 = 0.95;

/// Split of the annual increment among the live pools
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Allocation {
    pub foliage: Fraction,
    pub stem: Fraction,
    pub root: Fraction,
}

impl Default for Allocation {
    fn default() -> Self {
        let third = Fraction::new(1.0 / 3.0);
        Allocation {
            foliage: third,
            stem: third,
            root: third,
        }
    }
}

/// Turnover and transfer rates applied during every growth step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurnoverSchedule {
    /// Share of foliage falling to litter each year
    pub litterfall: Fraction,
    /// Share of stem carbon shed as branches each year
    pub branchfall: Fraction,
    /// Share of branchfall entering coarse fuel (the rest joins litter)
    pub branch_to_coarse: Fraction,
    /// Share of root carbon turned over to soil each year
    pub root_turnover: Fraction,
    pub litter_half_life: HalfLife,
    pub coarse_half_life: HalfLife,
    pub soil_half_life: HalfLife,
    pub allocation: Allocation,
}

impl Default for TurnoverSchedule {
    fn default() -> Self {
        TurnoverSchedule {
            litterfall: Fraction::new(0.20),
            branchfall: Fraction::new(0.10),
            branch_to_coarse: Fraction::new(0.10),
            root_turnover: Fraction::new(0.25),
            litter_half_life: HalfLife::years(2.0),
            coarse_half_life: HalfLife::years(20.0),
            soil_half_life: HalfLife::years(10.0),
            allocation: Allocation::default(),
        }
    }
}

impl TurnoverSchedule {
    /// Allocation fractions must account for the whole increment
    pub fn validate(&self) -> CarbonResult<()> {
        let a = self.allocation;
        let sum = *a.foliage + *a.stem + *a.root;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(CarbonError::InvalidScenario(format!(
                "allocation fractions sum to {sum}, expected 1"
            )));
        }
        Ok(())
    }
}

/// Beer's law transmitted fraction, `exp(-k * LAI)`
#[inline]
pub fn beers_law_transmission(beers_k: f64, lai: f64) -> f64 {
    (-beers_k * lai).exp()
}

/// 3-PG age modifier, `1 / (1 + (age / age_max / 0.95)^n)`
///
/// Equals 1 at age 0 and decays toward 0 past `age_max`.
#[inline]
pub fn age_modifier(age: f64, age_max: f64, n_age: f64) -> f64 {
    let relative_age = age / age_max;
    1.0 / (1.0 + (relative_age / AGE_MODIFIER_MIDPOINT).powf(n_age))
}

/// Canopy state derived from foliage carbon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canopy {
    pub lai: f64,
    pub interception: f64,
}

impl Canopy {
    pub fn from_foliage(foliage: f64, params: &GrowthParameters) -> Self {
        let lai = foliage * (SLA_CONVERSION * params.sigma_f);
        Canopy {
            lai,
            interception: 1.0 - beers_law_transmission(params.beers_k, lai),
        }
    }
}

/// Net annual carbon increment (MgC/ha/yr) for a canopy at a given age
pub fn annual_increment(age: u32, canopy: Canopy, params: &GrowthParameters) -> f64 {
    let phi_s_mj = params.phi_s * KWH_TO_MJ;
    let absorbed_par = phi_s_mj * PAR_FRACTION * canopy.interception;
    let f_age = age_modifier(f64::from(age), params.age_max, params.n_age);
    let gross_daily = absorbed_par * QUANTUM_EFFICIENCY * params.f_dt * f_age;
    gross_daily * NET_ASSIMILATION_FRACTION * DAYS_PER_YEAR * G_M2_TO_MG_HA
}

/// Carbon moved during one growth step (MgC/ha)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GrowthFluxes {
    pub increment: f64,
    pub litterfall: f64,
    pub branchfall: f64,
    pub root_turnover: f64,
    pub litter_turnover: f64,
    pub coarse_turnover: f64,
    pub soil_turnover: f64,
    /// Carbon leaving the stand: unstabilized detritus plus soil turnover
    pub respired: f64,
}

impl GrowthFluxes {
    /// Change in total stand carbon implied by these fluxes
    pub fn net_change(&self) -> f64 {
        self.increment - self.respired
    }
}

/// Result of one growth year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthStep {
    pub state: StandState,
    pub fluxes: GrowthFluxes,
}

/// Advance an undisturbed stand by one year
///
/// The returned state is one year older. LAI and interception are the values
/// that drove this year's increment.
pub fn grow(
    current: &StandState,
    params: &GrowthParameters,
    turnover: &TurnoverSchedule,
) -> GrowthStep {
    let p = current.pools;
    let canopy = Canopy::from_foliage(p.foliage, params);
    let increment = annual_increment(current.age, canopy, params);

    let litterfall = p.foliage * turnover.litterfall;
    let branchfall = p.stem * turnover.branchfall;
    let root_turnover = p.root * turnover.root_turnover;
    let litter_turnover = p.litter * turnover.litter_half_life.annual_loss_fraction();
    let coarse_turnover = p.coarse * turnover.coarse_half_life.annual_loss_fraction();
    let soil_turnover = p.soil * turnover.soil_half_life.annual_loss_fraction();

    let detritus_to_soil = root_turnover + litter_turnover + coarse_turnover;
    let stabilized = detritus_to_soil * params.microbial_efficiency;
    let branch_coarse = branchfall * turnover.branch_to_coarse;
    let alloc = turnover.allocation;

    let pools = CarbonPools {
        foliage: p.foliage + increment * alloc.foliage - litterfall,
        stem: p.stem + increment * alloc.stem - branchfall,
        root: p.root + increment * alloc.root - root_turnover,
        litter: p.litter + litterfall + (branchfall - branch_coarse) - litter_turnover,
        coarse: p.coarse + branch_coarse - coarse_turnover,
        soil: p.soil + stabilized - soil_turnover,
    };

    GrowthStep {
        state: StandState {
            age: current.age + 1,
            pools,
            lai: canopy.lai,
            interception: canopy.interception,
        },
        fluxes: GrowthFluxes {
            increment,
            litterfall,
            branchfall,
            root_turnover,
            litter_turnover,
            coarse_turnover,
            soil_turnover,
            respired: (detritus_to_soil - stabilized) + soil_turnover,
        },
    }
}
