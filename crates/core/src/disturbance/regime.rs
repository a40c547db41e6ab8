//! Disturbance regime: when infestations and fires happen
//!
//! # Event selection
//!
//! Each simulated year at most one event fires, checked in this order:
//!
//! 1. **Infestation** - only inside the configured year window, only if the
//!    replicate has not been infested before, with a fixed annual probability.
//!    The reference regime spreads a cumulative 0.8 probability evenly over the
//!    window, `p = 0.8 / (end - start)`.
//! 2. **Fire** - every other year, with probability proportional to surface fuel
//!    and inversely proportional to the fire-return interval:
//!
//!    ```text
//!    p_fire = (1 / return_interval) * (litter * litter_weight + coarse) / fuel_threshold
//!    ```
//!
//!    Fire risk therefore rises as fuel accumulates after a disturbance.

use super::draw::UniformSource;
use super::{Disturbance, HarvestPolicy};
use crate::core_types::{CarbonPools, Fraction};
use crate::error::{CarbonError, CarbonResult};
use serde::{Deserialize, Serialize};

/// Calendar window during which an infestation may strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfestationWindow {
    /// First calendar year (inclusive)
    pub start_year: i32,
    /// Last calendar year (inclusive)
    pub end_year: i32,
    /// Probability of infestation in any single year of the window
    pub annual_probability: Fraction,
}

impl InfestationWindow {
    /// Spread a cumulative probability evenly across the window
    ///
    /// The per-year probability is `cumulative / (end - start)`; a single-year
    /// window receives the whole cumulative probability. Fails when the result
    /// exceeds 1.
    pub fn from_cumulative(start_year: i32, end_year: i32, cumulative: f64) -> CarbonResult<Self> {
        if end_year < start_year {
            return Err(CarbonError::InvalidScenario(format!(
                "infestation window ends ({end_year}) before it starts ({start_year})"
            )));
        }
        let span = f64::from((end_year - start_year).max(1));
        let annual = cumulative / span;
        let annual_probability = Fraction::try_new(annual).ok_or_else(|| {
            CarbonError::InvalidScenario(format!(
                "annual infestation probability {annual} not in [0, 1]"
            ))
        })?;
        Ok(InfestationWindow {
            start_year,
            end_year,
            annual_probability,
        })
    }

    /// Reference window: 2005-2015 with a cumulative probability of 0.8
    pub fn reference() -> Self {
        InfestationWindow {
            start_year: 2005,
            end_year: 2015,
            annual_probability: Fraction::new(0.08),
        }
    }

    /// A window that never fires
    pub fn none() -> Self {
        InfestationWindow {
            start_year: 0,
            end_year: 0,
            annual_probability: Fraction::ZERO,
        }
    }

    #[inline]
    pub fn contains(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    pub fn validate(&self) -> CarbonResult<()> {
        if self.end_year < self.start_year {
            return Err(CarbonError::InvalidScenario(format!(
                "infestation window ends ({}) before it starts ({})",
                self.end_year, self.start_year
            )));
        }
        Ok(())
    }
}

impl Default for InfestationWindow {
    fn default() -> Self {
        Self::reference()
    }
}

/// Fuel-driven stand-replacing fire regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FireRegime {
    /// Mean years between stand-replacing fires
    pub return_interval: f64,
    /// Surface fuel load (MgC/ha) at which the base return interval applies
    pub fuel_threshold: f64,
    /// Weight of litter relative to coarse fuel in the surface fuel load
    pub litter_weight: Fraction,
}

impl FireRegime {
    /// Reference regime: 200-year return interval at 20 MgC/ha of surface fuel
    pub fn reference() -> Self {
        FireRegime {
            return_interval: 200.0,
            fuel_threshold: 20.0,
            litter_weight: Fraction::new(0.1),
        }
    }

    /// A regime in which fire never occurs
    pub fn suppressed() -> Self {
        FireRegime {
            return_interval: f64::INFINITY,
            ..Self::reference()
        }
    }

    /// Weighted surface fuel load (MgC/ha)
    #[inline]
    pub fn surface_fuel(&self, pools: &CarbonPools) -> f64 {
        pools.litter * self.litter_weight + pools.coarse
    }

    /// Annual fire probability for the given pools, capped at 1
    ///
    /// A zero fuel threshold or an infinite return interval means zero risk.
    pub fn probability(&self, pools: &CarbonPools) -> f64 {
        if self.fuel_threshold <= 0.0 || !self.return_interval.is_finite() {
            return 0.0;
        }
        let fuel_ratio = self.surface_fuel(pools).max(0.0) / self.fuel_threshold;
        (fuel_ratio / self.return_interval).min(1.0)
    }

    pub fn validate(&self) -> CarbonResult<()> {
        if self.return_interval.is_nan() || self.return_interval <= 0.0 {
            return Err(CarbonError::InvalidScenario(format!(
                "fire return interval must be positive, got {}",
                self.return_interval
            )));
        }
        if !self.fuel_threshold.is_finite() || self.fuel_threshold < 0.0 {
            return Err(CarbonError::InvalidScenario(format!(
                "fuel threshold must be finite and non-negative, got {}",
                self.fuel_threshold
            )));
        }
        Ok(())
    }
}

impl Default for FireRegime {
    fn default() -> Self {
        Self::reference()
    }
}

/// Complete stochastic disturbance regime for one scenario
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisturbanceRegime {
    pub infestation: InfestationWindow,
    pub fire: FireRegime,
}

impl DisturbanceRegime {
    pub fn validate(&self) -> CarbonResult<()> {
        self.infestation.validate()?;
        self.fire.validate()
    }

    /// Decide this year's event
    ///
    /// Consumes one draw when an infestation is possible, and one more draw
    /// for fire whenever no infestation fires.
    pub fn select<S>(
        &self,
        year: i32,
        pools: &CarbonPools,
        already_infested: bool,
        policy: HarvestPolicy,
        source: &mut S,
    ) -> Disturbance
    where
        S: UniformSource + ?Sized,
    {
        if !already_infested && self.infestation.contains(year) {
            let draw = source.next_uniform();
            if draw < *self.infestation.annual_probability {
                return policy.infestation();
            }
        }

        let draw = source.next_uniform();
        if draw < self.fire.probability(pools) {
            Disturbance::Fire
        } else {
            Disturbance::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disturbance::draw::ScriptedSource;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_window_matches_cumulative_spread() {
        let w = InfestationWindow::from_cumulative(2005, 2015, 0.8).unwrap();
        assert_relative_eq!(
            *w.annual_probability,
            *InfestationWindow::reference().annual_probability,
            epsilon = 1e-12
        );
        assert!(w.contains(2005));
        assert!(w.contains(2015));
        assert!(!w.contains(2016));
    }

    #[test]
    fn test_single_year_window_gets_whole_probability() {
        let w = InfestationWindow::from_cumulative(1, 1, 1.0).unwrap();
        assert_eq!(*w.annual_probability, 1.0);
    }

    #[test]
    fn test_window_rejects_bad_input() {
        assert!(InfestationWindow::from_cumulative(10, 5, 0.5).is_err());
        assert!(InfestationWindow::from_cumulative(0, 1, 1.5).is_err());
    }

    #[test]
    fn test_fire_probability_scales_with_fuel() {
        let regime = FireRegime::reference();
        let light = CarbonPools::reference_initial();
        let heavy = CarbonPools {
            litter: 10.0,
            coarse: 19.0,
            ..light
        };
        // (0.1 * 0.1 + 0.1) / 20 / 200
        assert_relative_eq!(regime.probability(&light), 0.11 / 20.0 / 200.0, epsilon = 1e-15);
        // (10 * 0.1 + 19) / 20 / 200
        assert_relative_eq!(regime.probability(&heavy), 1.0 / 200.0);
    }

    #[test]
    fn test_zero_threshold_means_zero_risk() {
        let regime = FireRegime {
            fuel_threshold: 0.0,
            ..FireRegime::reference()
        };
        assert_eq!(regime.probability(&CarbonPools::reference_initial()), 0.0);
        assert_eq!(
            FireRegime::suppressed().probability(&CarbonPools::reference_initial()),
            0.0
        );
    }

    #[test]
    fn test_fire_probability_capped() {
        let regime = FireRegime {
            return_interval: 1.0,
            fuel_threshold: 1.0,
            ..FireRegime::reference()
        };
        let pools = CarbonPools {
            coarse: 50.0,
            ..CarbonPools::ZERO
        };
        assert_eq!(regime.probability(&pools), 1.0);
    }

    #[test]
    fn test_infestation_checked_before_fire() {
        let regime = DisturbanceRegime {
            infestation: InfestationWindow::from_cumulative(3, 3, 1.0).unwrap(),
            fire: FireRegime {
                return_interval: 1.0,
                fuel_threshold: 1.0,
                ..FireRegime::reference()
            },
        };
        let pools = CarbonPools {
            coarse: 50.0,
            ..CarbonPools::ZERO
        };
        let mut source = ScriptedSource::new(vec![0.0]);
        let event = regime.select(3, &pools, false, HarvestPolicy::HarvestOnInfestation, &mut source);
        assert_eq!(event, Disturbance::HarvestedInfestation);
        assert_eq!(source.consumed(), 1);

        // Already infested: the window is skipped and fire is drawn instead
        let event = regime.select(3, &pools, true, HarvestPolicy::NoHarvest, &mut source);
        assert_eq!(event, Disturbance::Fire);
        assert_eq!(source.consumed(), 2);
    }

    #[test]
    fn test_quiet_source_never_disturbs() {
        let regime = DisturbanceRegime {
            infestation: InfestationWindow::from_cumulative(0, 10, 1.0).unwrap(),
            fire: FireRegime::reference(),
        };
        let mut source = ScriptedSource::quiet();
        for year in 0..20 {
            let event = regime.select(
                year,
                &CarbonPools::reference_initial(),
                false,
                HarvestPolicy::NoHarvest,
                &mut source,
            );
            assert_eq!(event, Disturbance::None);
        }
    }
}
