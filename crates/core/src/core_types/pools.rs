//! Stand carbon pools and the append-only trajectory log
//!
//! A stand is described by six carbon reservoirs (MgC/ha) plus its age
//! since the last stand-replacing disturbance. Leaf area index and canopy
//! interception ride along for display; they are recomputed by every
//! growth step and zeroed by every disturbance.
//!
//! ```text
//!   live:     foliage   stem    root
//!   detritus: litter    coarse fuel
//!   soil:     soil organic matter
//! ```

use serde::{Deserialize, Serialize};

/// Carbon held in each pool of one stand (MgC/ha)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarbonPools {
    pub foliage: f64,
    pub stem: f64,
    pub root: f64,
    pub litter: f64,
    pub coarse: f64,
    pub soil: f64,
}

impl CarbonPools {
    /// All pools empty
    pub const ZERO: CarbonPools = CarbonPools {
        foliage: 0.0,
        stem: 0.0,
        root: 0.0,
        litter: 0.0,
        coarse: 0.0,
        soil: 0.0,
    };

    /// Reference initial condition: a freshly established stand on 40 MgC/ha of soil
    pub fn reference_initial() -> Self {
        CarbonPools {
            foliage: 0.1,
            stem: 0.1,
            root: 0.1,
            litter: 0.1,
            coarse: 0.1,
            soil: 40.0,
        }
    }

    /// Sum of every pool
    #[inline]
    pub fn total(&self) -> f64 {
        self.live() + self.litter + self.coarse + self.soil
    }

    /// Foliage + stem + root
    #[inline]
    pub fn live(&self) -> f64 {
        self.foliage + self.stem + self.root
    }

    /// Pools in display order, paired with their names
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("foliage", self.foliage),
            ("stem", self.stem),
            ("root", self.root),
            ("litter", self.litter),
            ("coarse", self.coarse),
            ("soil", self.soil),
        ]
    }

    /// True if every pool is finite and non-negative
    pub fn is_physical(&self) -> bool {
        self.named()
            .iter()
            .all(|(_, v)| v.is_finite() && *v >= 0.0)
    }
}

/// Complete state of one stand at the end of a simulated year
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StandState {
    /// Years since the last stand-replacing disturbance
    pub age: u32,
    pub pools: CarbonPools,
    /// Leaf area index (m²/m²), display only
    pub lai: f64,
    /// Canopy light-interception fraction, display only
    pub interception: f64,
}

impl StandState {
    /// A stand at age zero with the given pools and no canopy
    pub fn establish(pools: CarbonPools) -> Self {
        StandState {
            age: 0,
            pools,
            lai: 0.0,
            interception: 0.0,
        }
    }
}

/// Append-only record of a stand's states, one entry per year
///
/// Entry 0 is the initial condition; entry `k` is the state at the end of
/// simulated year `k`. Entries are never removed or rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    states: Vec<StandState>,
}

impl Trajectory {
    /// Start a log from the initial condition
    pub fn new(initial: StandState) -> Self {
        Self::with_capacity(initial, 0)
    }

    /// Start a log with room for `years` appended entries
    pub fn with_capacity(initial: StandState, years: usize) -> Self {
        let mut states = Vec::with_capacity(years + 1);
        states.push(initial);
        Trajectory { states }
    }

    pub(crate) fn push(&mut self, state: StandState) {
        self.states.push(state);
    }

    /// Number of recorded entries (years simulated + 1)
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Never true: the initial condition is always present
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of simulated years
    #[inline]
    pub fn years(&self) -> usize {
        self.states.len() - 1
    }

    pub fn initial(&self) -> &StandState {
        &self.states[0]
    }

    pub fn states(&self) -> &[StandState] {
        &self.states
    }

    pub fn get(&self, index: usize) -> Option<&StandState> {
        self.states.get(index)
    }

    pub fn ages(&self) -> Vec<u32> {
        self.states.iter().map(|s| s.age).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_initial_total() {
        let pools = CarbonPools::reference_initial();
        assert_relative_eq!(pools.total(), 40.5, epsilon = 1e-12);
        assert_relative_eq!(pools.live(), 0.3, epsilon = 1e-12);
        assert!(pools.is_physical());
    }

    #[test]
    fn test_negative_pool_is_not_physical() {
        let pools = CarbonPools {
            litter: -0.01,
            ..CarbonPools::reference_initial()
        };
        assert!(!pools.is_physical());
    }

    #[test]
    fn test_trajectory_starts_with_initial_state() {
        let initial = StandState::establish(CarbonPools::reference_initial());
        let mut log = Trajectory::new(initial);
        assert_eq!(log.len(), 1);
        assert_eq!(log.years(), 0);
        assert!(!log.is_empty());

        let next = StandState {
            age: 1,
            ..initial
        };
        log.push(next);
        assert_eq!(log.len(), 2);
        assert_eq!(log.ages(), vec![0, 1]);
        assert_eq!(log.initial(), &initial);
    }
}
