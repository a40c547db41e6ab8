//! Growth and disturbance parameter set
//!
//! The parameter set is a name → (value, unit, description) table that can be
//! edited freely before a run. [`ParameterSet::validate`] turns it into an
//! immutable [`GrowthParameters`] value; only that validated form is accepted by
//! the growth model and the simulators, so a run can never observe a
//! half-edited or out-of-range parameter.
//!
//! # Reference values
//!
//! | key | value | unit | meaning |
//! |-----|-------|------|---------|
//! | `age_max` | 150 | years | estimated maximum stand age |
//! | `n_age` | 4 | - | hydraulic conductivity age modifier exponent |
//! | `phi_s` | 5.5 | kWh/m²/day | annually averaged incoming short-wave radiation |
//! | `f_dt` | 0.5 | - | annually averaged temperature/moisture modifier |
//! | `sigma_f` | 3.2 | m²/kg | specific leaf area |
//! | `beers_k` | 0.4 | - | Beer's law light extinction coefficient |
//! | `microbial_efficiency` | 0.25 | - | fraction of carbon entering soil that is stabilized |
//!
//! # References
//!
//! - Landsberg, J.J., Waring, R.H. (1997). "A generalised model of forest
//!   productivity using simplified concepts of radiation-use efficiency, carbon
//!   balance and partitioning." Forest Ecology and Management, 95, 209-228.
//! - Chen, J.M. et al. (1996), Can. J. For. Res. - specific leaf area
//! - Binkley, D. et al. (2013), For. Ecol. Manage. - light extinction

use crate::core_types::Fraction;
use crate::error::{CarbonError, CarbonResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recognized parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKey {
    #[serde(rename = "age_max")]
    AgeMax,
    #[serde(rename = "n_age")]
    AgeExponent,
    #[serde(rename = "phi_s")]
    ShortwaveRadiation,
    #[serde(rename = "f_dt")]
    TemperatureMoisture,
    #[serde(rename = "sigma_f")]
    SpecificLeafArea,
    #[serde(rename = "beers_k")]
    LightExtinction,
    #[serde(rename = "microbial_efficiency")]
    MicrobialEfficiency,
}

impl ParameterKey {
    /// Every recognized key, in listing order
    pub const ALL: [ParameterKey; 7] = [
        ParameterKey::AgeMax,
        ParameterKey::AgeExponent,
        ParameterKey::ShortwaveRadiation,
        ParameterKey::TemperatureMoisture,
        ParameterKey::SpecificLeafArea,
        ParameterKey::LightExtinction,
        ParameterKey::MicrobialEfficiency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParameterKey::AgeMax => "age_max",
            ParameterKey::AgeExponent => "n_age",
            ParameterKey::ShortwaveRadiation => "phi_s",
            ParameterKey::TemperatureMoisture => "f_dt",
            ParameterKey::SpecificLeafArea => "sigma_f",
            ParameterKey::LightExtinction => "beers_k",
            ParameterKey::MicrobialEfficiency => "microbial_efficiency",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            ParameterKey::AgeMax => "years",
            ParameterKey::ShortwaveRadiation => "kWh/m2/day",
            ParameterKey::SpecificLeafArea => "m2/kg",
            ParameterKey::AgeExponent
            | ParameterKey::TemperatureMoisture
            | ParameterKey::LightExtinction
            | ParameterKey::MicrobialEfficiency => "-",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ParameterKey::AgeMax => "estimated maximum stand age",
            ParameterKey::AgeExponent => "hydraulic conductivity age modifier exponent",
            ParameterKey::ShortwaveRadiation => "annually-averaged incoming short-wave radiation",
            ParameterKey::TemperatureMoisture => {
                "annually-averaged temperature/moisture modifier value"
            }
            ParameterKey::SpecificLeafArea => "specific leaf area",
            ParameterKey::LightExtinction => "Beers Law light extinction coefficient",
            ParameterKey::MicrobialEfficiency => "Fraction of C entering soil that gets stabilized",
        }
    }

    /// Reference value used by [`ParameterSet::reference`]
    pub fn reference_value(self) -> f64 {
        match self {
            ParameterKey::AgeMax => 150.0,
            ParameterKey::AgeExponent => 4.0,
            ParameterKey::ShortwaveRadiation => 5.5,
            ParameterKey::TemperatureMoisture => 0.5,
            ParameterKey::SpecificLeafArea => 3.2,
            ParameterKey::LightExtinction => 0.4,
            ParameterKey::MicrobialEfficiency => 0.25,
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterKey {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| CarbonError::UnknownParameter(s.to_string()))
    }
}

/// One entry of the parameter table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub value: f64,
    pub unit: &'static str,
    pub description: &'static str,
}

impl Parameter {
    fn for_key(key: ParameterKey, value: f64) -> Self {
        Parameter {
            value,
            unit: key.unit(),
            description: key.description(),
        }
    }
}

/// Editable name → value table of growth coefficients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: FxHashMap<ParameterKey, Parameter>,
}

impl ParameterSet {
    /// An empty set; every key must be supplied before [`validate`](Self::validate)
    pub fn empty() -> Self {
        Self::default()
    }

    /// The reference parameterization (lodgepole-like stand near Denver)
    pub fn reference() -> Self {
        let mut set = Self::empty();
        for key in ParameterKey::ALL {
            set.set(key, key.reference_value());
        }
        set
    }

    pub fn get(&self, key: ParameterKey) -> Option<&Parameter> {
        self.entries.get(&key)
    }

    pub fn value(&self, key: ParameterKey) -> Option<f64> {
        self.get(key).map(|p| p.value)
    }

    /// Set a value, replacing any previous one
    pub fn set(&mut self, key: ParameterKey, value: f64) {
        self.entries.insert(key, Parameter::for_key(key, value));
    }

    /// Set a value by its recognized name
    pub fn set_by_name(&mut self, name: &str, value: f64) -> CarbonResult<()> {
        let key: ParameterKey = name.parse()?;
        self.set(key, value);
        Ok(())
    }

    /// Entries present in the set, in listing order
    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, &Parameter)> + '_ {
        ParameterKey::ALL
            .into_iter()
            .filter_map(|key| self.entries.get(&key).map(|p| (key, p)))
    }

    /// Check every key and freeze the set for a run
    ///
    /// Fails on the first missing key, non-finite or non-positive value, or a
    /// microbial efficiency above 1.
    pub fn validate(&self) -> CarbonResult<GrowthParameters> {
        let positive = |key: ParameterKey| -> CarbonResult<f64> {
            let value = self
                .value(key)
                .ok_or(CarbonError::MissingParameter(key))?;
            if !value.is_finite() {
                return Err(CarbonError::InvalidParameter {
                    key,
                    value,
                    reason: "must be finite",
                });
            }
            if value <= 0.0 {
                return Err(CarbonError::InvalidParameter {
                    key,
                    value,
                    reason: "must be positive",
                });
            }
            Ok(value)
        };

        let efficiency = positive(ParameterKey::MicrobialEfficiency)?;
        let microbial_efficiency =
            Fraction::try_new(efficiency).ok_or(CarbonError::InvalidParameter {
                key: ParameterKey::MicrobialEfficiency,
                value: efficiency,
                reason: "must not exceed 1",
            })?;

        Ok(GrowthParameters {
            age_max: positive(ParameterKey::AgeMax)?,
            n_age: positive(ParameterKey::AgeExponent)?,
            phi_s: positive(ParameterKey::ShortwaveRadiation)?,
            f_dt: positive(ParameterKey::TemperatureMoisture)?,
            sigma_f: positive(ParameterKey::SpecificLeafArea)?,
            beers_k: positive(ParameterKey::LightExtinction)?,
            microbial_efficiency,
        })
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, p) in self.iter() {
            writeln!(
                f,
                "   {} = {:.3} ({})  {}",
                key, p.value, p.unit, p.description
            )?;
        }
        Ok(())
    }
}

/// Validated, immutable growth coefficients
///
/// Only obtainable through [`ParameterSet::validate`], so every field is
/// known to be positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthParameters {
    /// Maximum stand age (years)
    pub(crate) age_max: f64,
    /// Age modifier exponent
    pub(crate) n_age: f64,
    /// Mean incident short-wave radiation (kWh/m²/day)
    pub(crate) phi_s: f64,
    /// Temperature/moisture limitation
    pub(crate) f_dt: f64,
    /// Specific leaf area (m²/kg)
    pub(crate) sigma_f: f64,
    /// Beer's law extinction coefficient
    pub(crate) beers_k: f64,
    pub(crate) microbial_efficiency: Fraction,
}

impl GrowthParameters {
    /// Validated reference parameterization
    pub fn reference() -> Self {
        GrowthParameters {
            age_max: ParameterKey::AgeMax.reference_value(),
            n_age: ParameterKey::AgeExponent.reference_value(),
            phi_s: ParameterKey::ShortwaveRadiation.reference_value(),
            f_dt: ParameterKey::TemperatureMoisture.reference_value(),
            sigma_f: ParameterKey::SpecificLeafArea.reference_value(),
            beers_k: ParameterKey::LightExtinction.reference_value(),
            microbial_efficiency: Fraction::new(
                ParameterKey::MicrobialEfficiency.reference_value(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_set_validates() {
        let params = ParameterSet::reference().validate().unwrap();
        assert_eq!(params, GrowthParameters::reference());
        assert_eq!(params.age_max, 150.0);
        assert_eq!(*params.microbial_efficiency, 0.25);
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let mut set = ParameterSet::reference();
        set.entries.remove(&ParameterKey::SpecificLeafArea);
        assert_eq!(
            set.validate(),
            Err(CarbonError::MissingParameter(ParameterKey::SpecificLeafArea))
        );
    }

    #[test]
    fn test_non_positive_values_rejected() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut set = ParameterSet::reference();
            set.set(ParameterKey::AgeMax, bad);
            assert!(
                matches!(
                    set.validate(),
                    Err(CarbonError::InvalidParameter {
                        key: ParameterKey::AgeMax,
                        ..
                    })
                ),
                "age_max = {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_microbial_efficiency_above_one_rejected() {
        let mut set = ParameterSet::reference();
        set.set(ParameterKey::MicrobialEfficiency, 1.5);
        assert!(set.validate().is_err());

        set.set(ParameterKey::MicrobialEfficiency, 1.0);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_set_by_name() {
        let mut set = ParameterSet::reference();
        set.set_by_name("beers_k", 0.55).unwrap();
        assert_eq!(set.value(ParameterKey::LightExtinction), Some(0.55));

        let err = set.set_by_name("not_a_key", 1.0).unwrap_err();
        assert_eq!(err, CarbonError::UnknownParameter("not_a_key".into()));
    }

    #[test]
    fn test_key_names_round_trip() {
        for key in ParameterKey::ALL {
            assert_eq!(key.name().parse::<ParameterKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_display_lists_every_key_in_order() {
        let listing = ParameterSet::reference().to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), ParameterKey::ALL.len());
        assert!(lines[0].contains("age_max = 150.000 (years)"));
        assert!(lines[6].contains("microbial_efficiency = 0.250"));
    }
}
