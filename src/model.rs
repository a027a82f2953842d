//! Yearly birth and death probability models selectable from the parameter file.

use crate::demography::{AgeRange, BirthProbability, DeathProbability};
use crate::individual::Individual;
use crate::param::{Birth, BirthModel, Death, DeathModel};

/// Builds the birth rule described by the `birth` section. Males never give birth.
pub fn birth_probability(birth: &Birth) -> BirthProbability {
    let probability = birth.probability;
    match birth.model {
        BirthModel::constant => Box::new(move |ind: &Individual, range: AgeRange| {
            if ind.is_female() && range.contains(ind.age) {
                probability
            } else {
                0.0
            }
        }),
        BirthModel::triangular => {
            let peak_age = birth.peak_age;
            Box::new(move |ind: &Individual, range: AgeRange| {
                if ind.is_female() && range.contains(ind.age) {
                    probability * triangular_weight(ind.age, range, peak_age)
                } else {
                    0.0
                }
            })
        }
    }
}

/// Builds the death rule described by the `death` section.
/// Reaching `max_age` is always fatal.
pub fn death_probability(death: &Death) -> DeathProbability {
    let probability = death.probability;
    match death.model {
        DeathModel::constant => Box::new(move |ind: &Individual, max_age: u32| {
            if ind.age >= max_age {
                1.0
            } else {
                probability
            }
        }),
        DeathModel::gompertz => {
            let growth = death.growth;
            Box::new(move |ind: &Individual, max_age: u32| {
                if ind.age >= max_age {
                    1.0
                } else {
                    (probability * (growth * ind.age as f64).exp()).min(1.0)
                }
            })
        }
    }
}

/// Weight in (0,1] rising linearly up to `peak_age` and falling after it.
/// The peak is clamped into the range.
fn triangular_weight(age: u32, range: AgeRange, peak_age: u32) -> f64 {
    let peak = peak_age.clamp(range.min, range.max);
    if age <= peak {
        (age - range.min + 1) as f64 / (peak - range.min + 1) as f64
    } else {
        (range.max - age + 1) as f64 / (range.max - peak + 1) as f64
    }
}
