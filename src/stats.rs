use crate::individual::{Gender, Individual, TraitSlot};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Mean and population standard deviation of one trait component
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct TraitSummary {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl TraitSummary {
    /// Undefined (None) for an empty sample. The standard deviation divides by N.
    pub fn from_values(values: &[f64]) -> TraitSummary {
        if values.is_empty() {
            return TraitSummary::default();
        }
        TraitSummary {
            mean: Some(values.iter().mean()),
            std_dev: Some(values.iter().population_std_dev()),
        }
    }
}

/// Statistics recorded for one simulated year
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct YearStats {
    pub year: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub mean_male_age: Option<f64>,
    pub mean_female_age: Option<f64>,
    /// Indexed by `TraitSlot::index()`
    pub traits: [TraitSummary; 2],
}

impl YearStats {
    pub fn compute(year: usize, members: &[Individual]) -> YearStats {
        let ages_of = |gender: Gender| -> Vec<f64> {
            members.iter().filter(|i| i.gender == gender).map(|i| i.age as f64).collect()
        };
        let male_ages = ages_of(Gender::Male);
        let female_ages = ages_of(Gender::Female);

        let traits = TraitSlot::ALL.map(|slot| {
            let values: Vec<f64> = members.iter().map(|i| i.genotype.get(slot)).collect();
            TraitSummary::from_values(&values)
        });

        YearStats {
            year,
            male_count: male_ages.len(),
            female_count: female_ages.len(),
            mean_male_age: mean_or_none(&male_ages),
            mean_female_age: mean_or_none(&female_ages),
            traits,
        }
    }

    pub fn population_size(&self) -> usize {
        self.male_count + self.female_count
    }

    pub fn trait_summary(&self, slot: TraitSlot) -> &TraitSummary {
        &self.traits[slot.index()]
    }
}

fn mean_or_none(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}
