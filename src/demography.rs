//! Demographic and genetic configuration consumed by the population engine.
//!
//! The engine has no opinion on where these values come from: distributions are
//! plain category/weight lists and the birth/death rules are boxed callables.

use crate::error::{SimError, SimResult};
use crate::individual::{Gender, Individual};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive age interval
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> SimResult<AgeRange> {
        if min > max {
            return Err(SimError::Configuration(format!("invalid age range [{}, {}]", min, max)));
        }
        Ok(AgeRange { min, max })
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Uniform integer age within the range, bounds included
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

impl From<(u32, u32)> for AgeRange {
    fn from((min, max): (u32, u32)) -> Self {
        AgeRange { min, max }
    }
}

impl From<AgeRange> for (u32, u32) {
    fn from(range: AgeRange) -> Self {
        (range.min, range.max)
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Probability that a female gives birth this year, given her fertile age range
pub type BirthProbability = Box<dyn Fn(&Individual, AgeRange) -> f64>;
/// Probability that an individual dies this year, given the maximum age
pub type DeathProbability = Box<dyn Fn(&Individual, u32) -> f64>;

/// Configuration bundle supplied to `Population::generate` and `Population::evolve`
pub struct Demography {
    pub initial_age_distribution: Vec<(AgeRange, f64)>,
    /// Must contain exactly two labels
    pub initial_trait_distribution: Vec<(String, f64)>,
    pub gender_ratio_at_birth: Vec<(Gender, f64)>,
    pub birth_probability: BirthProbability,
    pub death_probability: DeathProbability,
    pub female_fertile_age_range: AgeRange,
    pub male_fertile_age_range: AgeRange,
    pub max_age: u32,
}

impl fmt::Debug for Demography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Demography")
            .field("initial_age_distribution", &self.initial_age_distribution)
            .field("initial_trait_distribution", &self.initial_trait_distribution)
            .field("gender_ratio_at_birth", &self.gender_ratio_at_birth)
            .field("female_fertile_age_range", &self.female_fertile_age_range)
            .field("male_fertile_age_range", &self.male_fertile_age_range)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

/// Weighted random choice over a fixed list of categories
pub struct WeightedChoice<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Clone + fmt::Debug> WeightedChoice<T> {
    /// Builds the sampler, failing on empty, negative or all-zero weights.
    /// `what` names the distribution in the error message.
    pub fn new(entries: &[(T, f64)], what: &str) -> SimResult<WeightedChoice<T>> {
        if entries.is_empty() {
            return Err(SimError::Configuration(format!("{} is empty", what)));
        }
        let index = WeightedIndex::new(entries.iter().map(|(_, w)| *w))
            .map_err(|e| SimError::Configuration(format!("{} has unusable weights: {}", what, e)))?;
        let items = entries.iter().map(|(item, _)| item.clone()).collect();
        Ok(WeightedChoice { items, index })
    }

    pub fn sample(&self, rng: &mut ChaCha8Rng) -> T {
        self.items[self.index.sample(rng)].clone()
    }
}
