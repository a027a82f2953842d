use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender of an individual
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// One of the two genetic trait components tracked by the simulation
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub enum TraitSlot {
    First,
    Second,
}

impl TraitSlot {
    pub const ALL: [TraitSlot; 2] = [TraitSlot::First, TraitSlot::Second];

    pub fn index(self) -> usize {
        match self {
            TraitSlot::First => 0,
            TraitSlot::Second => 1,
        }
    }
}

/// Names of the two trait components, e.g. "green" and "brown"
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct TraitLabels {
    pub first: String,
    pub second: String,
}

impl TraitLabels {
    pub fn new(first: &str, second: &str) -> SimResult<TraitLabels> {
        if first.is_empty() || second.is_empty() {
            return Err(SimError::Configuration("trait labels cannot be empty".to_string()));
        }
        if first == second {
            return Err(SimError::Configuration(format!(
                "trait labels must be distinct (got '{}' twice)",
                first
            )));
        }
        Ok(TraitLabels { first: first.to_string(), second: second.to_string() })
    }

    pub fn label(&self, slot: TraitSlot) -> &str {
        match slot {
            TraitSlot::First => &self.first,
            TraitSlot::Second => &self.second,
        }
    }
}

/// Expressed intensity of each trait component, each in [0,1].
/// The two proportions are independent and need not sum to 1.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Debug)]
pub struct Genotype {
    pub proportions: [f64; 2],
}

impl Genotype {
    pub fn new(first: f64, second: f64) -> Genotype {
        Genotype { proportions: [first, second] }
    }

    /// Genotype fully expressing one component and none of the other
    pub fn pure(slot: TraitSlot) -> Genotype {
        let mut proportions = [0.0; 2];
        proportions[slot.index()] = 1.0;
        Genotype { proportions }
    }

    pub fn get(&self, slot: TraitSlot) -> f64 {
        self.proportions[slot.index()]
    }

    /// Trait-by-trait arithmetic mean of both parents
    pub fn combine(mother: &Genotype, father: &Genotype) -> Genotype {
        let mut proportions = [0.0; 2];
        for slot in TraitSlot::ALL {
            let i = slot.index();
            proportions[i] = (mother.proportions[i] + father.proportions[i]) / 2.0;
        }
        Genotype { proportions }
    }
}

/// A single organism of the population
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    /// Identifier unique within the owning population, never reused
    pub id: u64,
    pub gender: Gender,
    pub genotype: Genotype,
    /// Age in years, incremented once per simulated year
    pub age: u32,
    /// Number of children born, only tracked on mothers
    pub offspring_count: u32,
}

impl Individual {
    pub fn new(id: u64, gender: Gender, genotype: Genotype, age: u32) -> Individual {
        Individual { id, gender, genotype, age, offspring_count: 0 }
    }

    /// Newborn of age 0 carrying the mean of its parents' genotypes
    pub fn child_of(
        id: u64,
        mother: &Individual,
        father: &Individual,
        gender: Gender,
    ) -> Individual {
        let genotype = Genotype::combine(&mother.genotype, &father.genotype);
        Individual::new(id, gender, genotype, 0)
    }

    pub fn is_male(&self) -> bool {
        self.gender == Gender::Male
    }

    pub fn is_female(&self) -> bool {
        self.gender == Gender::Female
    }

    fn offspring_suffix(&self) -> String {
        if self.is_female() && self.offspring_count > 0 {
            format!(", offspring: {}", self.offspring_count)
        } else {
            String::new()
        }
    }

    /// Same as Display but with trait names instead of positional proportions
    pub fn describe(&self, labels: &TraitLabels) -> String {
        format!(
            "Individual(gender={}, genotype={{{}: {:.2}, {}: {:.2}}}, age={}){}",
            self.gender,
            labels.first,
            self.genotype.get(TraitSlot::First),
            labels.second,
            self.genotype.get(TraitSlot::Second),
            self.age,
            self.offspring_suffix()
        )
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Individual(gender={}, genotype=({:.2}, {:.2}), age={}){}",
            self.gender,
            self.genotype.proportions[0],
            self.genotype.proportions[1],
            self.age,
            self.offspring_suffix()
        )
    }
}

impl fmt::Debug for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self)
    }
}
