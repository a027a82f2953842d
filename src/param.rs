use crate::demography::AgeRange;
use crate::individual::Gender;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[allow(non_camel_case_types)]
pub enum BirthModel {
    constant,
    triangular,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[allow(non_camel_case_types)]
pub enum DeathModel {
    constant,
    gompertz,
}

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub population: Population,
    #[serde(default)]
    pub birth: Birth,
    #[serde(default)]
    pub death: Death,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(default = "seed_default")]
    pub seed: u64,
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    /// Years between two progress lines, 0 disables them
    #[serde(default = "display_every_default")]
    pub display_every: usize,
    #[serde(default = "uzero_default")]
    pub n_members_to_display: usize,
    #[serde(default = "true_default")]
    pub stop_on_extinction: bool,
    #[serde(default = "empty_string")]
    pub save_exp: String,
    #[serde(default = "empty_string")]
    pub history_csv: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgeBucket {
    pub min: u32,
    pub max: u32,
    pub weight: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FertileAgeRange {
    pub female: AgeRange,
    pub male: AgeRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Population {
    #[serde(default = "size_default")]
    pub size: usize,
    #[serde(default = "years_default")]
    pub years: usize,
    #[serde(default = "max_age_default")]
    pub max_age: u32,
    #[serde(default = "fertile_age_range_default")]
    pub fertile_age_range: FertileAgeRange,
    #[serde(default = "gender_ratio_default")]
    pub gender_ratio_at_birth: BTreeMap<Gender, f64>,
    #[serde(default = "age_distribution_default")]
    pub initial_age_distribution: Vec<AgeBucket>,
    /// Exactly two labels; the first in alphabetical order is the first trait component
    #[serde(default = "trait_distribution_default")]
    pub initial_trait_distribution: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Birth {
    #[serde(default = "birth_model_default")]
    pub model: BirthModel,
    /// Yearly probability (at the peak age for the triangular model)
    #[serde(default = "birth_probability_default")]
    pub probability: f64,
    #[serde(default = "peak_age_default")]
    pub peak_age: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Death {
    #[serde(default = "death_model_default")]
    pub model: DeathModel,
    /// Yearly probability, or the age-0 baseline of the gompertz model
    #[serde(default = "death_probability_default")]
    pub probability: f64,
    #[serde(default = "death_growth_default")]
    pub growth: f64,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Population {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Birth {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Death {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

/// Loads a YAML (or TOML, by extension) parameter file and validates it
pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(&param_file)?;
    let mut param_reader = BufReader::new(param_file_reader);

    let mut config: Param = if param_file.ends_with(".toml") {
        let mut content = String::new();
        param_reader.read_to_string(&mut content)?;
        toml::from_str(&content)?
    } else {
        serde_yaml::from_reader(param_reader)?
    };

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if !param.general.log_base.is_empty() {
        param.general.display_colorful = false;
    }

    validate_population(param)?;
    validate_probabilities(param)?;

    let fertile = param.population.fertile_age_range;
    let max_age = param.population.max_age;
    if fertile.female.min >= max_age || fertile.male.min >= max_age {
        warn!(
            "Fertile age ranges (female {}, male {}) start at or after max_age={}: no birth can occur.",
            fertile.female, fertile.male, max_age
        );
    }

    let peak_age = param.birth.peak_age;
    if param.birth.model == BirthModel::triangular && !fertile.female.contains(peak_age) {
        warn!(
            "Birth peak_age={} is outside the female fertile range {}: it will be clamped into it.",
            peak_age, fertile.female
        );
    }

    if param.population.initial_age_distribution.iter().any(|b| b.max >= max_age) {
        warn!(
            "Some initial ages reach max_age={}: these individuals will die during the first year.",
            max_age
        );
    }

    Ok(())
}

fn validate_population(param: &Param) -> Result<(), String> {
    let population = &param.population;

    if population.size == 0 {
        return Err("Invalid population size=0. Must be > 0.".to_string());
    }

    if population.years == 0 {
        return Err("Invalid years=0. Must be > 0.".to_string());
    }

    let fertile = population.fertile_age_range;
    if !fertile.female.is_valid() || !fertile.male.is_valid() {
        return Err(format!(
            "Invalid fertile age ranges (female {}, male {}). Minimum must not exceed maximum.",
            fertile.female, fertile.male
        ));
    }

    if population.initial_trait_distribution.len() != 2 {
        return Err(format!(
            "initial_trait_distribution must contain exactly two traits, got {}.",
            population.initial_trait_distribution.len()
        ));
    }

    if population.initial_age_distribution.is_empty() {
        return Err("initial_age_distribution cannot be empty.".to_string());
    }

    for bucket in &population.initial_age_distribution {
        if bucket.min > bucket.max {
            return Err(format!(
                "Invalid age bucket [{}, {}]. Minimum must not exceed maximum.",
                bucket.min, bucket.max
            ));
        }
    }

    let traits = &population.initial_trait_distribution;
    let genders = &population.gender_ratio_at_birth;
    let weights = population
        .initial_age_distribution
        .iter()
        .map(|b| ("initial_age_distribution", b.weight))
        .chain(traits.values().map(|w| ("initial_trait_distribution", *w)))
        .chain(genders.values().map(|w| ("gender_ratio_at_birth", *w)));
    for (name, weight) in weights {
        if !(weight >= 0.0) {
            return Err(format!("Invalid weight {} in {}. Must be >= 0.", weight, name));
        }
    }

    if population.gender_ratio_at_birth.values().sum::<f64>() <= 0.0 {
        return Err("gender_ratio_at_birth must contain at least one positive weight.".to_string());
    }

    Ok(())
}

fn validate_probabilities(param: &Param) -> Result<(), String> {
    if !(0.0..=1.0).contains(&param.birth.probability) {
        return Err(format!(
            "Invalid birth probability={:.3}. Must be in range [0, 1].",
            param.birth.probability
        ));
    }

    if !(0.0..=1.0).contains(&param.death.probability) {
        return Err(format!(
            "Invalid death probability={:.3}. Must be in range [0, 1].",
            param.death.probability
        ));
    }

    if param.death.growth < 0.0 {
        return Err(format!("Invalid death growth={:.3}. Must be >= 0.", param.death.growth));
    }

    Ok(())
}

// Default value definitions

fn seed_default() -> u64 {
    4815162342
}
fn empty_string() -> String {
    "".to_string()
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn true_default() -> bool {
    true
}
fn uzero_default() -> usize {
    0
}
fn display_every_default() -> usize {
    10
}
fn size_default() -> usize {
    1000
}
fn years_default() -> usize {
    100
}
fn max_age_default() -> u32 {
    100
}
fn fertile_age_range_default() -> FertileAgeRange {
    FertileAgeRange {
        female: AgeRange { min: 15, max: 49 },
        male: AgeRange { min: 15, max: 64 },
    }
}
fn gender_ratio_default() -> BTreeMap<Gender, f64> {
    BTreeMap::from([(Gender::Male, 1.05), (Gender::Female, 1.0)])
}
fn age_distribution_default() -> Vec<AgeBucket> {
    vec![
        AgeBucket { min: 0, max: 14, weight: 0.25 },
        AgeBucket { min: 15, max: 29, weight: 0.25 },
        AgeBucket { min: 30, max: 44, weight: 0.2 },
        AgeBucket { min: 45, max: 64, weight: 0.2 },
        AgeBucket { min: 65, max: 90, weight: 0.1 },
    ]
}
fn trait_distribution_default() -> BTreeMap<String, f64> {
    BTreeMap::from([("brown".to_string(), 0.5), ("green".to_string(), 0.5)])
}
fn birth_model_default() -> BirthModel {
    BirthModel::triangular
}
fn birth_probability_default() -> f64 {
    0.15
}
fn peak_age_default() -> u32 {
    28
}
fn death_model_default() -> DeathModel {
    DeathModel::gompertz
}
fn death_probability_default() -> f64 {
    0.0005
}
fn death_growth_default() -> f64 {
    0.085
}
