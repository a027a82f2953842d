pub mod demography;
pub mod error;
pub mod experiment;
pub mod individual;
pub mod model;
pub mod param;
pub mod population;
pub mod stats;
pub mod utils;

use crate::demography::{AgeRange, Demography};
use crate::error::{SimError, SimResult};
use crate::experiment::Experiment;
use crate::population::Population;
use crate::utils::{display_year, display_year_legend};
use chrono::Local;
use log::{debug, info, warn};
use param::Param;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Converts the `population`, `birth` and `death` sections into the demographic rules.
pub fn build_demography(param: &Param) -> SimResult<Demography> {
    let population = &param.population;

    let initial_age_distribution = population
        .initial_age_distribution
        .iter()
        .map(|bucket| Ok((AgeRange::new(bucket.min, bucket.max)?, bucket.weight)))
        .collect::<SimResult<Vec<(AgeRange, f64)>>>()?;

    if population.initial_trait_distribution.len() != 2 {
        return Err(SimError::Configuration(format!(
            "initial_trait_distribution needs exactly two traits, got {}",
            population.initial_trait_distribution.len()
        )));
    }

    Ok(Demography {
        initial_age_distribution,
        initial_trait_distribution: population
            .initial_trait_distribution
            .iter()
            .map(|(label, weight)| (label.clone(), *weight))
            .collect(),
        gender_ratio_at_birth: population
            .gender_ratio_at_birth
            .iter()
            .map(|(gender, weight)| (*gender, *weight))
            .collect(),
        birth_probability: model::birth_probability(&param.birth),
        death_probability: model::death_probability(&param.death),
        female_fertile_age_range: population.fertile_age_range.female,
        male_fertile_age_range: population.fertile_age_range.male,
        max_age: population.max_age,
    })
}

/// Generates the initial population and lets it evolve for `population.years` years.
///
/// Clearing `running` stops the run at the next year boundary; the years
/// already simulated are kept in the returned experiment.
pub fn run(param: &Param, running: Arc<AtomicBool>) -> SimResult<Experiment> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let colorful = param.general.display_colorful;

    let demography = build_demography(param)?;
    debug!("{:?}", demography);

    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);
    let mut population = Population::new();
    population.generate(param.population.size, &demography, &mut rng)?;
    let labels = population
        .trait_labels()
        .cloned()
        .ok_or_else(|| SimError::Domain("generated population has no trait labels".to_string()))?;

    cinfo!(
        colorful,
        "\x1b[2;97mGenerated {} individuals, evolving for {} years\x1b[0m",
        population.len(),
        param.population.years
    );
    if param.general.display_every > 0 {
        cinfo!(colorful, "{}", display_year_legend());
    }

    let mut interrupted = false;
    for _ in 0..param.population.years {
        if !running.load(Ordering::Relaxed) {
            info!("Signal received");
            interrupted = true;
            break;
        }

        if population.is_empty() && param.general.stop_on_extinction {
            warn!("Population extinct after {} years", population.elapsed_years());
            break;
        }

        let outcome = population.evolve_one_year(&demography, &mut rng)?;

        let every = param.general.display_every;
        if every > 0 && population.elapsed_years() % every == 0 {
            if let Some(stats) = population.history().last() {
                let line = display_year(stats, &labels, outcome.births, outcome.deaths);
                cinfo!(colorful, "{}", line);
            }
        }
    }

    let git_hash = option_env!("POPSIM_GIT_SHA").unwrap_or("unknown");
    let popsim_version = format!("{}#{}", env!("CARGO_PKG_VERSION"), git_hash);
    let summary = population.stat();

    Ok(Experiment {
        id: format!("popsim_{}_{}", param.general.seed, timestamp),
        timestamp,
        popsim_version,
        parameters: param.clone(),
        trait_labels: labels,
        population,
        summary,
        interrupted,
        execution_time: start.elapsed().as_secs_f64(),
    })
}
