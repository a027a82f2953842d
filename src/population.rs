use crate::demography::{AgeRange, Demography, WeightedChoice};
use crate::error::{SimError, SimResult};
use crate::individual::{Gender, Genotype, Individual, TraitLabels, TraitSlot};
use crate::stats::{TraitSummary, YearStats};
use crate::utils::{fmt_opt, round_to};
use log::{debug, info};
use rand::prelude::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A population evolving year after year through aging, death and birth.
///
/// All mutation goes through `generate` and `evolve`; `members` and `history`
/// are only exposed read-only.
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Population {
    members: Vec<Individual>,
    elapsed_years: usize,
    /// One snapshot per simulated year, index 0 being the generation snapshot
    history: Vec<YearStats>,
    /// Frozen copy of the members right after generation
    initial_members: Vec<Individual>,
    trait_labels: Option<TraitLabels>,
    next_id: u64,
    total_births: usize,
    total_deaths: usize,
}

/// Births and deaths that happened during one simulated year
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct YearOutcome {
    pub births: usize,
    pub deaths: usize,
}

impl Population {
    pub fn new() -> Population {
        Population::default()
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn history(&self) -> &[YearStats] {
        &self.history
    }

    pub fn initial_members(&self) -> &[Individual] {
        &self.initial_members
    }

    pub fn elapsed_years(&self) -> usize {
        self.elapsed_years
    }

    pub fn trait_labels(&self) -> Option<&TraitLabels> {
        self.trait_labels.as_ref()
    }

    pub fn total_births(&self) -> usize {
        self.total_births
    }

    pub fn total_deaths(&self) -> usize {
        self.total_deaths
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_generated(&self) -> bool {
        !self.history.is_empty()
    }

    /// Proportions of one trait component across current members, in member order
    pub fn trait_proportions(&self, slot: TraitSlot) -> Vec<f64> {
        self.members.iter().map(|i| i.genotype.get(slot)).collect()
    }

    /// Populates the population with `size` individuals drawn from the initial distributions.
    ///
    /// For each individual the draws happen in this order: age bucket, age within the
    /// bucket, gender, trait label. Every generated individual is pure for its drawn label.
    ///
    /// # Errors
    ///
    /// * `SimError::Domain` if `size` is zero or the population was already generated.
    /// * `SimError::Configuration` if the trait distribution does not hold exactly two
    ///   distinct labels, or if a distribution is empty or has unusable weights.
    ///
    /// Nothing is modified when an error is returned.
    pub fn generate(
        &mut self,
        size: usize,
        demography: &Demography,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<()> {
        if size == 0 {
            return Err(SimError::Domain("population size must be positive".to_string()));
        }
        if self.is_generated() {
            return Err(SimError::Domain("population has already been generated".to_string()));
        }

        let (labels, trait_choice) = trait_sampler(&demography.initial_trait_distribution)?;
        let ages = &demography.initial_age_distribution;
        if let Some((range, _)) = ages.iter().find(|(r, _)| !r.is_valid()) {
            let msg = format!("initial age bucket {} is inverted", range);
            return Err(SimError::Configuration(msg));
        }
        let age_choice = WeightedChoice::new(ages, "initial age distribution")?;
        let gender_choice = gender_sampler(demography)?;

        self.members.reserve(size);
        for _ in 0..size {
            let age = age_choice.sample(rng).sample(rng);
            let gender = gender_choice.sample(rng);
            let slot = trait_choice.sample(rng);
            let id = self.take_id();
            self.members.push(Individual::new(id, gender, Genotype::pure(slot), age));
        }

        self.initial_members = self.members.clone();
        self.trait_labels = Some(labels);
        self.record_year();

        debug!("Generated {} individuals: {:?}", size, self.history[0]);
        Ok(())
    }

    /// Advances the population by `years` yearly steps.
    ///
    /// # Errors
    ///
    /// * `SimError::Domain` if `years` is zero or the population was never generated.
    /// * `SimError::Configuration` if the gender ratio at birth is unusable.
    ///
    /// Validation happens before the first step, so a failure leaves the population untouched.
    pub fn evolve(
        &mut self,
        years: usize,
        demography: &Demography,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<()> {
        self.check_can_evolve(years)?;
        let gender_choice = gender_sampler(demography)?;

        for _ in 0..years {
            self.simulate_year(demography, &gender_choice, rng);
        }
        Ok(())
    }

    /// Same as `evolve(1, ..)` but reports what happened during the year
    pub fn evolve_one_year(
        &mut self,
        demography: &Demography,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<YearOutcome> {
        self.check_can_evolve(1)?;
        let gender_choice = gender_sampler(demography)?;
        Ok(self.simulate_year(demography, &gender_choice, rng))
    }

    fn check_can_evolve(&self, years: usize) -> SimResult<()> {
        if years == 0 {
            return Err(SimError::Domain("number of years to evolve must be positive".to_string()));
        }
        if !self.is_generated() {
            let msg = "population must be generated before evolving";
            return Err(SimError::Domain(msg.to_string()));
        }
        Ok(())
    }

    /// One yearly step. Only members present at the start of the year age, die or give
    /// birth; newborns are appended once the year is over.
    ///
    /// Draw order per member: death, then (surviving females) birth, then on a birth the
    /// father and the child's gender.
    fn simulate_year(
        &mut self,
        demography: &Demography,
        gender_choice: &WeightedChoice<Gender>,
        rng: &mut ChaCha8Rng,
    ) -> YearOutcome {
        // fixed for the whole year, even if some of them die along the way
        let fertile_males = self.fertile_males(demography.male_fertile_age_range);

        let start_len = self.members.len();
        let mut alive = vec![true; start_len];
        let mut newborns: Vec<Individual> = Vec::new();

        for i in 0..start_len {
            self.members[i].age += 1;

            let death = (demography.death_probability)(&self.members[i], demography.max_age);
            if rng.gen::<f64>() < death {
                alive[i] = false;
                continue;
            }

            if !self.members[i].is_female() {
                continue;
            }
            let birth = (demography.birth_probability)(
                &self.members[i],
                demography.female_fertile_age_range,
            );
            if rng.gen::<f64>() < birth {
                if let Some(&father_index) = fertile_males.choose(rng) {
                    let gender = gender_choice.sample(rng);
                    let id = self.take_id();
                    let (mother, father) = (&self.members[i], &self.members[father_index]);
                    let child = Individual::child_of(id, mother, father, gender);
                    self.members[i].offspring_count += 1;
                    newborns.push(child);
                }
            }
        }

        let outcome = YearOutcome {
            births: newborns.len(),
            deaths: alive.iter().filter(|a| !**a).count(),
        };

        let mut index = 0;
        self.members.retain(|_| {
            let keep = alive[index];
            index += 1;
            keep
        });
        self.members.extend(newborns);

        self.total_births += outcome.births;
        self.total_deaths += outcome.deaths;
        self.elapsed_years += 1;
        self.record_year();

        if fertile_males.is_empty() {
            debug!("Year {}: no fertile male, no birth possible", self.elapsed_years);
        }
        debug!(
            "Year {}: {} births, {} deaths, {} members",
            self.elapsed_years,
            outcome.births,
            outcome.deaths,
            self.members.len()
        );
        if self.members.is_empty() && start_len > 0 {
            info!("Population went extinct after {} years", self.elapsed_years);
        }

        outcome
    }

    /// Indices of the males whose current age lies in the fertile range
    fn fertile_males(&self, range: AgeRange) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_male() && range.contains(i.age))
            .map(|(n, _)| n)
            .collect()
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_year(&mut self) {
        self.history.push(YearStats::compute(self.elapsed_years, &self.members));
    }

    /// Summary of the current state, derived from the latest snapshot and the live members.
    /// Calling it never modifies the population.
    pub fn stat(&self) -> PopulationSummary {
        let mut summary = PopulationSummary {
            elapsed_years: self.elapsed_years,
            ..PopulationSummary::default()
        };

        let last = match self.history.last() {
            Some(last) if !self.members.is_empty() => last,
            _ => return summary,
        };

        summary.population_size = last.population_size();

        if self.elapsed_years > 0 {
            let initial_size = self.history[0].population_size() as f64;
            let ratio = summary.population_size as f64 / initial_size;
            let rate = ratio.ln() / self.elapsed_years as f64;
            summary.annual_growth_rate_percent = Some(round_to(rate * 100.0, 3));
        }

        let ages = self.members.iter().map(|i| i.age);
        summary.min_age = ages.clone().min();
        summary.max_age = ages.clone().max();
        let total_age: u64 = ages.map(u64::from).sum();
        summary.average_age = Some(round_to(total_age as f64 / self.members.len() as f64, 1));

        summary.gender_ratio = Some(GenderRatio {
            male: last.male_count,
            female: last.female_count,
            male_per_female: if last.female_count > 0 {
                Some(round_to(last.male_count as f64 / last.female_count as f64, 1))
            } else {
                None
            },
        });

        summary.traits = Some(last.traits.map(|t| TraitSummary {
            mean: t.mean.map(|m| round_to(m, 2)),
            std_dev: t.std_dev.map(|s| round_to(s, 2)),
        }));

        summary
    }

    /// Human readable listing of the first `limit` members
    pub fn display(&self, limit: usize) -> String {
        let mut str = format!("{}", self);
        for individual in self.members.iter().take(limit) {
            let line = match &self.trait_labels {
                Some(labels) => individual.describe(labels),
                None => individual.to_string(),
            };
            str = format!("{}\n  {}", str, line);
        }
        if self.members.len() > limit {
            str = format!("{}\n  ... {} more", str, self.members.len() - limit);
        }
        str
    }
}

/// Builds the trait sampler from the label/weight list, enforcing exactly two distinct labels
fn trait_sampler(
    distribution: &[(String, f64)],
) -> SimResult<(TraitLabels, WeightedChoice<TraitSlot>)> {
    if distribution.len() != 2 {
        return Err(SimError::Configuration(format!(
            "initial trait distribution must contain exactly two labels, got {}",
            distribution.len()
        )));
    }
    let labels = TraitLabels::new(&distribution[0].0, &distribution[1].0)?;
    let weights = [
        (TraitSlot::First, distribution[0].1),
        (TraitSlot::Second, distribution[1].1),
    ];
    let choice = WeightedChoice::new(&weights, "initial trait distribution")?;
    Ok((labels, choice))
}

fn gender_sampler(demography: &Demography) -> SimResult<WeightedChoice<Gender>> {
    WeightedChoice::new(&demography.gender_ratio_at_birth, "gender ratio at birth")
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Population(size={})", self.members.len())
    }
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("size", &self.members.len())
            .field("elapsed_years", &self.elapsed_years)
            .field("history_len", &self.history.len())
            .finish()
    }
}

/// Gender counts of the latest snapshot
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Debug)]
pub struct GenderRatio {
    pub male: usize,
    pub female: usize,
    /// None when there is no female
    pub male_per_female: Option<f64>,
}

/// Result of `Population::stat`. Every derived value is None on an empty population.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct PopulationSummary {
    pub elapsed_years: usize,
    pub population_size: usize,
    pub annual_growth_rate_percent: Option<f64>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub average_age: Option<f64>,
    pub gender_ratio: Option<GenderRatio>,
    pub traits: Option<[TraitSummary; 2]>,
}

impl PopulationSummary {
    pub fn trait_summary(&self, slot: TraitSlot) -> Option<&TraitSummary> {
        self.traits.as_ref().map(|t| &t[slot.index()])
    }

    /// Same as Display but with the trait names
    pub fn describe(&self, labels: &TraitLabels) -> String {
        self.render(labels.label(TraitSlot::First), labels.label(TraitSlot::Second))
    }

    fn render(&self, first: &str, second: &str) -> String {
        let ages = match (self.min_age, self.average_age, self.max_age) {
            (Some(min), Some(avg), Some(max)) => format!("{}/{:.1}/{}", min, avg, max),
            _ => "N/A".to_string(),
        };
        let genders = match &self.gender_ratio {
            Some(r) => format!(
                "{} male / {} female (male per female {})",
                r.male,
                r.female,
                fmt_opt(r.male_per_female, 1)
            ),
            None => "N/A".to_string(),
        };
        let trait_line = |name: &str, slot: TraitSlot| {
            let t = self.trait_summary(slot).copied().unwrap_or_default();
            format!("{} mean {} sd {}", name, fmt_opt(t.mean, 2), fmt_opt(t.std_dev, 2))
        };
        let growth = match self.annual_growth_rate_percent {
            Some(rate) => format!("{:.3}%", rate),
            None => "N/A".to_string(),
        };
        format!(
            "Elapsed years: {} | population size: {} | annual growth rate: {}\n\
            Age min/mean/max: {}\n\
            Gender: {}\n\
            Traits: {} | {}",
            self.elapsed_years,
            self.population_size,
            growth,
            ages,
            genders,
            trait_line(first, TraitSlot::First),
            trait_line(second, TraitSlot::Second)
        )
    }
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render("trait 1", "trait 2"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demography::tests::fertile_immortals;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    impl Population {
        /// Population already "generated" from hand-made members
        pub fn test_with_members(members: Vec<Individual>) -> Population {
            let mut pop = Population::new();
            pop.next_id = members.iter().map(|i| i.id + 1).max().unwrap_or(0);
            pop.members = members;
            pop.initial_members = pop.members.clone();
            pop.trait_labels = Some(TraitLabels::new("green", "brown").unwrap());
            pop.record_year();
            pop
        }
    }

    fn female(id: u64, genotype: Genotype, age: u32) -> Individual {
        Individual::new(id, Gender::Female, genotype, age)
    }

    fn male(id: u64, genotype: Genotype, age: u32) -> Individual {
        Individual::new(id, Gender::Male, genotype, age)
    }

    fn mortal_demography(death: f64, birth: f64) -> Demography {
        let mut demography = fertile_immortals();
        demography.death_probability = Box::new(move |_: &Individual, _: u32| death);
        demography.birth_probability = Box::new(move |ind: &Individual, range: AgeRange| {
            if range.contains(ind.age) { birth } else { 0.0 }
        });
        demography
    }

    #[test]
    fn test_generate() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();

        pop.generate(50, &demography, &mut rng).unwrap();

        assert_eq!(pop.len(), 50, "generated Population should be composed of size Individuals");
        assert_eq!(pop.history().len(), 1, "generation should record exactly one snapshot");
        assert_eq!(pop.history()[0].year, 0);
        assert_eq!(pop.elapsed_years(), 0);
        assert_eq!(pop.initial_members(), pop.members(), "initial members should be a copy of the generated members");
        assert_eq!(pop.trait_labels().unwrap(), &TraitLabels::new("green", "brown").unwrap());

        for ind in pop.members() {
            assert!((20..=30).contains(&ind.age), "age {} should come from the only bucket", ind.age);
            let g = ind.genotype;
            assert!(
                g == Genotype::pure(TraitSlot::First) || g == Genotype::pure(TraitSlot::Second),
                "generated individuals should be pure for one trait, got {:?}",
                g
            );
            assert_eq!(ind.offspring_count, 0);
        }
    }

    #[test]
    fn test_generate_is_reproducible() {
        let demography = fertile_immortals();
        let mut a = Population::new();
        let mut b = Population::new();
        a.generate(30, &demography, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        b.generate(30, &demography, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b, "same seed should generate the same population");
    }

    #[test]
    fn test_generate_validation_leaves_population_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();

        assert!(matches!(pop.generate(0, &fertile_immortals(), &mut rng), Err(SimError::Domain(_))));

        let mut three_traits = fertile_immortals();
        three_traits.initial_trait_distribution.push(("blue".to_string(), 1.0));
        assert!(matches!(pop.generate(10, &three_traits, &mut rng), Err(SimError::Configuration(_))));

        let mut one_trait = fertile_immortals();
        one_trait.initial_trait_distribution.pop();
        assert!(matches!(pop.generate(10, &one_trait, &mut rng), Err(SimError::Configuration(_))));

        let mut duplicated = fertile_immortals();
        duplicated.initial_trait_distribution[1].0 = "green".to_string();
        assert!(matches!(pop.generate(10, &duplicated, &mut rng), Err(SimError::Configuration(_))));

        let mut no_ages = fertile_immortals();
        no_ages.initial_age_distribution.clear();
        assert!(matches!(pop.generate(10, &no_ages, &mut rng), Err(SimError::Configuration(_))));

        let mut inverted = fertile_immortals();
        inverted.initial_age_distribution = vec![(AgeRange { min: 30, max: 20 }, 1.0)];
        assert!(matches!(pop.generate(10, &inverted, &mut rng), Err(SimError::Configuration(_))));

        let mut no_genders = fertile_immortals();
        no_genders.gender_ratio_at_birth.clear();
        assert!(matches!(pop.generate(10, &no_genders, &mut rng), Err(SimError::Configuration(_))));

        assert!(pop.is_empty());
        assert!(pop.history().is_empty());
        assert!(!pop.is_generated());
    }

    #[test]
    fn test_generate_twice_is_refused() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();
        pop.generate(10, &demography, &mut rng).unwrap();
        assert!(matches!(pop.generate(10, &demography, &mut rng), Err(SimError::Domain(_))));
        assert_eq!(pop.len(), 10);
        assert_eq!(pop.history().len(), 1);
    }

    #[test]
    fn test_evolve_increments_years_and_history() {
        let demography = mortal_demography(0.05, 0.2);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();
        pop.generate(100, &demography, &mut rng).unwrap();

        pop.evolve(5, &demography, &mut rng).unwrap();
        assert_eq!(pop.elapsed_years(), 5);
        assert_eq!(pop.history().len(), 6);

        pop.evolve(3, &demography, &mut rng).unwrap();
        assert_eq!(pop.elapsed_years(), 8);
        assert_eq!(pop.history().len(), 9);

        for (n, snapshot) in pop.history().iter().enumerate() {
            assert_eq!(snapshot.year, n, "history should hold one snapshot per year, in order");
        }
        assert_eq!(pop.history().last().unwrap().population_size(), pop.len());
    }

    #[test]
    fn test_evolve_validation() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();

        assert!(matches!(pop.evolve(1, &demography, &mut rng), Err(SimError::Domain(_))), "evolving before generating should fail");

        pop.generate(20, &demography, &mut rng).unwrap();
        let before = pop.clone();

        assert!(matches!(pop.evolve(0, &demography, &mut rng), Err(SimError::Domain(_))));

        let mut bad_ratio = fertile_immortals();
        bad_ratio.gender_ratio_at_birth = vec![(Gender::Male, 0.0), (Gender::Female, 0.0)];
        assert!(matches!(pop.evolve(3, &bad_ratio, &mut rng), Err(SimError::Configuration(_))));

        assert_eq!(pop, before, "a failed evolve should not modify the population");
    }

    #[test]
    fn test_survivors_age_once_per_year() {
        let demography = mortal_demography(0.1, 0.3);
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let mut pop = Population::new();
        pop.generate(200, &demography, &mut rng).unwrap();

        let initial_ages: HashMap<u64, u32> = pop.members().iter().map(|i| (i.id, i.age)).collect();
        let mut birth_year: HashMap<u64, usize> = HashMap::new();

        for _ in 0..6 {
            pop.evolve(1, &demography, &mut rng).unwrap();
            for ind in pop.members() {
                if !initial_ages.contains_key(&ind.id) {
                    birth_year.entry(ind.id).or_insert(pop.elapsed_years());
                }
            }
        }

        for ind in pop.members() {
            match initial_ages.get(&ind.id) {
                Some(age) => assert_eq!(ind.age, age + 6, "survivor {:?} should have aged exactly 6 years", ind),
                None => {
                    let born = birth_year[&ind.id];
                    assert_eq!(ind.age as usize, pop.elapsed_years() - born, "newborn {:?} should age from 0", ind);
                }
            }
        }
    }

    #[test]
    fn test_newborn_genotype_is_parents_mean() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 25),
            male(1, Genotype::new(0.0, 1.0), 30),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();

        assert_eq!(pop.len(), 3, "the fertile female should give birth");
        let child = &pop.members()[2];
        assert_eq!(child.age, 0);
        assert_eq!(child.genotype, Genotype::new(0.5, 0.5));
        assert_eq!(child.id, 2);
        assert_eq!(pop.members()[0].offspring_count, 1, "the mother's offspring count should increase");
        assert_eq!(pop.members()[1].offspring_count, 0, "fathers do not track offspring");
        assert_eq!(pop.total_births(), 1);
    }

    #[test]
    fn test_newborns_do_not_act_in_their_birth_year() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 25),
            male(1, Genotype::new(0.0, 1.0), 30),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();
        // a newborn iterated in the same year would have age 1 and could not be 0
        assert!(pop.members().iter().filter(|i| i.id >= 2).all(|i| i.age == 0));
        assert_eq!(pop.history()[1].population_size(), 3);
    }

    #[test]
    fn test_no_births_without_fertile_males() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 20),
            female(1, Genotype::new(1.0, 0.0), 25),
            male(2, Genotype::new(0.0, 1.0), 70),
            male(3, Genotype::new(0.0, 1.0), 10),
        ]);

        pop.evolve(4, &demography, &mut rng).unwrap();

        // the young male enters the fertile range at 15, after these 4 years
        assert_eq!(pop.total_births(), 0, "no birth should occur without fertile males");
        assert_eq!(pop.len(), 4);
        assert!(pop.history().iter().all(|s| s.population_size() == 4));
    }

    #[test]
    fn test_birth_draw_consumed_without_fertile_males() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut replay = rng.clone();
        let mut pop = Population::test_with_members(vec![female(0, Genotype::new(1.0, 0.0), 20)]);

        pop.evolve(1, &demography, &mut rng).unwrap();

        // death draw then birth draw, no father nor gender draw
        let _ = replay.gen::<f64>();
        let _ = replay.gen::<f64>();
        assert_eq!(pop.total_births(), 0);
        assert_eq!(rng.get_word_pos(), replay.get_word_pos(), "exactly two draws should be consumed");
        assert_eq!(rng.gen::<u64>(), replay.gen::<u64>());
    }

    #[test]
    fn test_generation_draw_order() {
        let mut demography = fertile_immortals();
        demography.initial_age_distribution = vec![
            (AgeRange { min: 0, max: 9 }, 1.0),
            (AgeRange { min: 40, max: 49 }, 2.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut replay = rng.clone();
        let mut pop = Population::new();

        pop.generate(20, &demography, &mut rng).unwrap();

        // age bucket, age within the bucket, gender, trait
        let buckets = WeightedChoice::new(&demography.initial_age_distribution, "ages").unwrap();
        let genders = WeightedChoice::new(&demography.gender_ratio_at_birth, "genders").unwrap();
        let traits = WeightedChoice::new(&[(TraitSlot::First, 1.0), (TraitSlot::Second, 1.0)], "traits").unwrap();
        for (id, ind) in pop.members().iter().enumerate() {
            let age = buckets.sample(&mut replay).sample(&mut replay);
            let gender = genders.sample(&mut replay);
            let slot = traits.sample(&mut replay);
            assert_eq!(ind, &Individual::new(id as u64, gender, Genotype::pure(slot), age));
        }
        assert_eq!(rng.get_word_pos(), replay.get_word_pos());
    }

    #[test]
    fn test_yearly_draw_order() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut replay = rng.clone();
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 20),
            male(1, Genotype::new(0.0, 1.0), 30),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();

        // mother: death, birth, father, child gender; then the father's death draw
        let genders = WeightedChoice::new(&demography.gender_ratio_at_birth, "genders").unwrap();
        let _ = replay.gen::<f64>();
        let _ = replay.gen::<f64>();
        let _ = [1usize].choose(&mut replay);
        let gender = genders.sample(&mut replay);
        let _ = replay.gen::<f64>();

        assert_eq!(pop.len(), 3);
        assert_eq!(pop.members()[2].gender, gender);
        assert_eq!(rng.get_word_pos(), replay.get_word_pos());
    }

    #[test]
    fn test_fertile_males_fixed_at_start_of_year() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // the male is 60 at the start of year 1, the upper bound of the fertile range
        let mut pop = Population::test_with_members(vec![
            male(0, Genotype::new(0.0, 1.0), 60),
            female(1, Genotype::new(1.0, 0.0), 25),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();
        assert_eq!(pop.total_births(), 1, "a male fertile at the start of the year can father even after aging out");

        pop.evolve(1, &demography, &mut rng).unwrap();
        assert_eq!(pop.total_births(), 1, "the male is no longer fertile the following year");
    }

    #[test]
    fn test_dead_mother_gives_no_birth() {
        let mut demography = fertile_immortals();
        demography.death_probability = Box::new(|ind: &Individual, _: u32| if ind.is_female() { 1.0 } else { 0.0 });
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 25),
            male(1, Genotype::new(0.0, 1.0), 30),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();

        assert_eq!(pop.total_births(), 0);
        assert_eq!(pop.total_deaths(), 1);
        assert_eq!(pop.len(), 1);
        assert!(pop.members()[0].is_male());
    }

    #[test]
    fn test_dead_father_still_fathers_within_year() {
        let mut demography = fertile_immortals();
        demography.death_probability = Box::new(|ind: &Individual, _: u32| if ind.is_male() { 1.0 } else { 0.0 });
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // the male is iterated and removed before the female gives birth
        let mut pop = Population::test_with_members(vec![
            male(0, Genotype::new(0.0, 1.0), 30),
            female(1, Genotype::new(1.0, 0.0), 25),
        ]);

        pop.evolve(1, &demography, &mut rng).unwrap();

        assert_eq!(pop.total_births(), 1);
        assert!(pop.members().iter().all(|i| i.id != 0), "the dead father is removed");
        assert_eq!(pop.members().last().unwrap().genotype, Genotype::new(0.5, 0.5));
    }

    #[test]
    fn test_unique_ids_and_no_resurrection() {
        let demography = mortal_demography(0.15, 0.4);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut pop = Population::new();
        pop.generate(150, &demography, &mut rng).unwrap();

        let mut seen: HashSet<u64> = HashSet::new();
        let mut removed: HashSet<u64> = HashSet::new();
        let mut previous: HashSet<u64> = pop.members().iter().map(|i| i.id).collect();
        seen.extend(previous.iter().copied());

        for _ in 0..20 {
            pop.evolve(1, &demography, &mut rng).unwrap();
            let current: Vec<u64> = pop.members().iter().map(|i| i.id).collect();
            let current_set: HashSet<u64> = current.iter().copied().collect();
            assert_eq!(current.len(), current_set.len(), "no individual should appear twice");

            for id in &current_set {
                assert!(!removed.contains(id), "removed individual {} reappeared", id);
                if !previous.contains(id) {
                    assert!(seen.insert(*id), "newborn id {} was already used", id);
                }
            }
            removed.extend(previous.difference(&current_set).copied());
            previous = current_set;
        }
        assert_eq!(pop.total_deaths(), removed.len());
    }

    #[test]
    fn test_stat_on_empty_population() {
        let demography = mortal_demography(1.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();

        let never_generated = pop.stat();
        assert_eq!(never_generated, PopulationSummary::default());

        pop.generate(25, &demography, &mut rng).unwrap();
        pop.evolve(1, &demography, &mut rng).unwrap();
        assert!(pop.is_empty());

        let stat = pop.stat();
        assert_eq!(stat.elapsed_years, 1);
        assert_eq!(stat.population_size, 0);
        assert_eq!(stat.annual_growth_rate_percent, None);
        assert_eq!(stat.min_age, None);
        assert_eq!(stat.max_age, None);
        assert_eq!(stat.average_age, None);
        assert_eq!(stat.gender_ratio, None);
        assert_eq!(stat.traits, None);

        // an extinct population keeps evolving without error
        pop.evolve(2, &demography, &mut rng).unwrap();
        assert_eq!(pop.history().len(), 4);
        assert_eq!(pop.history()[3].traits, [TraitSummary::default(); 2]);
    }

    #[test]
    fn test_stat_values() {
        let mut pop = Population::test_with_members(vec![
            male(0, Genotype::new(1.0, 0.0), 20),
            male(1, Genotype::new(1.0, 0.0), 41),
            male(2, Genotype::new(0.0, 1.0), 30),
            female(3, Genotype::new(0.0, 1.0), 33),
        ]);
        let stat = pop.stat();
        assert_eq!(stat.elapsed_years, 0);
        assert_eq!(stat.population_size, 4);
        assert_eq!(stat.annual_growth_rate_percent, None, "growth rate is undefined before any year");
        assert_eq!(stat.min_age, Some(20));
        assert_eq!(stat.max_age, Some(41));
        assert_eq!(stat.average_age, Some(31.0));
        let ratio = stat.gender_ratio.unwrap();
        assert_eq!((ratio.male, ratio.female), (3, 1));
        assert_eq!(ratio.male_per_female, Some(3.0));
        let first = stat.trait_summary(TraitSlot::First).unwrap();
        assert_eq!(first.mean, Some(0.5));
        assert_eq!(first.std_dev, Some(0.5));

        let demography = mortal_demography(0.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        pop.evolve(2, &demography, &mut rng).unwrap();
        let stat = pop.stat();
        assert_eq!(stat.annual_growth_rate_percent, Some(0.0), "a stable population has no growth");
        assert_eq!(stat.min_age, Some(22));
    }

    #[test]
    fn test_growth_rate_uses_generation_snapshot() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut pop = Population::new();
        pop.generate(40, &demography, &mut rng).unwrap();
        pop.evolve(3, &demography, &mut rng).unwrap();

        let stat = pop.stat();
        let expected = round_to((pop.len() as f64 / 40.0).ln() / 3.0 * 100.0, 3);
        assert!(pop.len() > 40, "immortal fertile population should grow");
        assert_eq!(stat.population_size, pop.len());
        assert_eq!(stat.annual_growth_rate_percent, Some(expected));
    }

    #[test]
    fn test_male_per_female_not_applicable_without_females() {
        let pop = Population::test_with_members(vec![
            male(0, Genotype::new(1.0, 0.0), 20),
            male(1, Genotype::new(0.0, 1.0), 22),
        ]);
        let stat = pop.stat();
        assert_eq!(stat.gender_ratio.unwrap().male_per_female, None);
        assert!(stat.to_string().contains("male per female N/A"));
    }

    #[test]
    fn test_stat_is_idempotent() {
        let demography = mortal_demography(0.05, 0.2);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::new();
        pop.generate(60, &demography, &mut rng).unwrap();
        pop.evolve(4, &demography, &mut rng).unwrap();

        let before = pop.clone();
        let first = pop.stat();
        let second = pop.stat();
        assert_eq!(first, second);
        assert_eq!(pop, before, "stat should not modify members or history");
    }

    #[test]
    fn test_evolve_is_reproducible() {
        let demography = mortal_demography(0.03, 0.12);
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut pop = Population::new();
            pop.generate(100, &demography, &mut rng).unwrap();
            pop.evolve(10, &demography, &mut rng).unwrap();
            pop
        };
        let a = run(4815162342);
        let b = run(4815162342);
        assert_eq!(a.stat(), b.stat());
        assert_eq!(a.members(), b.members());
        assert_eq!(a.history(), b.history());
    }

    #[test]
    fn test_evolve_one_year_reports_outcome() {
        let demography = fertile_immortals();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pop = Population::test_with_members(vec![
            female(0, Genotype::new(1.0, 0.0), 25),
            female(1, Genotype::new(1.0, 0.0), 26),
            male(2, Genotype::new(0.0, 1.0), 30),
        ]);
        let outcome = pop.evolve_one_year(&demography, &mut rng).unwrap();
        assert_eq!(outcome, YearOutcome { births: 2, deaths: 0 });
        assert_eq!(pop.elapsed_years(), 1);
    }

    #[test]
    fn test_trait_proportions_and_display() {
        let pop = Population::test_with_members(vec![
            male(0, Genotype::new(1.0, 0.0), 20),
            female(1, Genotype::new(0.25, 0.75), 22),
        ]);
        assert_eq!(pop.trait_proportions(TraitSlot::Second), vec![0.0, 0.75]);
        assert_eq!(pop.to_string(), "Population(size=2)");
        let listing = pop.display(1);
        assert!(listing.contains("green: 1.00"));
        assert!(listing.contains("... 1 more"));
    }

    #[test]
    fn test_summary_describe_uses_labels() {
        let pop = Population::test_with_members(vec![
            male(0, Genotype::new(1.0, 0.0), 20),
            female(1, Genotype::new(0.0, 1.0), 22),
        ]);
        let text = pop.stat().describe(pop.trait_labels().unwrap());
        assert!(text.contains("green mean 0.50 sd 0.50"));
        assert!(text.contains("brown mean 0.50 sd 0.50"));
        assert!(text.contains("annual growth rate: N/A"));
    }
}
