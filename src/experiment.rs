use crate::error::{SimError, SimResult};
use crate::individual::{TraitLabels, TraitSlot};
use crate::param::Param;
use crate::population::{Population, PopulationSummary};
use crate::utils::fmt_opt;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Complete simulation run: parameters, final population with its history, and summary
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Experiment {
    /// Experiment ID, i.e., timestamp and seed
    pub id: String,
    /// Timestamp of the experiment
    pub timestamp: String,
    /// Popsim version and git hash used
    pub popsim_version: String,
    /// Parameters used
    pub parameters: Param,

    pub trait_labels: TraitLabels,
    /// Final population, including its yearly history and initial members
    pub population: Population,
    /// `Population::stat()` at the end of the run
    pub summary: PopulationSummary,

    /// True when the run was stopped by a signal before reaching the requested years
    pub interrupted: bool,
    /// Execution time in seconds
    pub execution_time: f64,
}

impl Experiment {
    pub fn display_results(&self) -> String {
        let mut str = format!(
            "Experiment {} ({})\n{}",
            self.id,
            self.popsim_version,
            self.summary.describe(&self.trait_labels)
        );
        str = format!(
            "{}\nBirths: {} | deaths: {} | initial size: {}",
            str,
            self.population.total_births(),
            self.population.total_deaths(),
            self.population.initial_members().len()
        );
        if self.parameters.general.n_members_to_display > 0 {
            let listing = self.population.display(self.parameters.general.n_members_to_display);
            str = format!("{}\n{}", str, listing);
        }
        if self.interrupted {
            let years = self.population.elapsed_years();
            str = format!("{}\nRun interrupted after {} years", str, years);
        }
        format!("{}\nComputed in {:.2}s", str, self.execution_time)
    }

    /// Saves the experiment in a suitable format based on file extension.
    pub fn save_auto<P: AsRef<std::path::Path>>(&self, path: P) -> SimResult<()> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => self.save_json(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving experiment in json.");
                let json_path = path.with_extension("json");
                self.save_json(json_path)
            }
        }
    }

    /// Saves to JSON (human readable)
    fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Saves as Bincode (compact binary, Rust-only)
    fn save_bincode<P: AsRef<std::path::Path>>(&self, path: P) -> SimResult<()> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads the experiment from a file, detecting the format from the extension.
    pub fn load_auto<P: AsRef<std::path::Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => Self::load_json(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_with_fallback(path),
        }
    }

    fn load_json<P: AsRef<std::path::Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let experiment: Experiment = serde_json::from_str(&content)?;
        Ok(experiment)
    }

    fn load_bincode<P: AsRef<std::path::Path>>(path: P) -> SimResult<Self> {
        let bytes = std::fs::read(path)?;
        let experiment: Experiment = bincode::deserialize(&bytes)?;
        Ok(experiment)
    }

    /// Tries Bincode, then JSON
    fn load_with_fallback<P: AsRef<std::path::Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();

        if let Ok(experiment) = Self::load_bincode(path) {
            return Ok(experiment);
        }

        if let Ok(experiment) = Self::load_json(path) {
            return Ok(experiment);
        }

        let msg = format!("unable to load the experiment from {}", path.display());
        Err(SimError::Serialization(msg))
    }

    /// Writes one CSV row per yearly snapshot; undefined values are left empty
    pub fn export_history_csv<P: AsRef<std::path::Path>>(&self, path: P) -> SimResult<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        let mut header = vec![
            "year".to_string(),
            "male_count".to_string(),
            "female_count".to_string(),
            "mean_male_age".to_string(),
            "mean_female_age".to_string(),
        ];
        for slot in TraitSlot::ALL {
            let label = self.trait_labels.label(slot);
            header.push(format!("{}_mean", label));
            header.push(format!("{}_std_dev", label));
        }
        writer.write_record(&header)?;

        let cell = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        for stats in self.population.history() {
            let mut row = vec![
                stats.year.to_string(),
                stats.male_count.to_string(),
                stats.female_count.to_string(),
                cell(stats.mean_male_age),
                cell(stats.mean_female_age),
            ];
            for slot in TraitSlot::ALL {
                let summary = stats.trait_summary(slot);
                row.push(cell(summary.mean));
                row.push(cell(summary.std_dev));
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;

        info!(
            "History of {} years exported to {} (final {} mean {})",
            self.population.elapsed_years(),
            path.as_ref().display(),
            self.trait_labels.first,
            fmt_opt(self.summary.trait_summary(TraitSlot::First).and_then(|t| t.mean), 2)
        );
        Ok(())
    }
}
