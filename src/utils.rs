use crate::individual::{TraitLabels, TraitSlot};
use crate::stats::YearStats;

/// Logs at info level, keeping ANSI colour codes only when `$colorful` is true
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)*) => {
        if $colorful {
            log::info!($($arg)*);
        } else {
            log::info!("{}", $crate::utils::strip_ansi(&format!($($arg)*)));
        }
    };
}

/// Removes `ESC[...m` colour sequences, used when logging to a file
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for inner in chars.by_ref() {
                if inner.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Formats an optional value with `decimals` digits, "N/A" when undefined
pub fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

/// One-line progress display of a yearly snapshot
pub fn display_year(
    stats: &YearStats,
    labels: &TraitLabels,
    births: usize,
    deaths: usize,
) -> String {
    let traits = TraitSlot::ALL
        .iter()
        .map(|slot| {
            let summary = stats.trait_summary(*slot);
            format!(
                "{} {}±{}",
                labels.label(*slot),
                fmt_opt(summary.mean, 3),
                fmt_opt(summary.std_dev, 3)
            )
        })
        .collect::<Vec<String>>()
        .join(" | ");
    format!(
        "#{:<5} \x1b[1;97mN={:<7}\x1b[0m \x1b[34m♂{:<6}\x1b[0m \x1b[35m♀{:<6}\x1b[0m \x1b[32m+{:<5}\x1b[0m \x1b[31m-{:<5}\x1b[0m {}",
        stats.year,
        stats.population_size(),
        stats.male_count,
        stats.female_count,
        births,
        deaths,
        traits
    )
}

pub fn display_year_legend() -> String {
    "\x1b[2;97myear  | population | males | females | births | deaths | trait mean±sd\x1b[0m".to_string()
}
