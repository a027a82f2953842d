use flexi_logger::{FileSpec, Logger, LoggerHandle};
use log::{error, info, warn};
use popsim::param::{self, Param};
use popsim::run;
use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn start_logger(param: &Param) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_str(&param.general.log_level)?;
    let handle = if param.general.log_base.is_empty() {
        logger.log_to_stderr().format(flexi_logger::colored_default_format).start()?
    } else {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&param.general.log_base)
                    .suffix(&param.general.log_suffix),
            )
            .format(flexi_logger::default_format)
            .start()?
    };
    Ok(handle)
}

fn main_run(param_file: String) -> Result<(), Box<dyn Error>> {
    let param = param::get(param_file)?;
    let _logger = start_logger(&param)?;

    let running = Arc::new(AtomicBool::new(true));
    let mut signals = Signals::new([SIGINT])?;
    let flag = Arc::clone(&running);
    std::thread::spawn(move || {
        for _ in signals.forever() {
            warn!("SIGINT received, finishing the current year...");
            flag.store(false, Ordering::Relaxed);
        }
    });

    let exp = run(&param, running)?;
    info!("{}", exp.display_results());

    if !param.general.save_exp.is_empty() {
        exp.save_auto(&param.general.save_exp)?;
        info!("Experiment saved to {}", param.general.save_exp);
    }
    if !param.general.history_csv.is_empty() {
        exp.export_history_csv(&param.general.history_csv)?;
    }
    Ok(())
}

fn main() {
    let param_file = std::env::args().nth(1).unwrap_or_else(|| "param.yaml".to_string());

    if let Err(e) = main_run(param_file) {
        error!("{}", e);
        eprintln!("popsim: {}", e);
        std::process::exit(1);
    }
}
