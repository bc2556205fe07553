//! Command-line host of the electron selection stage
//!
//! Reads a configuration file and a file of events, runs the selection over
//! all events, then writes the cutflow histograms to disk.

use clap::Parser;
use electron_selector::{
    config::Configuration,
    cutflow::CutflowHistograms,
    input, logging, output, scheduling,
    selector::ElectronSelector,
};
use eyre::{Result, WrapErr};
use tracing::info;

use std::{path::PathBuf, time::Instant};

/// Apply the electron selection to a file of events
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Selection configuration file ("Key: value" lines)
    #[arg(long)]
    config: PathBuf,

    /// Events to be selected, as JSON lines
    #[arg(long)]
    events: PathBuf,

    /// Name of the selection stage, used for tool names and the cutflow bin
    #[arg(long, default_value = "ElectronSelector")]
    name: String,

    /// Where the cutflow histograms should be written
    #[arg(long, default_value = "cutflow.txt")]
    output: PathBuf,
}

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    let cli = Cli::parse();

    // ### CONFIGURATION READOUT ###

    let cfg = Configuration::load(&cli.config).wrap_err("Failed to load the configuration")?;
    logging::init(cfg.debug);
    info!(stage = %cli.name, "Initializing the electron selection");
    cfg.print();

    // ### SELECTION INITIALIZATION ###

    let selector = ElectronSelector::new(cli.name, cfg)
        .wrap_err("Failed to initialize the electron selection")?;
    let mut events = input::read_events(&cli.events).wrap_err("Failed to read the events")?;

    // The "all" bin accounts for every event which was read, whatever
    // happens to it later on
    let mut histograms = CutflowHistograms::new();
    let weight_sum = events
        .iter()
        .filter_map(|store| store.info.mc_event_weight)
        .map(f64::from)
        .sum::<f64>();
    histograms.set("all", events.len() as f64, weight_sum);

    // NOTE: The clock is started after configuration and event I/O, to avoid
    //       IO-induced timing fluctuations
    let saved_time = Instant::now();

    // ### SELECTION EXECUTION ###

    let report = scheduling::run_selection(&mut events, |first_event, batch| {
        selector.process_events(first_event, batch)
    })
    .wrap_err("Electron selection failed")?;
    let elapsed_time = saved_time.elapsed();

    // ### RESULTS STORAGE ###

    if selector.config().use_cutflow {
        let (raw, weighted) = report.cutflow.clone().flush(selector.name(), &mut histograms);
        info!(raw, weighted, "Filled cutflow bin {}", selector.name());
    }
    output::dump_results(&cli.output, &histograms, &report, elapsed_time)
        .wrap_err("Failed to output the results")?;

    // ...and we're done
    Ok(())
}
