use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::level_filters::LevelFilter;

use pep::linker::link;
use pep::observers::{print_state, CsvSink};
use pep::parser::parse;
use pep::Simulator;

/// Simulator for enzymatic numerical P systems (§6).
#[derive(ClapParser, Debug)]
#[command(name = "pep")]
#[command(about = "Runs a numerical P system simulation", long_about = None)]
struct Cli {
    /// Path to the NPS input file.
    file: PathBuf,

    /// Cap the number of simulation steps.
    #[arg(short = 'n', value_name = "N")]
    steps: Option<usize>,

    /// Block for user confirmation between steps.
    #[arg(long)]
    step: bool,

    /// Write one CSV row per step to `pep_DD-MM-YYYY_HH-MM-SS.csv`.
    #[arg(long)]
    csv: bool,

    /// Verbose logging. Bare `-v`/`--debug` raises the level to DEBUG;
    /// the attached-value form `-v0` (equivalently `--error`) lowers it
    /// to ERROR instead, matching `pep.py`'s `-v`/`--debug` vs.
    /// `-v0`/`--error` pair.
    #[arg(short = 'v', long = "debug", num_args = 0..=1, default_missing_value = "1", value_name = "LEVEL")]
    verbosity: Option<String>,

    /// Quiet logging (equivalent to `-v0`).
    #[arg(long = "error")]
    error_only: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.error_only || cli.verbosity.as_deref() == Some("0") {
        LevelFilter::ERROR
    } else if cli.verbosity.is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;

    tracing::info!(file = %cli.file.display(), "reading input file");
    let raw = parse(&source)?;
    let mut system = link(raw)?;

    let csv_sink: RefCell<Option<CsvSink<File>>> = RefCell::new(if cli.csv {
        let name = format!(
            "pep_{}.csv",
            chrono::Local::now().format("%d-%m-%Y_%H-%M-%S")
        );
        tracing::info!(path = %name, "opening csv sink");
        let file = File::create(&name).with_context(|| format!("creating {name}"))?;
        let mut sink = CsvSink::new(file, &format!("numerical P system simulation of {}", cli.file.display()))?;
        sink.write_header(&system)?;
        Some(sink)
    } else {
        None
    });

    let rng = StdRng::from_entropy();
    let mut sim = Simulator::new(&mut system, rng);

    let max_steps = cli.steps.unwrap_or(0);
    let stdin = io::stdin();

    let report = sim.run(
        max_steps,
        Duration::ZERO,
        |system| {
            if let Some(sink) = csv_sink.borrow_mut().as_mut() {
                let _ = sink.write_row(system, 0);
            }
        },
        |system, step| {
            tracing::info!(step, "simulation step finished");
            if let Some(sink) = csv_sink.borrow_mut().as_mut() {
                if let Err(err) = sink.write_row(system, step) {
                    tracing::error!(%err, "failed writing csv row");
                }
            }
            println!("step {step}:");
            print!("{}", print_state(system, true));
        },
        || {
            if cli.step {
                print!("Press ENTER to continue... ");
                let _ = io::stdout().flush();
                let mut line = String::new();
                stdin.lock().read_line(&mut line).is_ok()
            } else {
                true
            }
        },
    )?;

    tracing::info!(
        steps = report.steps_completed,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "simulation finished"
    );
    println!(
        "finished after {} steps and {:.3}s",
        report.steps_completed,
        report.elapsed.as_secs_f64()
    );

    Ok(())
}
