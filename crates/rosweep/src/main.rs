use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rosweep::run::{self, RunOptions, StudyOutcome};
use rosweep::scenarios::RunType;
use rosweep::{init_logging, package_dir, run_parameter_sweep};
use rosweep_core::SweepTimings;

#[derive(Parser, Debug)]
#[command(name = "rosweep")]
#[command(about = "Parameter sweep studies over a reverse-osmosis flowsheet")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct SweepArgs {
    /// Seed for random sampling (drawn and reported when absent)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of parallel ranks (default: all cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Directory for binary result archives
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Also write results as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// YAML file of flowsheet default values
    #[arg(long)]
    defaults: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simple or differential sweep scenario
    Sweep {
        #[arg(long, value_enum, default_value = "differential")]
        run_type: RunType,

        /// Scenario name from the catalogue
        #[arg(short, long, default_value = "UniformSampling")]
        scenario: String,

        /// Sample count for scenarios that do not fix their own
        #[arg(short, long)]
        num_samples: Option<usize>,

        /// YAML file replacing the scenario's sweep parameters
        #[arg(long)]
        params: Option<PathBuf>,

        #[command(flatten)]
        common: SweepArgs,
    },
    /// Time a random sweep of A_comp, NaCl loading and ERD cost
    Scale {
        /// Number of samples
        #[arg(default_value_t = 10)]
        num_samples: usize,

        #[command(flatten)]
        common: SweepArgs,
    },
    /// Solve the flowsheet once and write it as a problem file
    Serialize {
        /// File name; the format's extension is appended when missing
        #[arg(short, long, default_value = "ro_with_energy_recovery")]
        fname: String,

        /// Problem format: nl or gms
        #[arg(short = 't', long = "type", default_value = "nl")]
        format: String,

        /// Package directory receiving nl_files/ or gms_files/
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

impl SweepArgs {
    fn into_options(self, num_samples: Option<usize>, params_yaml: Option<PathBuf>) -> RunOptions {
        RunOptions {
            seed: self.seed,
            workers: self.workers,
            output_dir: self.output_dir,
            csv_path: self.csv,
            defaults_yaml: self.defaults,
            params_yaml,
            num_samples,
        }
    }
}

fn print_timings(timings: &SweepTimings, elapsed: f64) {
    println!("time_building_combinations = {:.6}", timings.building_combinations.as_secs_f64());
    println!("time_sweep_solves = {:.6}", timings.sweep_solves.as_secs_f64());
    println!("time_gathering_results = {:.6}", timings.gathering_results.as_secs_f64());
    println!("time_writing_files = {:.6}", timings.writing_files.as_secs_f64());
    println!("time_elapsed = {elapsed:.6}");
}

fn print_summary(outcome: &StudyOutcome) {
    let (solved, total) = outcome.solved();
    println!("seed = {}", outcome.seed());
    println!("solved = {solved}/{total}");
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    let start = Instant::now();
    match args.command {
        Command::Sweep {
            run_type,
            scenario,
            num_samples,
            params,
            common,
        } => {
            let options = common.into_options(num_samples, params);
            let outcome = run_parameter_sweep(run_type, &scenario, &options)?;
            print_summary(&outcome);
            print_timings(outcome.timings(), start.elapsed().as_secs_f64());
        }
        Command::Scale {
            num_samples,
            common,
        } => {
            let options = common.into_options(Some(num_samples), None);
            let outcome = run_parameter_sweep(RunType::Scaling, "scaling", &options)?;
            print_summary(&outcome);
            print_timings(outcome.timings(), start.elapsed().as_secs_f64());
        }
        Command::Serialize { fname, format, dir } => {
            let model = run::prepare_model(&RunOptions::default())?;
            let dir = dir.unwrap_or_else(package_dir);
            let path = rosweep_core::serialize(&model, &dir, &fname, &format)?;
            println!("wrote {}", path.display());
            tracing::info!(lcow = model.performance.lcow, "serialized solved flowsheet");
        }
    }

    tracing::info!("done");
    Ok(())
}
