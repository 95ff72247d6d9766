//! Study orchestration: prepare the flowsheet, pick a scenario, run the sweep.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, bail};
use rosweep_core::{
    DifferentialOutcome, OutputSpec, Reinitialize, SolveOptions, SolveStatus, SweepConfig,
    SweepDriver, SweepOutcome, SweepTimings, differential_parameter_sweep,
};

use crate::flowsheet::{self, EC, LCOW, RoSurrogate};
use crate::scenarios::{self, RunType, Scenario};
use crate::yaml;

/// Recorded after every solve
pub fn outputs() -> Vec<OutputSpec> {
    vec![OutputSpec::new("EC", EC), OutputSpec::new("LCOW", LCOW)]
}

/// Knobs shared by every study run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: Option<u64>,
    /// Rank count; all available cores when absent
    pub workers: Option<usize>,
    /// Directory receiving the binary result archives
    pub output_dir: PathBuf,
    pub csv_path: Option<PathBuf>,
    /// Flowsheet defaults applied after building
    pub defaults_yaml: Option<PathBuf>,
    /// Replaces the scenario's parameters
    pub params_yaml: Option<PathBuf>,
    /// Sizes scenarios without a fixed count, and the scaling set
    pub num_samples: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            workers: None,
            output_dir: PathBuf::from("output"),
            csv_path: None,
            defaults_yaml: None,
            params_yaml: None,
            num_samples: None,
        }
    }
}

/// Result of one study run
#[derive(Debug, Clone)]
pub enum StudyOutcome {
    Sweep(SweepOutcome),
    Differential(DifferentialOutcome),
}

impl StudyOutcome {
    pub fn timings(&self) -> &SweepTimings {
        match self {
            StudyOutcome::Sweep(outcome) => &outcome.timings,
            StudyOutcome::Differential(outcome) => &outcome.timings,
        }
    }

    /// Output name to values over every solved point, `None` if all failed
    pub fn global_results(&self) -> Option<BTreeMap<String, Vec<f64>>> {
        match self {
            StudyOutcome::Sweep(outcome) => outcome.global_results.clone(),
            StudyOutcome::Differential(outcome) => outcome.combined_table().output_arrays(),
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            StudyOutcome::Sweep(outcome) => outcome.seed,
            StudyOutcome::Differential(outcome) => outcome.primary.seed,
        }
    }

    pub fn solved(&self) -> (usize, usize) {
        let table = match self {
            StudyOutcome::Sweep(outcome) => outcome.table.clone(),
            StudyOutcome::Differential(outcome) => outcome.combined_table(),
        };
        (table.success_count(), table.len())
    }
}

/// Archive path for a run, named by the scenario's sample count
pub fn archive_path(output_dir: &Path, run_type: RunType, scenario: &Scenario, workers: usize) -> PathBuf {
    let n = scenario.num_samples;
    match run_type {
        RunType::Simple => output_dir.join(format!("results_{run_type}_{}_{n}.bin", scenario.name)),
        RunType::Differential => output_dir.join(format!("results_{run_type}_{n}.bin")),
        RunType::Scaling => output_dir
            .join("scaling")
            .join(format!("results_scaling_{workers}_{n}.bin")),
    }
}

/// Build, set operating conditions, initialize and solve the flowsheet once.
pub fn prepare_model(options: &RunOptions) -> Result<RoSurrogate> {
    let solve_options = solve_options();
    let mut model = flowsheet::build();
    if let Some(path) = &options.defaults_yaml {
        yaml::set_defaults_from_yaml(&mut model, path)?;
    }
    flowsheet::set_operating_conditions(&mut model, 0.5, 0.3)?;
    flowsheet::initialize_system(&mut model, &solve_options)?;

    let status = flowsheet::solve(&mut model, &solve_options)?;
    if status != SolveStatus::Optimal {
        bail!("initial flowsheet solve terminated: {status}");
    }
    tracing::info!(
        lcow = model.performance.lcow,
        ec = model.performance.specific_energy_consumption,
        "initial flowsheet solved"
    );
    Ok(model)
}

fn solve_options() -> SolveOptions {
    SolveOptions {
        check_termination: false,
        ..Default::default()
    }
}

/// Run one study sweep over the RO flowsheet.
pub fn run_parameter_sweep(
    run_type: RunType,
    scenario_name: &str,
    options: &RunOptions,
) -> Result<StudyOutcome> {
    let mut scenario = scenarios::scenario(run_type, scenario_name, options.num_samples)?;
    if let Some(path) = &options.params_yaml {
        let params = yaml::get_sweep_params_from_yaml(path)?;
        scenario.parameters = params.parameters;
        scenario.num_samples = match params.num_samples {
            Some(n) => n,
            None => scenario.combination_count()?,
        };
    }
    let combinations = scenario.combination_count()?;

    let model = prepare_model(options)?;

    let mut config = SweepConfig::new(scenario.parameters.clone(), outputs())
        .num_samples(scenario.num_samples)
        .solve_options(solve_options());
    if let Some(seed) = options.seed {
        config = config.seed(seed);
    }
    if let Some(workers) = options.workers {
        config = config.workers(workers);
    }
    if let Some(path) = &options.csv_path {
        config = config.csv_path(path);
    }
    let archive = archive_path(&options.output_dir, run_type, &scenario, config.workers);
    config = config.archive_path(&archive);

    tracing::info!(
        %run_type,
        scenario = %scenario.name,
        combinations,
        archive = %archive.display(),
        "running study"
    );

    let driver = SweepDriver::new(config);
    let reinitialize: &dyn Reinitialize<RoSurrogate> = &flowsheet::initialize_system;
    let outcome = match run_type {
        RunType::Simple | RunType::Scaling => driver
            .parameter_sweep(&model, &flowsheet::optimize, Some(reinitialize), None)
            .map(StudyOutcome::Sweep),
        RunType::Differential => differential_parameter_sweep(
            &driver,
            &model,
            &scenario.differential,
            scenario.num_diff_samples,
            &flowsheet::optimize,
            None,
            None,
        )
        .map(StudyOutcome::Differential),
    };
    outcome.wrap_err_with(|| format!("{run_type} sweep `{}` failed", scenario.name))
}
