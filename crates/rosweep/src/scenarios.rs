//! The study's scenario catalogue.
//!
//! A scenario names a set of swept flowsheet quantities with their sampling
//! strategy. Simple scenarios run one sweep; the differential scenario adds a
//! perturbation around every sample; the scaling set is sized on the command line.

use std::fmt;

use color_eyre::eyre::{Result, bail};
use rosweep_core::{DifferentialSpec, ParameterSpec, SamplingKind, SweepConfig};
use serde::{Deserialize, Serialize};

use crate::flowsheet::{
    A_COMP, B_COMP, BOOSTER_EFFICIENCY, MEMBRANE_COST, NACL_LOADING, PX_COST, PX_EFFICIENCY,
    RECOVERY,
};

/// Sample count of the scenarios whose size the study left to the caller
pub const DEFAULT_NUM_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Simple,
    Differential,
    Scaling,
}

impl RunType {
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Simple => "simple",
            RunType::Differential => "differential",
            RunType::Scaling => "scaling",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one study run
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    /// Rows drawn by random kinds; fixed grids carry their own counts
    pub num_samples: usize,
    pub parameters: Vec<ParameterSpec>,
    pub differential: Vec<DifferentialSpec>,
    pub num_diff_samples: usize,
}

impl Scenario {
    fn new(name: &str, num_samples: usize, parameters: Vec<ParameterSpec>) -> Self {
        Self {
            name: name.to_string(),
            num_samples,
            parameters,
            differential: Vec::new(),
            num_diff_samples: 0,
        }
    }

    /// Total combinations the sweep will evaluate, before perturbations
    pub fn combination_count(&self) -> Result<usize> {
        let config = SweepConfig::new(self.parameters.clone(), Vec::new())
            .num_samples(self.num_samples);
        Ok(config.combination_count()?)
    }
}

pub const SIMPLE_SCENARIOS: &[&str] = &[
    "A_comp_vs_LCOW",
    "WR_vs_NaCL_loading_vs_LCOW",
    "A_comp_vs_B_comp_vs_LCOW",
    "Scaling_Study",
    "use_LHS",
    "RandomSampling",
    "FixedSampling",
];

pub const DIFFERENTIAL_SCENARIOS: &[&str] = &["UniformSampling"];

/// Look up a scenario of the given run type.
///
/// `num_samples` sizes the scenarios that do not fix their own count, and the
/// scaling set.
pub fn scenario(run_type: RunType, name: &str, num_samples: Option<usize>) -> Result<Scenario> {
    match run_type {
        RunType::Simple => simple(name, num_samples.unwrap_or(DEFAULT_NUM_SAMPLES)),
        RunType::Differential => differential(name),
        RunType::Scaling => Ok(scaling(num_samples.unwrap_or(10))),
    }
}

fn linear(name: &str, quantity: &str, lower: f64, upper: f64, num_samples: usize) -> ParameterSpec {
    let (lower, upper) = ordered(lower, upper);
    ParameterSpec::new(
        name,
        quantity,
        SamplingKind::Linear {
            lower,
            upper,
            num_samples,
        },
    )
}

fn uniform(name: &str, quantity: &str, lower: f64, upper: f64) -> ParameterSpec {
    let (lower, upper) = ordered(lower, upper);
    ParameterSpec::new(name, quantity, SamplingKind::Uniform { lower, upper })
}

fn normal(name: &str, quantity: &str, mean: f64, std_dev: f64) -> ParameterSpec {
    ParameterSpec::new(name, quantity, SamplingKind::Normal { mean, std_dev })
}

/// Some study ranges are listed high-to-low
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

fn simple(name: &str, num_samples: usize) -> Result<Scenario> {
    let scenario = match name {
        "A_comp_vs_LCOW" => Scenario::new(
            name,
            100,
            vec![linear("A_comp", A_COMP, 1.0e-12, 1e-11, 100)],
        ),
        "WR_vs_NaCL_loading_vs_LCOW" => Scenario::new(
            name,
            10,
            vec![
                linear("recovery", RECOVERY, 0.1, 0.65, 10),
                linear("NaCl_loading", NACL_LOADING, 0.01, 0.05, 10),
            ],
        ),
        "A_comp_vs_B_comp_vs_LCOW" => Scenario::new(
            name,
            10,
            vec![
                linear("A_comp", A_COMP, 1.0e-12, 1e-11, 10),
                linear("B_comp", B_COMP, 8.0e-8, 1.0e-8, 10),
            ],
        ),
        "Scaling_Study" => Scenario::new(
            name,
            100_000,
            vec![
                uniform("A_comp", A_COMP, 1.0e-12, 1e-11),
                uniform("B_comp", B_COMP, 8.0e-8, 1.0e-8),
                uniform("ERD_efficiency", BOOSTER_EFFICIENCY, 0.95, 0.99),
            ],
        ),
        "use_LHS" => Scenario::new(
            name,
            num_samples,
            vec![ParameterSpec::new(
                "A_comp",
                A_COMP,
                SamplingKind::LatinHypercube {
                    lower: 0.5e-12,
                    upper: 5e-12,
                },
            )],
        ),
        "RandomSampling" => Scenario::new(
            name,
            num_samples,
            vec![
                normal("A_comp", A_COMP, 4.0e-12, 0.5e-12),
                normal("B_comp", B_COMP, 3.5e-8, 0.5e-8),
            ],
        ),
        "FixedSampling" => Scenario::new(
            name,
            num_samples,
            vec![linear("A_comp", A_COMP, 1.0e-12, 1e-11, num_samples)],
        ),
        other => bail!(
            "unknown simple scenario `{other}` (expected one of: {})",
            SIMPLE_SCENARIOS.join(", ")
        ),
    };
    Ok(scenario)
}

fn differential(name: &str) -> Result<Scenario> {
    if !DIFFERENTIAL_SCENARIOS.contains(&name) {
        bail!(
            "unknown differential scenario `{name}` (expected one of: {})",
            DIFFERENTIAL_SCENARIOS.join(", ")
        );
    }

    let parameters = vec![
        uniform("A_comp", A_COMP, 4.2e-12, 2.1e-11),
        uniform("membrane_cost", MEMBRANE_COST, 30.0, 10.0),
        uniform("px_cost", PX_COST, 535.0, 250.0),
        uniform("px_efficiency", PX_EFFICIENCY, 0.95, 0.99),
    ];
    // Percentile shift per parameter, in declaration order
    let shifts = [0.05, -0.05, -0.05, 0.02];
    let differential = shifts
        .iter()
        .zip(&parameters)
        .map(|(&shift, param)| DifferentialSpec::percentile(param, shift, shift))
        .collect::<Result<_, _>>()?;

    Ok(Scenario {
        differential,
        num_diff_samples: 1,
        ..Scenario::new(name, 1000, parameters)
    })
}

/// A_comp, NaCl loading and ERD cost, sized for timing runs
pub fn scaling(num_samples: usize) -> Scenario {
    Scenario::new(
        "scaling",
        num_samples,
        vec![
            uniform("A_comp", A_COMP, 1.0e-12, 1e-11),
            uniform("NaCl_loading", NACL_LOADING, 0.01, 0.05),
            normal("ERD_cost", PX_COST, 535.0, 60.0),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosweep_core::{DiffMode, SamplingCategory};

    fn validate(scenario: &Scenario) -> SamplingCategory {
        SweepConfig::new(scenario.parameters.clone(), vec![])
            .num_samples(scenario.num_samples)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_every_simple_scenario_validates() {
        for name in SIMPLE_SCENARIOS {
            let scenario = scenario(RunType::Simple, name, None).unwrap();
            validate(&scenario);
        }
    }

    #[test]
    fn test_grid_sizes() {
        let s = scenario(RunType::Simple, "A_comp_vs_LCOW", None).unwrap();
        assert_eq!(s.combination_count().unwrap(), 100);

        let s = scenario(RunType::Simple, "A_comp_vs_B_comp_vs_LCOW", None).unwrap();
        assert_eq!(s.combination_count().unwrap(), 100);
        assert_eq!(s.parameters[1].kind.bounds(), Some((1.0e-8, 8.0e-8)));

        let s = scenario(RunType::Simple, "Scaling_Study", None).unwrap();
        assert_eq!(validate(&s), SamplingCategory::Random);
        assert_eq!(s.combination_count().unwrap(), 100_000);

        let s = scenario(RunType::Simple, "FixedSampling", Some(7)).unwrap();
        assert_eq!(s.combination_count().unwrap(), 7);
    }

    #[test]
    fn test_oversized_grid_count_is_an_error() {
        let parameters = (0..10)
            .map(|i| linear(&format!("p{i}"), A_COMP, 0.0, 1.0, 100))
            .collect();
        let s = Scenario::new("huge", 1, parameters);
        assert!(s.combination_count().is_err());
    }

    #[test]
    fn test_differential_scenario() {
        let s = scenario(RunType::Differential, "UniformSampling", None).unwrap();
        assert_eq!(s.num_samples, 1000);
        assert_eq!(s.num_diff_samples, 1);
        assert_eq!(s.differential.len(), 4);

        let membrane = &s.differential[1];
        assert_eq!(membrane.parameter, "membrane_cost");
        assert_eq!(membrane.mode, DiffMode::Percentile);
        assert_eq!((membrane.nominal_lower, membrane.nominal_upper), (10.0, 30.0));
        let (lo, hi) = membrane.delta_range();
        assert!((lo + 1.0).abs() < 1e-12 && (hi + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaling_set() {
        let s = scenario(RunType::Scaling, "ignored", Some(50)).unwrap();
        assert_eq!(s.num_samples, 50);
        assert_eq!(validate(&s), SamplingCategory::Random);
        assert_eq!(scenario(RunType::Scaling, "", None).unwrap().num_samples, 10);
    }

    #[test]
    fn test_unknown_scenario() {
        let err = scenario(RunType::Simple, "WR_vs_Salinity_vs_LCOW", None).unwrap_err();
        assert!(err.to_string().contains("WR_vs_Salinity_vs_LCOW"));
        assert!(scenario(RunType::Differential, "RandomSampling", None).is_err());
    }
}
