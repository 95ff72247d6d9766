//! Building the combination set of a sweep from its parameter specs.
//!
//! Fixed grids are combined as a cross product in row-major order (the last
//! parameter varies fastest). Random and Latin hypercube kinds are combined
//! row by row: row `i` holds the `i`-th draw of every parameter.

use rand::distr::Uniform;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::{ParameterSpec, SamplingCategory, SamplingKind, SweepConfig};

/// The full, ordered set of parameter values a sweep will evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combinations {
    /// Parameter names, one per column
    pub names: Vec<String>,
    /// One row per combination, values in `names` order
    pub rows: Vec<Vec<f64>>,
    /// Grid shape for cross-product sweeps
    pub shape: Option<Vec<usize>>,
}

impl Combinations {
    /// Build the combinations for a validated config.
    pub fn build(config: &SweepConfig, seed: u64) -> Result<Self, ConfigError> {
        let category = config.validate()?;
        let names = config.parameter_names();

        let combinations = match category {
            SamplingCategory::Fixed => {
                let grids: Vec<Vec<f64>> = config
                    .parameters
                    .iter()
                    .map(|p| fixed_grid(&p.kind))
                    .collect();
                let shape = grids.iter().map(Vec::len).collect();
                let total = config.combination_count()?;
                Self {
                    names,
                    rows: cross_product(&grids, total),
                    shape: Some(shape),
                }
            }
            SamplingCategory::Random | SamplingCategory::LatinHypercube => {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                let columns = config
                    .parameters
                    .iter()
                    .map(|p| draw_column(p, config.num_samples, &mut rng))
                    .collect::<Result<Vec<_>, _>>()?;
                Self {
                    names,
                    rows: transpose(&columns, config.num_samples),
                    shape: None,
                }
            }
        };

        Ok(combinations)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one parameter across all combinations
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// Use the given seed, or draw and report a fresh one.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => {
            let seed = rand::rng().random();
            tracing::info!(seed, "no seed given, drew a fresh one");
            seed
        }
    }
}

/// Grid values of a fixed sampling kind. Empty for random kinds.
pub fn fixed_grid(kind: &SamplingKind) -> Vec<f64> {
    match *kind {
        SamplingKind::Linear {
            lower,
            upper,
            num_samples,
        } => linspace(lower, upper, num_samples),
        SamplingKind::Geom {
            lower,
            upper,
            num_samples,
        } => geomspace(lower, upper, num_samples),
        SamplingKind::ReverseGeom {
            lower,
            upper,
            num_samples,
        } => geomspace(lower, upper, num_samples)
            .into_iter()
            .rev()
            .map(|v| lower + upper - v)
            .collect(),
        _ => Vec::new(),
    }
}

/// Evenly spaced values with both ends included exactly
fn linspace(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lower; n];
    }
    let step = (upper - lower) / (n - 1) as f64;
    let mut values: Vec<f64> = (0..n).map(|i| lower + step * i as f64).collect();
    values[n - 1] = upper;
    values
}

/// Log-spaced values with both ends included exactly
fn geomspace(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lower; n];
    }
    let (log_lo, log_hi) = (lower.ln(), upper.ln());
    let step = (log_hi - log_lo) / (n - 1) as f64;
    let mut values: Vec<f64> = (0..n).map(|i| (log_lo + step * i as f64).exp()).collect();
    values[0] = lower;
    values[n - 1] = upper;
    values
}

/// Row-major cross product of per-parameter grids. `total` is the product of the grid lengths.
fn cross_product(grids: &[Vec<f64>], total: usize) -> Vec<Vec<f64>> {
    let mut rows = Vec::with_capacity(total);
    let mut indices = vec![0usize; grids.len()];

    for _ in 0..total {
        rows.push(
            indices
                .iter()
                .zip(grids)
                .map(|(&idx, grid)| grid[idx])
                .collect(),
        );

        // Increment indices (last dimension varies fastest)
        for dim in (0..grids.len()).rev() {
            indices[dim] += 1;
            if indices[dim] < grids[dim].len() {
                break;
            }
            indices[dim] = 0;
        }
    }
    rows
}

fn transpose(columns: &[Vec<f64>], rows: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect()
}

fn draw_column<R: Rng + ?Sized>(
    param: &ParameterSpec,
    n: usize,
    rng: &mut R,
) -> Result<Vec<f64>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBounds {
        name: param.name.clone(),
        reason,
    };

    match param.kind {
        SamplingKind::Uniform { lower, upper } => {
            let dist = Uniform::new_inclusive(lower, upper).map_err(|e| invalid(e.to_string()))?;
            Ok((0..n).map(|_| dist.sample(rng)).collect())
        }
        SamplingKind::Normal { mean, std_dev } => {
            let dist = Normal::new(mean, std_dev).map_err(|e| invalid(e.to_string()))?;
            Ok((0..n).map(|_| dist.sample(rng)).collect())
        }
        SamplingKind::LatinHypercube { lower, upper } => {
            let mut strata: Vec<usize> = (0..n).collect();
            strata.shuffle(rng);
            let width = (upper - lower) / n as f64;
            Ok(strata
                .into_iter()
                .map(|s| lower + width * (s as f64 + rng.random::<f64>()))
                .collect())
        }
        _ => Ok(fixed_grid(&param.kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, kind: SamplingKind) -> ParameterSpec {
        ParameterSpec::new(name, format!("fs.{name}"), kind)
    }

    #[test]
    fn test_linear_inclusive_endpoints() {
        let values = fixed_grid(&SamplingKind::Linear {
            lower: 1e-12,
            upper: 1e-11,
            num_samples: 100,
        });
        assert_eq!(values.len(), 100);
        assert_eq!(values[0], 1e-12);
        assert_eq!(values[99], 1e-11);

        let step = (1e-11 - 1e-12) / 99.0;
        for pair in values.windows(2) {
            assert!(((pair[1] - pair[0]) - step).abs() < 1e-24);
        }
    }

    #[test]
    fn test_single_point_grid() {
        let values = fixed_grid(&SamplingKind::Linear {
            lower: 0.5,
            upper: 0.9,
            num_samples: 1,
        });
        assert_eq!(values, vec![0.5]);
    }

    #[test]
    fn test_geom_spacing() {
        let values = fixed_grid(&SamplingKind::Geom {
            lower: 1.0,
            upper: 1000.0,
            num_samples: 4,
        });
        let expected = [1.0, 10.0, 100.0, 1000.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-9, "{v} != {e}");
        }
    }

    #[test]
    fn test_reverse_geom_clusters_at_upper() {
        let values = fixed_grid(&SamplingKind::ReverseGeom {
            lower: 1.0,
            upper: 1000.0,
            num_samples: 4,
        });
        let expected = [1.0, 901.0, 991.0, 1000.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-9, "{v} != {e}");
        }
        // Gaps shrink towards the upper bound
        assert!(values[1] - values[0] > values[3] - values[2]);
    }

    #[test]
    fn test_oversized_grid_is_a_config_error() {
        let parameters = (0..10)
            .map(|i| {
                spec(
                    &format!("p{i}"),
                    SamplingKind::Linear {
                        lower: 0.0,
                        upper: 1.0,
                        num_samples: 100,
                    },
                )
            })
            .collect();
        let config = SweepConfig::new(parameters, vec![]);
        assert_eq!(
            Combinations::build(&config, 0),
            Err(ConfigError::TooManyCombinations { parameters: 10 })
        );
    }

    #[test]
    fn test_cross_product_row_major() {
        let config = SweepConfig::new(
            vec![
                spec(
                    "recovery",
                    SamplingKind::Linear {
                        lower: 0.1,
                        upper: 0.3,
                        num_samples: 3,
                    },
                ),
                spec(
                    "NaCl_loading",
                    SamplingKind::Linear {
                        lower: 0.01,
                        upper: 0.02,
                        num_samples: 2,
                    },
                ),
            ],
            vec![],
        );
        let combos = Combinations::build(&config, 0).unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos.shape, Some(vec![3, 2]));
        assert_eq!(combos.rows[0], vec![0.1, 0.01]);
        assert_eq!(combos.rows[1], vec![0.1, 0.02]);
        assert_eq!(combos.rows[5], vec![0.3, 0.02]);
    }

    #[test]
    fn test_random_rows_follow_num_samples() {
        let config = SweepConfig::new(
            vec![
                spec(
                    "A_comp",
                    SamplingKind::Normal {
                        mean: 4.0e-12,
                        std_dev: 0.5e-12,
                    },
                ),
                spec(
                    "cost",
                    SamplingKind::Uniform {
                        lower: 10.0,
                        upper: 50.0,
                    },
                ),
            ],
            vec![],
        )
        .num_samples(25);
        let combos = Combinations::build(&config, 7).unwrap();
        assert_eq!(combos.len(), 25);
        assert!(combos.shape.is_none());
        for cost in combos.column("cost").unwrap() {
            assert!((10.0..=50.0).contains(&cost));
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let config = SweepConfig::new(
            vec![spec(
                "A_comp",
                SamplingKind::Uniform {
                    lower: 1e-12,
                    upper: 1e-11,
                },
            )],
            vec![],
        )
        .num_samples(50);
        let a = Combinations::build(&config, 42).unwrap();
        let b = Combinations::build(&config, 42).unwrap();
        let c = Combinations::build(&config, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_latin_hypercube_one_point_per_stratum() {
        let n = 20;
        let config = SweepConfig::new(
            vec![spec(
                "A_comp",
                SamplingKind::LatinHypercube {
                    lower: 0.0,
                    upper: 1.0,
                },
            )],
            vec![],
        )
        .num_samples(n);
        let combos = Combinations::build(&config, 3).unwrap();
        let mut strata: Vec<usize> = combos
            .column("A_comp")
            .unwrap()
            .into_iter()
            .map(|v| ((v * n as f64) as usize).min(n - 1))
            .collect();
        strata.sort_unstable();
        assert_eq!(strata, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_degenerate_uniform_range() {
        let config = SweepConfig::new(
            vec![spec(
                "fixed",
                SamplingKind::Uniform {
                    lower: 2.0,
                    upper: 2.0,
                },
            )],
            vec![],
        )
        .num_samples(3);
        let combos = Combinations::build(&config, 1).unwrap();
        assert_eq!(combos.column("fixed").unwrap(), vec![2.0, 2.0, 2.0]);
    }
}
