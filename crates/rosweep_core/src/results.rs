//! Sweep results: one row per combination, plus run metadata.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one combination. A row is never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowOutcome {
    /// Output values in the table's `output_names` order
    Success(Vec<f64>),
    /// Why the combination failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Combination index, the row's position in the final table
    pub index: usize,
    /// Input values in the table's `input_names` order
    pub inputs: Vec<f64>,
    pub outcome: RowOutcome,
}

impl ResultRow {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RowOutcome::Success(_))
    }

    pub fn outputs(&self) -> Option<&[f64]> {
        match &self.outcome {
            RowOutcome::Success(values) => Some(values),
            RowOutcome::Failed(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            RowOutcome::Success(_) => None,
            RowOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// The result table of one sweep, rows ordered by combination index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(input_names: Vec<String>, output_names: Vec<String>) -> Self {
        Self {
            input_names,
            output_names,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Success flag of every row
    pub fn solve_successful(&self) -> Vec<bool> {
        self.rows.iter().map(ResultRow::is_success).collect()
    }

    /// Values of an input or output column. Failed rows read as NaN for outputs.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if let Some(idx) = self.input_names.iter().position(|n| n == name) {
            return Some(self.rows.iter().map(|r| r.inputs[idx]).collect());
        }
        let idx = self.output_names.iter().position(|n| n == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.outputs().map_or(f64::NAN, |values| values[idx]))
                .collect(),
        )
    }

    /// Output name to values across all combinations, or `None` if every row failed
    pub fn output_arrays(&self) -> Option<BTreeMap<String, Vec<f64>>> {
        if self.success_count() == 0 {
            return None;
        }
        Some(
            self.output_names
                .iter()
                .filter_map(|name| Some((name.clone(), self.column(name)?)))
                .collect(),
        )
    }

    /// Input name to values across all combinations
    pub fn input_arrays(&self) -> BTreeMap<String, Vec<f64>> {
        self.input_names
            .iter()
            .filter_map(|name| Some((name.clone(), self.column(name)?)))
            .collect()
    }

    /// Merge rows gathered from several workers, ordering by combination index.
    pub fn gather(
        input_names: Vec<String>,
        output_names: Vec<String>,
        parts: impl IntoIterator<Item = Vec<ResultRow>>,
    ) -> Self {
        let mut rows: Vec<ResultRow> = parts.into_iter().flatten().collect();
        rows.sort_by_key(|r| r.index);
        Self {
            input_names,
            output_names,
            rows,
        }
    }
}

/// Wall-clock time spent in each sweep phase
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepTimings {
    pub building_combinations: Duration,
    pub sweep_solves: Duration,
    pub gathering_results: Duration,
    pub writing_files: Duration,
}

impl SweepTimings {
    pub fn total(&self) -> Duration {
        self.building_combinations + self.sweep_solves + self.gathering_results + self.writing_files
    }

    /// Accumulate another stage's timings
    pub fn add(&mut self, other: &SweepTimings) {
        self.building_combinations += other.building_combinations;
        self.sweep_solves += other.sweep_solves;
        self.gathering_results += other.gathering_results;
        self.writing_files += other.writing_files;
    }
}

/// Everything a finished sweep returns
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub table: ResultTable,
    /// Output name to values across combinations; `None` if every combination failed
    pub global_results: Option<BTreeMap<String, Vec<f64>>>,
    /// Seed the combinations were drawn with
    pub seed: u64,
    pub timings: SweepTimings,
}
