use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SweepError;
use crate::results::{ResultRow, ResultTable, RowOutcome};

/// Column-grouped binary form of a result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArchive {
    pub created: jiff::Timestamp,
    pub seed: u64,
    /// Parameter names in column order
    pub input_names: Vec<String>,
    /// Output names in column order
    pub output_names: Vec<String>,
    pub sweep_params: BTreeMap<String, Vec<f64>>,
    /// Failed rows hold NaN
    pub outputs: BTreeMap<String, Vec<f64>>,
    pub solve_successful: Vec<bool>,
    /// Row index to failure reason
    pub failure_reasons: BTreeMap<usize, String>,
}

impl ResultArchive {
    pub fn from_table(table: &ResultTable, seed: u64) -> Self {
        let outputs = table
            .output_names
            .iter()
            .filter_map(|name| Some((name.clone(), table.column(name)?)))
            .collect();
        let failure_reasons = table
            .rows
            .iter()
            .filter_map(|r| Some((r.index, r.failure_reason()?.to_string())))
            .collect();

        Self {
            created: jiff::Timestamp::now(),
            seed,
            input_names: table.input_names.clone(),
            output_names: table.output_names.clone(),
            sweep_params: table.input_arrays(),
            outputs,
            solve_successful: table.solve_successful(),
            failure_reasons,
        }
    }

    pub fn len(&self) -> usize {
        self.solve_successful.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solve_successful.is_empty()
    }

    /// Rebuild the row-oriented table
    pub fn to_table(&self) -> Option<ResultTable> {
        let len = self.len();
        let inputs = self
            .input_names
            .iter()
            .map(|name| full_column(&self.sweep_params, name, len))
            .collect::<Option<Vec<_>>>()?;
        let outputs = self
            .output_names
            .iter()
            .map(|name| full_column(&self.outputs, name, len))
            .collect::<Option<Vec<_>>>()?;

        let rows = (0..self.len())
            .map(|index| {
                let outcome = if self.solve_successful[index] {
                    RowOutcome::Success(outputs.iter().map(|col| col[index]).collect())
                } else {
                    let reason = self
                        .failure_reasons
                        .get(&index)
                        .cloned()
                        .unwrap_or_else(|| "solve failed".to_string());
                    RowOutcome::Failed(reason)
                };
                ResultRow {
                    index,
                    inputs: inputs.iter().map(|col| col[index]).collect(),
                    outcome,
                }
            })
            .collect();

        Some(ResultTable {
            input_names: self.input_names.clone(),
            output_names: self.output_names.clone(),
            rows,
        })
    }
}

fn full_column<'a>(
    columns: &'a BTreeMap<String, Vec<f64>>,
    name: &str,
    len: usize,
) -> Option<&'a Vec<f64>> {
    columns.get(name).filter(|values| values.len() == len)
}

pub fn write_archive(archive: &ResultArchive, path: &Path) -> Result<(), SweepError> {
    super::ensure_parent(path)?;
    let io_err = |source| SweepError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, archive).map_err(|source| SweepError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

pub fn read_archive(path: &Path) -> Result<ResultArchive, SweepError> {
    let file = File::open(path).map_err(|source| SweepError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|source| SweepError::Archive {
        path: path.to_path_buf(),
        source,
    })
}
