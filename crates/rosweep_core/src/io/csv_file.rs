use std::path::Path;

use crate::error::SweepError;
use crate::results::{ResultRow, ResultTable, RowOutcome};

/// Name of the trailing success flag column
pub const SUCCESS_COLUMN: &str = "solve_successful";

/// Write a result table as CSV.
///
/// Values use Rust's shortest round-trip formatting, so reading the file back
/// reproduces them exactly. Outputs of failed rows are written as `nan`.
pub fn write_csv(table: &ResultTable, path: &Path) -> Result<(), SweepError> {
    super::ensure_parent(path)?;
    let csv_err = |source| SweepError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;

    let header = table
        .input_names
        .iter()
        .chain(&table.output_names)
        .map(String::as_str)
        .chain([SUCCESS_COLUMN]);
    wtr.write_record(header).map_err(csv_err)?;

    for row in &table.rows {
        let mut record: Vec<String> = row.inputs.iter().map(|v| format_value(*v)).collect();
        match row.outputs() {
            Some(values) => record.extend(values.iter().map(|v| format_value(*v))),
            None => record.extend(table.output_names.iter().map(|_| "nan".to_string())),
        }
        record.push(u8::from(row.is_success()).to_string());
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush().map_err(|source| SweepError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read a CSV written by [`write_csv`].
///
/// `num_inputs` splits the value columns into inputs and outputs. Rows are
/// re-indexed in file order. Failure reasons are not stored in CSV, so failed
/// rows come back with a generic reason.
pub fn read_csv(path: &Path, num_inputs: usize) -> Result<ResultTable, SweepError> {
    let csv_err = |source| SweepError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let malformed = |reason: String| SweepError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let has_flag = headers.last().is_some_and(|h| h == SUCCESS_COLUMN);
    let value_columns = headers.len() - usize::from(has_flag);
    if num_inputs > value_columns {
        return Err(malformed(format!(
            "expected {num_inputs} input columns, file has {value_columns} value columns"
        )));
    }

    let input_names = headers[..num_inputs].to_vec();
    let output_names = headers[num_inputs..value_columns].to_vec();
    let mut table = ResultTable::new(input_names, output_names);

    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let values = record
            .iter()
            .take(value_columns)
            .map(|field| {
                parse_value(field)
                    .ok_or_else(|| malformed(format!("row {index}: `{field}` is not a number")))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let success = match record.get(value_columns) {
            Some(flag) if has_flag => flag.trim() == "1" || flag.trim() == "true",
            _ => values[num_inputs..].iter().all(|v| !v.is_nan()),
        };

        let outcome = if success {
            RowOutcome::Success(values[num_inputs..].to_vec())
        } else {
            RowOutcome::Failed("solve failed".to_string())
        };
        table.rows.push(ResultRow {
            index,
            inputs: values[..num_inputs].to_vec(),
            outcome,
        });
    }

    Ok(table)
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:?}")
    }
}

fn parse_value(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_round_trips() {
        for v in [1e-12, 0.1 + 0.2, -3.5, 1e300, 0.0] {
            assert_eq!(parse_value(&format_value(v)), Some(v));
        }
        assert!(parse_value("NaN").unwrap().is_nan());
        assert_eq!(parse_value(" 2.5 "), Some(2.5));
        assert_eq!(parse_value("abc"), None);
    }
}
