//! Persisting sweep results.
//!
//! Two forms carry the same logical content:
//! - CSV: one row per combination, input columns, output columns, then a
//!   `solve_successful` flag
//! - Binary archive: column-grouped arrays with run metadata, for larger runs

mod archive;
mod csv_file;

pub use archive::{ResultArchive, read_archive, write_archive};
pub use csv_file::{SUCCESS_COLUMN, read_csv, write_csv};

use std::path::Path;

use crate::error::SweepError;

/// Create the parent directory of `path` if it has one
pub(crate) fn ensure_parent(path: &Path) -> Result<(), SweepError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| SweepError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
