//! Writing a solved model as an optimization problem file.
//!
//! Files land in a per-format subdirectory of the package directory:
//! `<package_dir>/nl_files/<fname>.nl` or `<package_dir>/gms_files/<fname>.gms`.
//! A file name that already carries the format's extension is kept as given.

use std::path::{Path, PathBuf};

use crate::error::SerializeError;
use crate::model::{ProblemFormat, ProblemWriter, WriteOptions};

/// Path a problem file of `format` named `fname` is written to
pub fn problem_path(package_dir: &Path, fname: &str, format: ProblemFormat) -> PathBuf {
    let dir = package_dir.join(format.directory());
    let has_extension = Path::new(fname)
        .extension()
        .is_some_and(|ext| ext == format.tag());
    if has_extension {
        dir.join(fname)
    } else {
        dir.join(format!("{fname}.{}", format.tag()))
    }
}

/// Serialize `model` in the format named by `tag` (`"nl"` or `"gms"`).
///
/// The tag is checked before anything touches the filesystem, so an
/// unsupported tag creates no directories and writes no file.
pub fn serialize<M: ProblemWriter + ?Sized>(
    model: &M,
    package_dir: &Path,
    fname: &str,
    tag: &str,
) -> Result<PathBuf, SerializeError> {
    let format = ProblemFormat::from_tag(tag)?;
    let path = problem_path(package_dir, fname, format);

    let io_err = |source| SerializeError::Io {
        path: path.clone(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }

    model
        .write_problem(
            &path,
            format,
            WriteOptions {
                symbolic_solver_labels: true,
            },
        )
        .map_err(io_err)?;

    tracing::info!(path = %path.display(), format = format.tag(), "serialized model");
    Ok(path)
}
