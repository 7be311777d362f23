use std::{
    fs,
    path::{Path, PathBuf},
};

use super::LoggerError;

pub const DEFAULT_FILE: &str = "logger.log";
pub const DEFAULT_DIR: &str = "./";
pub const DEFAULT_FORMAT: &str = "(%{T})[%{D}-%{M}-%{Y}, %{H}:%{i}] - %{R}";
pub const DEFAULT_ERROR_FORMAT: &str =
    "(%{T})[%{D}-%{M}-%{Y}, %{H}:%{i}]( %{N} {%{F},%{L}} [%{E}] - {%{A}}) - %{R}";

/// Only existing files with this extension may be appended to.
pub const LOG_EXTENSION: &str = "log";

/// Resolves `dir` to an absolute path and checks that it is an existing
/// directory the process can read and write.
pub fn check_dir(dir: impl AsRef<Path>) -> Result<PathBuf, LoggerError> {
    let dir = dir.as_ref();
    let resolved = fs::canonicalize(dir)
        .ok()
        .filter(|path| path.is_dir())
        .ok_or_else(|| {
            LoggerError::config(format!(
                "the path {} does not exist or is not a directory",
                dir.display()
            ))
        })?;

    if !readable_writable(&resolved) {
        return Err(LoggerError::config(format!(
            "read and write permissions are required for the directory {}",
            resolved.display()
        )));
    }

    Ok(resolved)
}

/// Resolves the file name (any leading path is dropped) inside `dir`.
///
/// A file that doesn't exist yet is accepted as is. An existing one must be a
/// regular file with the `.log` extension and read/write permissions, so that
/// unrelated files are never appended to.
pub fn check_file(dir: &Path, file: impl AsRef<Path>) -> Result<PathBuf, LoggerError> {
    let file = file.as_ref();
    let name = file.file_name().ok_or_else(|| {
        LoggerError::config(format!("{} does not name a file", file.display()))
    })?;
    let path = dir.join(name);

    let Ok(metadata) = fs::symlink_metadata(&path) else {
        return Ok(path);
    };

    if !metadata.is_file() {
        return Err(LoggerError::config(format!(
            "{} is not a file",
            path.display()
        )));
    }

    if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
        return Err(LoggerError::config(format!(
            "{} is not a .{} file, only log files are appended to",
            path.display(),
            LOG_EXTENSION
        )));
    }

    if !readable_writable(&path) {
        return Err(LoggerError::config(format!(
            "read and write permissions are required for the file {}",
            path.display()
        )));
    }

    Ok(path)
}

/// Whether this process may read and write `path`, as the kernel sees it.
#[cfg(unix)]
fn readable_writable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    access(path, AccessFlags::R_OK | AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn readable_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| !metadata.permissions().readonly())
        .unwrap_or(false)
}
