//! Resolution of the out-of-process converter executable.
//!
//! Resolution is deferred until dispatch: the converter may be installed or
//! removed after the process starts, and each dispatch sees the current state.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::BackendConfig;

/// Where to look for the converter executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryLocator {
    /// Preferred location, e.g. next to the package resources of a source build.
    preferred: Option<PathBuf>,
    /// Program name searched on `PATH` when the preferred path is absent.
    program: Option<String>,
}

/// Outcome of resolving a `BinaryLocator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryResolution {
    Found(PathBuf),
    NotFound { searched: String },
}

impl BinaryLocator {
    /// Look the program up on `PATH`.
    pub fn search_path(program: impl Into<String>) -> Self {
        Self {
            preferred: None,
            program: Some(program.into()),
        }
    }

    /// Prefer the converter bundled relative to `resource_dir`, falling back to
    /// the default program name on `PATH`.
    pub fn bundled(resource_dir: impl AsRef<Path>) -> Self {
        Self {
            preferred: Some(resource_dir.as_ref().join(BackendConfig::BUNDLED_RELATIVE_PATH)),
            program: Some(BackendConfig::DEFAULT_BINARY_NAME.to_string()),
        }
    }

    /// Use exactly this path, with no search fallback.
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            preferred: Some(path.into()),
            program: None,
        }
    }

    pub fn resolve(&self) -> BinaryResolution {
        if let Some(path) = &self.preferred {
            if path.is_file() {
                return BinaryResolution::Found(path.clone());
            }
        }
        if let Some(program) = &self.program {
            if let Some(found) = find_on_path(program, std::env::var_os("PATH")) {
                return BinaryResolution::Found(found);
            }
        }
        BinaryResolution::NotFound {
            searched: self.describe(),
        }
    }

    fn describe(&self) -> String {
        match (&self.preferred, &self.program) {
            (Some(path), Some(program)) => format!("{} or {program} on PATH", path.display()),
            (Some(path), None) => path.display().to_string(),
            (None, Some(program)) => format!("{program} on PATH"),
            (None, None) => "nothing".to_string(),
        }
    }
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::search_path(BackendConfig::DEFAULT_BINARY_NAME)
    }
}

/// Find `program` in the directories of `path_var`.
///
/// A program containing a path separator is checked as a path directly.
///
/// # Platform Behavior
/// - **Linux/macOS**: `{dir}/{program}`
/// - **Windows**: also tries `{dir}/{program}.exe`
fn find_on_path(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return as_path.is_file().then(|| as_path.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
