//! Configuration for hop
//!
//! All configuration is environment-style: a `Config` is read once from the
//! `HOP_*` variables at startup and passed down explicitly. Paths in list
//! variables are colon-separated.

use crate::matcher::CaseMode;
use crate::{HopError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default ceiling on the sum of all ranks before a global decay pass.
pub const DEFAULT_MAX_SCORE: f64 = 9000.0;

/// Name of the data file placed in the home directory by default.
const DEFAULT_DATA_NAME: &str = ".hop";

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Location of the backing data file (`HOP_DATA`, default `~/.hop`).
    pub data_path: PathBuf,
    /// Home directory; visits to it are never recorded.
    pub home: PathBuf,
    /// Ceiling on the rank sum before decay (`HOP_MAX_SCORE`).
    pub max_score: f64,
    /// Roots under which visits are never recorded (`HOP_EXCLUDE_DIRS`).
    pub exclude_dirs: Vec<PathBuf>,
    /// Roots whose entries survive existence pruning (`HOP_KEEP_DIRS`).
    pub keep_dirs: Vec<PathBuf>,
    /// Case comparison policy for queries (`HOP_CASE`).
    pub case_mode: CaseMode,
    /// Skip canonicalizing visited paths (`HOP_NO_RESOLVE_SYMLINKS`).
    pub no_resolve_symlinks: bool,
    /// Chown the data file to this user after each commit (`HOP_OWNER`).
    pub owner: Option<String>,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().ok_or(HopError::NoHomeDirectory)?;
        Ok(Self::from_env_with_home(home))
    }

    /// Like [`Config::from_env`] but with an explicit home directory.
    pub fn from_env_with_home(home: PathBuf) -> Self {
        let data_path = std::env::var_os("HOP_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(DEFAULT_DATA_NAME));

        let max_score = std::env::var("HOP_MAX_SCORE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_SCORE);

        let case_mode = std::env::var("HOP_CASE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            data_path,
            home,
            max_score,
            exclude_dirs: split_path_list(std::env::var("HOP_EXCLUDE_DIRS").ok()),
            keep_dirs: split_path_list(std::env::var("HOP_KEEP_DIRS").ok()),
            case_mode,
            no_resolve_symlinks: std::env::var_os("HOP_NO_RESOLVE_SYMLINKS").is_some(),
            owner: std::env::var("HOP_OWNER").ok().filter(|v| !v.is_empty()),
        }
    }

    /// A minimal config for a given data file, used by tests and embedders.
    pub fn for_data_path(data_path: PathBuf, home: PathBuf) -> Self {
        Self {
            data_path,
            home,
            max_score: DEFAULT_MAX_SCORE,
            exclude_dirs: Vec::new(),
            keep_dirs: Vec::new(),
            case_mode: CaseMode::default(),
            no_resolve_symlinks: false,
            owner: None,
        }
    }

    /// True if `path` is the home directory or sits under an excluded root.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if path == self.home {
            return true;
        }
        self.exclude_dirs
            .iter()
            .any(|root| path_is_under(path, root))
    }

    /// True if `path` is protected from existence pruning by the keep-list.
    pub fn is_kept(&self, path: &Path) -> bool {
        self.keep_dirs
            .iter()
            .any(|root| root == Path::new("/") || path_is_under(path, root))
    }
}

/// Component-boundary containment check: `/a/bc` is not under `/a/b`.
pub(crate) fn path_is_under(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

fn split_path_list(value: Option<String>) -> Vec<PathBuf> {
    value
        .map(|v| {
            v.split(':')
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}
