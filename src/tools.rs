//! Access to the external binary tools.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::analyze::{get_library_dependencies, get_library_id};
use crate::config::Config;
use crate::rewrite::{install_name_tool, RewritePlan};

/// Inspection and rewriting of binaries.
///
/// [`SystemTools`] runs `otool` and `install_name_tool`. Tests substitute an
/// in-memory implementation.
pub trait BinaryTools {
    /// Install name of the file, if it has one.
    fn library_id(&self, path: &Path) -> Result<Option<String>>;

    /// Library references of the file, in load command order.
    fn library_dependencies(&self, path: &Path) -> Result<Vec<String>>;

    /// Apply `plan` to the file. Must do nothing for an empty plan.
    fn apply(&self, path: &Path, plan: &RewritePlan) -> Result<()>;
}

/// [`BinaryTools`] backed by the Xcode command line tools.
#[derive(Debug, Clone)]
pub struct SystemTools {
    otool: PathBuf,
    install_name_tool: PathBuf,
}

impl SystemTools {
    pub fn new(otool: impl Into<PathBuf>, install_name_tool: impl Into<PathBuf>) -> Self {
        Self {
            otool: otool.into(),
            install_name_tool: install_name_tool.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.otool, &config.install_name_tool)
    }
}

impl BinaryTools for SystemTools {
    fn library_id(&self, path: &Path) -> Result<Option<String>> {
        get_library_id(&self.otool, path)
    }

    fn library_dependencies(&self, path: &Path) -> Result<Vec<String>> {
        get_library_dependencies(&self.otool, path)
    }

    fn apply(&self, path: &Path, plan: &RewritePlan) -> Result<()> {
        install_name_tool(&self.install_name_tool, path, plan)
    }
}
