//! Run configuration.

use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// How much the run reports, from repeated `-v` flags.
///
/// 0 reports only warnings and errors, 1 adds every change made, 2 adds every
/// file found to carry an install name or library references.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    pub fn new(level: u8) -> Self {
        Self(level)
    }

    pub fn reports_changes(self) -> bool {
        self.0 >= 1
    }

    pub fn reports_files(self) -> bool {
        self.0 >= 2
    }

    /// Default log filter for this verbosity. `RUST_LOG` takes precedence.
    pub fn level_filter(self) -> LevelFilter {
        match self.0 {
            0 => LevelFilter::WARN,
            1 | 2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub verbosity: Verbosity,
    /// Program used to inspect binaries.
    pub otool: PathBuf,
    /// Program used to rewrite binaries.
    pub install_name_tool: PathBuf,
}

impl Config {
    /// Configuration using `otool` and `install_name_tool` found on `PATH`.
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            otool: locate_tool("otool"),
            install_name_tool: locate_tool("install_name_tool"),
        }
    }

    #[must_use]
    pub fn with_otool(mut self, otool: PathBuf) -> Self {
        self.otool = otool;
        self
    }

    #[must_use]
    pub fn with_install_name_tool(mut self, install_name_tool: PathBuf) -> Self {
        self.install_name_tool = install_name_tool;
        self
    }
}

/// Find a program on `PATH`.
///
/// Falls back to the bare name so that running it reports the failure.
pub fn locate_tool(name: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}
