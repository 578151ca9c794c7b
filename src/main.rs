use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

use leviso_relink::{Config, Relinker, SystemTools, Verbosity};

mod logging;

/// Rewrite library references inside each ROOT to use @loader_path.
#[derive(Parser, Debug)]
#[command(name = "leviso-relink", version)]
struct Cli {
    /// Directory trees to process, each on its own.
    #[arg(value_name = "ROOT")]
    roots: Vec<PathBuf>,

    /// Report more: once for every change, twice for every file with library references.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// The otool program.
    #[arg(long, env = "LEVISO_OTOOL", value_name = "PATH")]
    otool: Option<PathBuf>,

    /// The install_name_tool program.
    #[arg(long, env = "LEVISO_INSTALL_NAME_TOOL", value_name = "PATH")]
    install_name_tool: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new(Verbosity::new(self.verbose));
        if let Some(otool) = &self.otool {
            config = config.with_otool(otool.clone());
        }
        if let Some(install_name_tool) = &self.install_name_tool {
            config = config.with_install_name_tool(install_name_tool.clone());
        }
        config
    }
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    if cli.roots.is_empty() {
        warn!("No ROOT given, nothing to do. Usage: leviso-relink [-v] [-v] ROOT...");
        return Ok(());
    }

    let tools = SystemTools::from_config(config);
    let relinker = Relinker::new(&tools, config.verbosity);
    for root in &cli.roots {
        let summary = relinker.relink_tree(root)?;
        debug!(
            "{}: {} candidates, {} with library references, {} rewritten",
            root.display(),
            summary.candidates,
            summary.inspected,
            summary.rewritten
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    logging::setup_logging(config.verbosity);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
