//! Rewriting install names and library references with install_name_tool.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, error, warn};

/// Changes to apply to a single binary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    /// New install name (`-id`).
    pub new_id: Option<String>,
    /// Library references to replace, old then new (`-change`).
    pub change_refs: Vec<(String, String)>,
    /// Run path entries to replace, old then new (`-rpath`).
    pub change_rpaths: Vec<(String, String)>,
    /// Run path entries to add (`-add_rpath`).
    pub add_rpaths: Vec<String>,
    /// Run path entries to remove (`-delete_rpath`).
    pub delete_rpaths: Vec<String>,
}

impl RewritePlan {
    pub fn is_empty(&self) -> bool {
        self.new_id.is_none()
            && self.change_refs.is_empty()
            && self.change_rpaths.is_empty()
            && self.add_rpaths.is_empty()
            && self.delete_rpaths.is_empty()
    }

    /// Flags for install_name_tool, without the trailing file name.
    pub fn install_name_tool_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(id) = &self.new_id {
            args.extend(["-id".to_string(), id.clone()]);
        }
        for (old, new) in &self.change_refs {
            args.extend(["-change".to_string(), old.clone(), new.clone()]);
        }
        for (old, new) in &self.change_rpaths {
            args.extend(["-rpath".to_string(), old.clone(), new.clone()]);
        }
        for new in &self.add_rpaths {
            args.extend(["-add_rpath".to_string(), new.clone()]);
        }
        for old in &self.delete_rpaths {
            args.extend(["-delete_rpath".to_string(), old.clone()]);
        }
        args
    }
}

/// Apply a plan to a binary in place.
///
/// An empty plan does nothing and does not run the tool.
///
/// # Errors
///
/// Returns an error if install_name_tool cannot be run or exits
/// unsuccessfully. Output on either stream is logged but is not an error.
pub fn install_name_tool(tool: &Path, binary_path: &Path, plan: &RewritePlan) -> Result<()> {
    if plan.is_empty() {
        return Ok(());
    }

    let args = plan.install_name_tool_args();
    debug!(
        "{} {} {}",
        tool.display(),
        args.join(" "),
        binary_path.display()
    );

    let output = Command::new(tool)
        .args(&args)
        .arg(binary_path)
        .output()
        .with_context(|| {
            format!(
                "Failed to run {} - install the Xcode command line tools",
                tool.display()
            )
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stdout.is_empty() || !stderr.is_empty() {
        let report = format!(
            "cmd={} {} {}\n\tstatus={}\n\tstdout={:?}\n\tstderr={:?}",
            tool.display(),
            args.join(" "),
            binary_path.display(),
            output.status,
            stdout,
            stderr
        );
        if output.status.success() {
            warn!("{report}");
        } else {
            error!("{report}");
        }
    }

    if !output.status.success() {
        bail!(
            "{} exited with {} while rewriting {}",
            tool.display(),
            output.status,
            binary_path.display()
        );
    }

    Ok(())
}
