//! Mach-O binary analysis using otool.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{trace, warn};

/// What `otool` is asked to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtoolMode {
    /// `otool -D`: the install name of a shared library.
    LibraryId,
    /// `otool -L`: the libraries a binary links against.
    Dependencies,
}

impl OtoolMode {
    pub fn flag(self) -> &'static str {
        match self {
            Self::LibraryId => "-D",
            Self::Dependencies => "-L",
        }
    }
}

/// Run `otool` and return its stdout.
///
/// Returns `Ok(None)` if otool exits unsuccessfully, which is what it does
/// for files that are not Mach-O binaries (scripts, data files).
fn run_otool(otool: &Path, mode: OtoolMode, binary_path: &Path) -> Result<Option<String>> {
    trace!("{} {} {}", otool.display(), mode.flag(), binary_path.display());

    let output = Command::new(otool)
        .arg(mode.flag())
        .arg(binary_path)
        .output()
        .with_context(|| {
            format!(
                "Failed to run {} - install the Xcode command line tools",
                otool.display()
            )
        })?;

    if !output.status.success() {
        return Ok(None);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!(
            "otool {} {} stderr: {}",
            mode.flag(),
            binary_path.display(),
            stderr.trim()
        );
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}

/// Get the install name of a shared library.
///
/// Returns `Ok(None)` for files without one: executables, bundles, and
/// anything otool does not understand.
///
/// # Errors
///
/// Returns an error if otool cannot be run or its output does not start by
/// echoing the file name.
pub fn get_library_id(otool: &Path, binary_path: &Path) -> Result<Option<String>> {
    match run_otool(otool, OtoolMode::LibraryId, binary_path)? {
        Some(stdout) => parse_library_id(&binary_path.to_string_lossy(), &stdout),
        None => Ok(None),
    }
}

/// Get the libraries a binary links against, as written in the binary.
///
/// For a shared library the first entry is usually its own install name.
///
/// # Errors
///
/// Same as [`get_library_id`].
#[must_use = "library dependencies should be processed"]
pub fn get_library_dependencies(otool: &Path, binary_path: &Path) -> Result<Vec<String>> {
    match run_otool(otool, OtoolMode::Dependencies, binary_path)? {
        Some(stdout) => parse_library_dependencies(&binary_path.to_string_lossy(), &stdout),
        None => Ok(Vec::new()),
    }
}

/// Check the header line and return the remaining non-blank lines.
///
/// otool always starts with the file name as given, followed by a colon.
fn body_lines<'a>(file: &str, mode: OtoolMode, output: &'a str) -> Result<Vec<&'a str>> {
    let mut lines = output.lines();
    let Some(first) = lines.next() else {
        return Ok(Vec::new());
    };

    let expected = format!("{file}:");
    if first != expected {
        bail!(
            "Unexpected first line from otool {} {}: {:?} (expected {:?})",
            mode.flag(),
            file,
            first,
            expected
        );
    }

    Ok(lines.filter(|line| !line.trim().is_empty()).collect())
}

/// Parse `otool -D` output.
///
/// ```text
/// /opt/app/usr/lib/libqwt.6.dylib:
/// /opt/app/usr/lib/libqwt.6.dylib
/// ```
pub fn parse_library_id(file: &str, output: &str) -> Result<Option<String>> {
    let lines = body_lines(file, OtoolMode::LibraryId, output)?;
    if lines.len() > 1 {
        warn!("otool -D {file} returned more than one id: {lines:?}");
    }
    Ok(lines.first().map(|line| line.trim().to_string()))
}

/// Parse `otool -L` output, dropping the version annotation of each line.
///
/// ```text
/// /opt/app/usr/lib/libqwt.6.dylib:
/// 	/opt/app/usr/lib/libqwt.6.dylib (compatibility version 6.1.0, current version 6.1.3)
/// 	/opt/X11/lib/libSM.6.dylib (compatibility version 7.0.0, current version 7.1.0)
/// 	/usr/lib/libSystem.B.dylib (compatibility version 1.0.0, current version 1238.60.2)
/// ```
pub fn parse_library_dependencies(file: &str, output: &str) -> Result<Vec<String>> {
    let lines = body_lines(file, OtoolMode::Dependencies, output)?;

    let mut libs = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim();
        if !line.ends_with(')') {
            warn!("otool -L {file} line does not end with \")\": {line:?}");
            libs.push(line.to_string());
            continue;
        }
        match line.rfind(" (") {
            Some(end) => libs.push(line[..end].to_string()),
            None => {
                warn!("otool -L {file} line ends with \")\" but has no \" (\": {line:?}");
                libs.push(line.to_string());
            }
        }
    }

    Ok(libs)
}
