//! Rewriting the binaries of a tree to reference each other via `@loader_path`.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::Verbosity;
use crate::paths::{is_subpath, join, normalize};
use crate::rewrite::RewritePlan;
use crate::tools::BinaryTools;
use crate::translate::{translate_library_path, Referrer};
use crate::walk::{walk_tree, Candidate};

/// Counts from one [`Relinker::relink_tree`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelinkSummary {
    /// Executables and libraries visited.
    pub candidates: usize,
    /// Files with an install name or library references.
    pub inspected: usize,
    /// Files handed a non-empty plan.
    pub rewritten: usize,
}

/// Prints the file name once, before the first line reported for it.
struct Report<'a> {
    path: &'a Path,
    written: bool,
}

impl<'a> Report<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            written: false,
        }
    }

    fn header(&mut self) {
        if !self.written {
            info!("{}", self.path.display());
            self.written = true;
        }
    }
}

pub struct Relinker<'a, T: BinaryTools> {
    tools: &'a T,
    verbosity: Verbosity,
}

impl<'a, T: BinaryTools> Relinker<'a, T> {
    pub fn new(tools: &'a T, verbosity: Verbosity) -> Self {
        Self { tools, verbosity }
    }

    /// Rewrite every executable and library under `root`.
    ///
    /// Relative roots are made absolute against the current directory,
    /// without resolving symlinks.
    pub fn relink_tree(&self, root: &Path) -> Result<RelinkSummary> {
        let root = std::path::absolute(root)
            .with_context(|| format!("Failed to make {} absolute", root.display()))?;
        let root_components = normalize(&root.to_string_lossy());

        let mut summary = RelinkSummary::default();
        walk_tree(&root, |candidate| {
            summary.candidates += 1;
            if let Some(plan) = self.process_file(&root_components, candidate)? {
                summary.inspected += 1;
                if !plan.is_empty() {
                    summary.rewritten += 1;
                }
            }
            Ok(())
        })?;

        Ok(summary)
    }

    /// Rewrite one file whose path lies under `root` (normalized components).
    ///
    /// The install name is reduced to its file name and every reference into
    /// `root` becomes `@loader_path` relative. References outside `root` are
    /// left alone. Returns the applied plan, or `None` if the file has neither
    /// an install name nor references.
    ///
    /// # Errors
    ///
    /// Fails if the file is not under `root`, if a reference cannot be
    /// translated, or if the tools fail.
    pub fn process_file(
        &self,
        root: &[String],
        candidate: &Candidate,
    ) -> Result<Option<RewritePlan>> {
        let path = candidate.path.as_path();
        let mut refs = self.tools.library_dependencies(path)?;
        let id = self.tools.library_id(path)?;

        // otool -L lists a library's own install name first.
        if id.is_some() && refs.first() == id.as_ref() {
            refs.remove(0);
        }
        if refs.is_empty() && id.is_none() {
            return Ok(None);
        }

        let mut report = Report::new(path);
        if self.verbosity.reports_files() {
            report.header();
        }

        let referrer = Referrer::new(&path.to_string_lossy(), candidate.executable);
        if !is_subpath(root, referrer.components()) {
            bail!(
                "{} is not under its root {}",
                path.display(),
                join(root)
            );
        }

        let mut plan = RewritePlan::default();

        if let Some(id) = &id {
            let name = id.rsplit('/').next().unwrap_or(id);
            if !name.is_empty() && name != id {
                if self.verbosity.reports_changes() {
                    report.header();
                    info!("\tid: {id:?} -> {name:?}");
                }
                plan.new_id = Some(name.to_string());
            }
        }

        for reference in refs
            .iter()
            .filter(|reference| is_subpath(root, &normalize(reference)))
        {
            let translated = translate_library_path(&referrer, reference)?;
            if translated != *reference {
                if self.verbosity.reports_changes() {
                    report.header();
                    info!("\tref: {reference:?} -> {translated:?}");
                }
                plan.change_refs.push((reference.clone(), translated));
            }
        }

        self.tools.apply(path, &plan)?;
        Ok(Some(plan))
    }
}
