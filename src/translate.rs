//! Translation of library references to `@loader_path` form.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::warn;

use crate::paths::{count_leading_matches, has_library_extension, join, normalize};

/// Directory of the file doing the loading.
pub const LOADER_PATH: &str = "@loader_path";
/// Directory of the main executable of the process.
pub const EXECUTABLE_PATH: &str = "@executable_path";
/// Resolved against the `LC_RPATH` entries at load time.
pub const RPATH: &str = "@rpath";

/// How a library reference is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    LoaderRelative,
    ExecutableRelative,
    SearchPath,
    /// No token. Usually an absolute path.
    Plain,
}

impl ReferenceKind {
    /// Classify a raw reference by its first component.
    pub fn classify(reference: &str) -> Self {
        match reference.split('/').next() {
            Some(LOADER_PATH) => Self::LoaderRelative,
            Some(EXECUTABLE_PATH) => Self::ExecutableRelative,
            Some(RPATH) => Self::SearchPath,
            _ => Self::Plain,
        }
    }
}

/// The file whose references are being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referrer {
    components: Vec<String>,
    executable: bool,
}

impl Referrer {
    /// `executable` is whether any execute bit is set on the file.
    pub fn new(path: &str, executable: bool) -> Self {
        Self {
            components: normalize(path),
            executable,
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Components of the directory containing the file.
    pub fn dir(&self) -> &[String] {
        &self.components[..self.components.len().saturating_sub(1)]
    }

    pub fn path(&self) -> String {
        join(&self.components)
    }

    fn looks_like_library(&self) -> bool {
        self.components
            .last()
            .is_some_and(|name| has_library_extension(name))
    }
}

/// Resolve a reference to the components of the file it names.
///
/// `@loader_path` is replaced by the referrer's directory. `@executable_path`
/// is treated the same way, with a warning when the referrer does not look
/// like an executable. `@rpath` references cannot be resolved without the
/// search path list and are returned as they are, normalized.
pub fn resolve_reference(referrer: &Referrer, reference: &str) -> Vec<String> {
    let kind = ReferenceKind::classify(reference);
    match kind {
        ReferenceKind::LoaderRelative | ReferenceKind::ExecutableRelative => {
            if kind == ReferenceKind::ExecutableRelative
                && (!referrer.executable || referrer.looks_like_library())
            {
                warn!(
                    "Found {EXECUTABLE_PATH} in {reference:?} referenced by {}. Will handle this as {LOADER_PATH}",
                    referrer.path()
                );
            }
            let rest = reference.split_once('/').map_or("", |(_, rest)| rest);
            let mut parts: Vec<&str> = referrer.dir().iter().map(String::as_str).collect();
            parts.push(rest);
            normalize(&parts.join("/"))
        }
        ReferenceKind::SearchPath | ReferenceKind::Plain => normalize(reference),
    }
}

/// Rewrite `reference` relative to the referrer's directory.
///
/// The result is `@loader_path`, one `..` for each directory between the
/// referrer and the deepest directory it shares with the referenced library,
/// then the path from that directory down to the library.
///
/// ```text
/// referrer:  /root/usr/lib/bob/jack/libqwt.6.dylib
/// reference: /root/usr/lib/jill/libQtOpenGL.4.dylib
/// result:    @loader_path/../../jill/libQtOpenGL.4.dylib
/// ```
///
/// `@rpath` references are returned unchanged. A missing target only warns.
///
/// # Errors
///
/// Fails when the reference resolves to the referrer itself or to one of its
/// ancestor directories, which leaves nothing to point at.
pub fn translate_library_path(referrer: &Referrer, reference: &str) -> Result<String> {
    if ReferenceKind::classify(reference) == ReferenceKind::SearchPath {
        warn!(
            "Found {RPATH} in {reference:?} referenced by {}. Leaving it unchanged",
            referrer.path()
        );
        return Ok(reference.to_string());
    }

    let working = resolve_reference(referrer, reference);
    let working_path = join(&working);
    if !Path::new(&working_path).is_file() {
        warn!(
            "Did not find {working_path} for reference {reference:?} in {}",
            referrer.path()
        );
    }

    let common = count_leading_matches(referrer.components(), &working);
    let file_tail = &referrer.components()[common..];
    let ref_tail = &working[common..];
    if file_tail.is_empty() {
        bail!(
            "Zero-length path tail for {} referencing {reference:?}",
            referrer.path()
        );
    }
    if ref_tail.is_empty() {
        bail!(
            "Zero-length reference tail for {reference:?} in {}",
            referrer.path()
        );
    }

    let mut translated = Vec::with_capacity(file_tail.len() + ref_tail.len());
    translated.push(LOADER_PATH.to_string());
    translated.extend(std::iter::repeat_n("..".to_string(), file_tail.len() - 1));
    translated.extend(ref_tail.iter().cloned());
    Ok(join(&translated))
}
