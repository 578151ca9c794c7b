//! Lexical path helpers.
//!
//! Paths are handled as component sequences, the way the dynamic loader sees
//! install names: an absolute path starts with an empty component, and a
//! token-relative reference starts with its token (`@loader_path`, ...).
//! Nothing here touches the filesystem.

/// File name suffixes treated as dynamic libraries even without an execute bit.
pub const LIBRARY_EXTENSIONS: &[&str] = &[".dylib", ".so"];

/// Split a path into normalized components.
///
/// Redundant separators and `.` segments are removed and `..` is collapsed
/// against the preceding component. A `..` directly under the root of an
/// absolute path is dropped; leading `..` of a relative path are kept.
///
/// ```text
/// "../..//some/.///path//"     -> ["..", "..", "some", "path"]
/// "////../..//some/.///path//" -> ["", "some", "path"]
/// ```
pub fn normalize(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut parts: Vec<String> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..".to_string());
                }
            }
            other => parts.push(other.to_string()),
        }
    }

    if absolute {
        parts.insert(0, String::new());
    } else if parts.is_empty() {
        parts.push(".".to_string());
    }
    parts
}

/// Join components back into a `/`-separated path.
pub fn join(components: &[String]) -> String {
    match components {
        [root] if root.is_empty() => "/".to_string(),
        _ => components.join("/"),
    }
}

/// Whether `path` lies at or below `root`. Both must already be normalized.
pub fn is_subpath(root: &[String], path: &[String]) -> bool {
    path.starts_with(root)
}

/// [`is_subpath`] for raw path strings.
pub fn path_is_subpath(root: &str, path: &str) -> bool {
    is_subpath(&normalize(root), &normalize(path))
}

/// Number of leading components the two sequences share.
pub fn count_leading_matches(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Whether a file name carries one of the [`LIBRARY_EXTENSIONS`].
pub fn has_library_extension(name: &str) -> bool {
    LIBRARY_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
