//! Mach-O install name rewriting for relocatable bundles.
//!
//! Rewrites the library references of every executable and shared library in
//! a directory tree so that references into the tree are relative to the
//! referencing file (`@loader_path/...`). The tree can then be moved as a
//! unit. Binaries are inspected with `otool` and rewritten with
//! `install_name_tool`; the Mach-O format itself is never parsed here.

mod analyze;
mod config;
mod paths;
mod process;
mod rewrite;
#[cfg(test)]
mod testing;
mod tools;
mod translate;
mod walk;

pub use analyze::{
    get_library_dependencies, get_library_id, parse_library_dependencies, parse_library_id,
    OtoolMode,
};
pub use config::{locate_tool, Config, Verbosity};
pub use paths::{
    count_leading_matches, has_library_extension, is_subpath, join, normalize, path_is_subpath,
    LIBRARY_EXTENSIONS,
};
pub use process::{RelinkSummary, Relinker};
pub use rewrite::{install_name_tool, RewritePlan};
pub use tools::{BinaryTools, SystemTools};
pub use translate::{
    resolve_reference, translate_library_path, ReferenceKind, Referrer, EXECUTABLE_PATH,
    LOADER_PATH, RPATH,
};
pub use walk::{walk_tree, Candidate};
