//! Shared utilities for command implementations.

use std::fs;
use std::path::PathBuf;

use rustc_hash::FxHashSet;

use crate::utils::collect_template_files;

/// Search settings resolved from the CLI and the config file.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Extensions to collect, without the dot.
    pub extensions: Vec<String>,
    /// Extra folders to skip.
    pub exclude: Vec<String>,
    /// Folders to walk even when excluded by default.
    pub include: Vec<String>,
    /// Print walk errors.
    pub verbose: bool,
}

/// Finds all template files under the given roots.
///
/// A root that is a file is taken as is, whatever its extension; directories
/// are walked with gitignore support. Paths naming the same file (`app/x.erb`
/// and `./app/x.erb`) are kept once, so no file is migrated twice.
pub fn find_template_files(roots: &[PathBuf], search: &SearchOptions) -> Vec<PathBuf> {
    let mut all_files = Vec::new();
    for root in roots {
        if root.is_file() {
            all_files.push(root.clone());
            continue;
        }
        let (files, dirs) = collect_template_files(
            root,
            &search.extensions,
            &search.exclude,
            &search.include,
            search.verbose,
        );
        tracing::debug!(root = %root.display(), files = files.len(), dirs, "collected templates");
        all_files.extend(files);
    }
    all_files.sort();
    let mut seen = FxHashSet::default();
    all_files.retain(|path| seen.insert(fs::canonicalize(path).unwrap_or_else(|_| path.clone())));
    all_files
}
