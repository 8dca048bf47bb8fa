//! Path utilities.
//!
//! This module consolidates all path-related logic for:
//! - Cross-platform path normalization for display
//! - Template discovery with gitignore support

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_EXCLUDE_FOLDERS;

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" or ".\" prefix (for cleaner output)
///
/// # Examples
/// ```
/// use std::path::Path;
/// use rerender::utils::normalize_display_path;
///
/// assert_eq!(normalize_display_path(Path::new(".\\app\\views\\show.html.erb")), "app/views/show.html.erb");
/// assert_eq!(normalize_display_path(Path::new("./app/views/index.html.erb")), "app/views/index.html.erb");
/// ```
#[must_use]
pub fn normalize_display_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    // Strip Windows extended path prefix if present
    let clean = s.trim_start_matches(r"\\?\");
    let normalized = clean.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

/// Checks if a name matches any exclusion pattern.
/// Supports exact matching and wildcard patterns starting with `*.`.
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|exclude| match exclude.strip_prefix('*') {
        Some(suffix) if suffix.starts_with('.') => name.ends_with(suffix),
        _ => name == exclude,
    })
}

/// Whether `path` ends in one of `extensions` (given without the leading dot).
#[must_use]
pub fn has_template_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Collects template files below `root` with gitignore support.
///
/// Uses the `ignore` crate to respect .gitignore, .git/info/exclude, and global gitignore
/// IN ADDITION to the default excluded folders (`node_modules`, `vendor`, `tmp`, etc.).
///
/// # Arguments
/// * `root` - Root directory to search
/// * `extensions` - File extensions to collect, without the dot
/// * `exclude` - Additional user-specified exclusion patterns
/// * `include` - Folders to force-include (overrides excludes)
/// * `verbose` - Whether to print walk errors to stderr
///
/// # Returns
/// Tuple of (sorted template paths, directory count)
#[must_use]
pub fn collect_template_files(
    root: &Path,
    extensions: &[String],
    exclude: &[String],
    include: &[String],
    verbose: bool,
) -> (Vec<PathBuf>, usize) {
    use ignore::WalkBuilder;

    let mut all_excludes: Vec<String> = exclude
        .iter()
        .cloned()
        .chain(DEFAULT_EXCLUDE_FOLDERS().iter().map(|&s| s.to_owned()))
        .collect();
    all_excludes.retain(|ex| !include.iter().any(|inc| ex == inc));

    let root_for_filter = root.to_path_buf();

    // filter_entry skips excluded directories at traversal time, so the
    // walker never descends into node_modules, vendor, etc.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            if entry.path() == root_for_filter {
                return true;
            }
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| !is_excluded(name, &all_excludes))
        })
        .build();

    let mut files = Vec::new();
    let mut dir_count = 0;

    for result in walker {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    if path != root {
                        dir_count += 1;
                    }
                    continue;
                }
                if has_template_extension(path, extensions) {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "walk error");
                if verbose {
                    eprintln!("Walk error: {e}");
                }
            }
        }
    }

    files.sort();
    (files, dir_count)
}
