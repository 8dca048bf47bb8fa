//! The migrate command: rewrite every template under the given paths.

use anyhow::Result;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::utils::{find_template_files, SearchOptions};
use crate::rewrite::{rewrite_document, IslandFault};
use crate::utils::normalize_display_path;

/// Options for [`run_migrate`].
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MigrateOptions {
    /// Files and directories to migrate.
    pub paths: Vec<PathBuf>,
    /// How directories are searched.
    pub search: SearchOptions,
    /// Do not write files.
    pub dry_run: bool,
    /// Do not write files; exit 1 if any would change.
    pub check: bool,
    /// Print a JSON report.
    pub json: bool,
    /// Print only the summary line.
    pub quiet: bool,
}

impl MigrateOptions {
    /// Whether files are left untouched on disk.
    #[must_use]
    pub const fn writes_disabled(&self) -> bool {
        self.dry_run || self.check
    }
}

/// Outcome for one template file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Display path of the file
    pub file: String,
    /// Code islands in the file
    pub islands_found: usize,
    /// Islands whose code was rewritten
    pub islands_changed: usize,
    /// Calls rewritten in the file
    pub calls_rewritten: usize,
    /// Whether the migrated text differs from the file
    pub changed: bool,
    /// Whether the new text was written to disk
    pub written: bool,
    /// Islands left unchanged because of parse problems
    pub faults: Vec<IslandFault>,
    /// Read or write failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn failed(file: String, error: &std::io::Error) -> Self {
        Self {
            file,
            islands_found: 0,
            islands_changed: 0,
            calls_rewritten: 0,
            changed: false,
            written: false,
            faults: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate counts over all files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    /// Files read (or attempted)
    pub files_scanned: usize,
    /// Files whose text changed
    pub files_changed: usize,
    /// Files written to disk
    pub files_written: usize,
    /// Code islands across all files
    pub islands_found: usize,
    /// Islands rewritten across all files
    pub islands_changed: usize,
    /// Calls rewritten across all files
    pub calls_rewritten: usize,
    /// Islands left unchanged because of parse problems
    pub faults: usize,
    /// Files that could not be read or written
    pub io_errors: usize,
    /// Whether writes were disabled
    pub dry_run: bool,
}

impl MigrationSummary {
    fn add(&mut self, report: &FileReport) {
        self.files_scanned += 1;
        self.files_changed += usize::from(report.changed);
        self.files_written += usize::from(report.written);
        self.islands_found += report.islands_found;
        self.islands_changed += report.islands_changed;
        self.calls_rewritten += report.calls_rewritten;
        self.faults += report.faults.len();
        self.io_errors += usize::from(report.error.is_some());
    }
}

/// Per-file reports plus their totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// One entry per file, in path order
    pub files: Vec<FileReport>,
    /// Totals over `files`
    pub summary: MigrationSummary,
}

/// Migrates one file, writing it back when it changed and `write` is set.
///
/// Read and write failures are recorded in the report, never returned.
#[must_use]
pub fn migrate_file(path: &Path, write: bool) -> FileReport {
    let file = normalize_display_path(path);
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(file = %file, error = %e, "could not read template");
            return FileReport::failed(file, &e);
        }
    };

    let document = rewrite_document(&source);
    let changed = document.changed();
    let mut report = FileReport {
        file,
        islands_found: document.islands_found,
        islands_changed: document.islands_changed,
        calls_rewritten: document.calls_rewritten,
        changed,
        written: false,
        faults: document.faults,
        error: None,
    };

    if changed && write {
        match fs::write(path, document.text.as_bytes()) {
            Ok(()) => report.written = true,
            Err(e) => {
                tracing::warn!(file = %report.file, error = %e, "could not write template");
                report.error = Some(e.to_string());
            }
        }
    }
    report
}

/// Migrates `files` in parallel and merges the per-file reports.
#[must_use]
pub fn migrate_files(files: &[PathBuf], write: bool, progress: &ProgressBar) -> MigrationReport {
    let files: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let report = migrate_file(path, write);
            progress.inc(1);
            report
        })
        .collect();

    let mut summary = MigrationSummary {
        dry_run: !write,
        ..MigrationSummary::default()
    };
    for report in &files {
        summary.add(report);
    }
    MigrationReport { files, summary }
}

/// Executes the migrate command and returns the process exit code.
///
/// # Errors
///
/// Returns an error if writing the report or serializing JSON fails.
pub fn run_migrate<W: Write>(options: &MigrateOptions, writer: &mut W) -> Result<i32> {
    let files = find_template_files(&options.paths, &options.search);
    if options.search.verbose && !options.json {
        eprintln!("[VERBOSE] Found {} template files", files.len());
    }

    let progress = crate::output::create_progress_bar(
        files.len() as u64,
        options.json || options.quiet,
    );
    let report = migrate_files(&files, !options.writes_disabled(), &progress);
    progress.finish_and_clear();

    if options.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else if options.quiet {
        crate::output::print_summary_line(writer, &report.summary)?;
    } else {
        crate::output::print_file_reports(writer, &report.files, options.writes_disabled())?;
        crate::output::print_summary(writer, &report.summary)?;
    }

    Ok(exit_code(&report.summary, options.check))
}

/// 1 when any file failed I/O or, under `--check`, when any file would change.
#[must_use]
pub const fn exit_code(summary: &MigrationSummary, check: bool) -> i32 {
    if summary.io_errors > 0 || (check && summary.files_changed > 0) {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_migrate_file_writes_changes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("show.html.erb");
        fs::write(&path, "<%= render \"users/show\" %>\n")?;

        let report = migrate_file(&path, true);
        assert!(report.changed);
        assert!(report.written);
        assert_eq!(report.calls_rewritten, 1);
        assert_eq!(
            fs::read_to_string(&path)?,
            "<%= render({ partial: \"users/show\" }) %>\n"
        );
        Ok(())
    }

    #[test]
    fn test_migrate_file_dry_run_leaves_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("show.html.erb");
        let original = "<%= render \"users/show\" %>";
        fs::write(&path, original)?;

        let report = migrate_file(&path, false);
        assert!(report.changed);
        assert!(!report.written);
        assert_eq!(fs::read_to_string(&path)?, original);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let report = migrate_file(Path::new("/definitely/not/here.erb"), true);
        assert!(report.error.is_some());

        let merged = migrate_files(
            &[PathBuf::from("/definitely/not/here.erb")],
            true,
            &ProgressBar::hidden(),
        );
        assert_eq!(merged.summary.io_errors, 1);
        assert_eq!(exit_code(&merged.summary, false), 1);
    }

    #[test]
    fn test_unreadable_files_do_not_stop_the_batch() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("gone.html.erb");
        let binary = dir.path().join("binary.html.erb");
        let good = dir.path().join("show.html.erb");
        fs::write(&binary, [0xff_u8, 0xfe, b'<', b'%'])?;
        fs::write(&good, "<%= render \"users/show\", user: u %>")?;

        let report = migrate_files(&[binary, good.clone(), missing], true, &ProgressBar::hidden());
        let summary = &report.summary;
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.io_errors, 2);
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.files_written, 1);
        assert_eq!(exit_code(summary, false), 1);
        assert_eq!(
            fs::read_to_string(&good)?,
            "<%= render({ partial: \"users/show\", locals: { user: u } }) %>"
        );
        Ok(())
    }

    #[test]
    fn test_summary_merges_counts() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let a = dir.path().join("a.erb");
        let b = dir.path().join("b.erb");
        fs::write(&a, "<%= render \"x\" %><%= render(\"y\" %>")?;
        fs::write(&b, "<p><%= render partial: \"z\" %></p>")?;

        let report = migrate_files(&[a, b], false, &ProgressBar::hidden());
        let summary = &report.summary;
        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.files_written, 0);
        assert_eq!(summary.islands_found, 3);
        assert_eq!(summary.islands_changed, 1);
        assert_eq!(summary.faults, 1);
        assert!(summary.dry_run);
        assert_eq!(exit_code(summary, true), 1);
        assert_eq!(exit_code(summary, false), 0);
        Ok(())
    }
}
