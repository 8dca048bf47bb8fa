use crate::commands::{FileReport, MigrationSummary};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Print the exclusion list in styled format.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_exclusion_list(writer: &mut impl Write, folders: &[String]) -> std::io::Result<()> {
    if folders.is_empty() {
        let defaults = crate::constants::DEFAULT_EXCLUDE_FOLDERS();
        let mut sorted_defaults: Vec<&str> = defaults.iter().copied().collect();
        sorted_defaults.sort_unstable();
        writeln!(
            writer,
            "{} {}",
            "[OK] Using default exclusions only:".green(),
            sorted_defaults.join(", ").dimmed()
        )?;
    } else {
        writeln!(writer, "{} {}", "Excluding:".yellow().bold(), folders.join(", "))?;
    }
    Ok(())
}

/// Create a progress bar with file count.
///
/// Returns a hidden bar in test mode or when `hidden` is set, so machine
/// readable output is never interleaved with drawing.
#[must_use]
pub fn create_progress_bar(total_files: u64, hidden: bool) -> ProgressBar {
    if cfg!(test) || hidden {
        return ProgressBar::hidden();
    }

    let pb =
        ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::stderr_with_hz(20));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} templates ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message("migrating...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.tick();
    pb
}

/// Print one line per file that changed, failed, or has faults, followed by
/// a `file:line` note for each fault.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_file_reports(
    writer: &mut impl Write,
    reports: &[FileReport],
    dry_run: bool,
) -> std::io::Result<()> {
    for report in reports {
        if let Some(error) = &report.error {
            writeln!(writer, "{} {}: {}", "error".red().bold(), report.file.bold(), error)?;
            continue;
        }
        if report.changed {
            let verb = if dry_run { "would rewrite" } else { "rewrote" };
            writeln!(
                writer,
                "{} {} ({})",
                verb.green().bold(),
                report.file.bold(),
                plural(report.calls_rewritten, "call")
            )?;
        }
        for fault in &report.faults {
            writeln!(
                writer,
                "  {} {}:{}: {} {}",
                "note:".yellow(),
                report.file,
                fault.line,
                fault.error,
                "(island left unchanged)".dimmed()
            )?;
        }
    }
    Ok(())
}

/// Helper to create a styled table
fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

fn count_cell(count: usize, bad: Color) -> Cell {
    let cell = Cell::new(count);
    if count == 0 {
        cell
    } else {
        cell.fg(bad).add_attribute(Attribute::Bold)
    }
}

/// Print the summary table.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_summary(writer: &mut impl Write, summary: &MigrationSummary) -> std::io::Result<()> {
    writeln!(writer)?;
    let mut table = create_table(vec!["Metric", "Count"]);
    let changed_label = if summary.dry_run {
        "Files that would change"
    } else {
        "Files changed"
    };
    table.add_row(vec![Cell::new("Files scanned"), Cell::new(summary.files_scanned)]);
    table.add_row(vec![
        Cell::new(changed_label),
        count_cell(summary.files_changed, Color::Green),
    ]);
    table.add_row(vec![Cell::new("Islands found"), Cell::new(summary.islands_found)]);
    table.add_row(vec![
        Cell::new("Islands rewritten"),
        Cell::new(summary.islands_changed),
    ]);
    table.add_row(vec![
        Cell::new("Calls rewritten"),
        Cell::new(summary.calls_rewritten),
    ]);
    table.add_row(vec![
        Cell::new("Islands skipped"),
        count_cell(summary.faults, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("I/O errors"),
        count_cell(summary.io_errors, Color::Red),
    ]);
    writeln!(writer, "{table}")?;

    if summary.dry_run && summary.files_changed > 0 {
        writeln!(writer, "{}", "Dry run: no files were written.".dimmed())?;
    } else if summary.files_changed == 0 && summary.io_errors == 0 {
        writeln!(writer, "{}", "✓ Nothing to migrate.".green())?;
    }
    Ok(())
}

/// Print a single summary line (quiet mode).
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_summary_line(
    writer: &mut impl Write,
    summary: &MigrationSummary,
) -> std::io::Result<()> {
    let verb = if summary.dry_run { "would change" } else { "changed" };
    writeln!(
        writer,
        "{} {}, {} {verb}, {} rewritten, {} skipped, {} I/O errors",
        plural(summary.files_scanned, "file"),
        "scanned".dimmed(),
        summary.files_changed,
        plural(summary.calls_rewritten, "call"),
        plural(summary.faults, "island"),
        summary.io_errors
    )
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
