use clap::{Args, Parser};
use std::path::PathBuf;

/// Help text for configuration file options, shown at the bottom of --help.
const CONFIG_HELP: &str = "\
CONFIGURATION FILE (.rerender.toml):
  Create this file in your project root to set defaults.
  It is looked up from the first path upwards.

  [rerender]
  extensions = [\"erb\"]           # Template extensions to migrate
  exclude_folders = [\"legacy\"]   # Extra folders to skip
  include_folders = [\"vendor\"]   # Force-include these
  dry_run = false                # Never write files

EXIT CODES:
  0  success
  1  a path is missing or unreadable, or --check found files to migrate
  2  usage error
";

/// Options for output formatting and verbosity.
#[derive(Args, Debug, Default, Clone)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are legitimately booleans
pub struct OutputOptions {
    /// Output a JSON report on stdout.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output for debugging (shows files and skipped islands).
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode: show only the summary line.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Options controlling whether files are written.
#[derive(Args, Debug, Default, Clone)]
pub struct WriteOptions {
    /// Compute every rewrite but do not write any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Like --dry-run, and exit with code 1 when any file would change.
    #[arg(long)]
    pub check: bool,
}

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    name = "rerender",
    author,
    version,
    about = "Rewrites positional ERB `render` calls into the explicit `render({ partial:, locals: })` form",
    long_about = None,
    after_help = CONFIG_HELP
)]
pub struct Cli {
    /// Template files or directories to migrate.
    /// Directories are searched recursively for files with the configured extensions.
    #[arg(required = true, value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Write options.
    #[command(flatten)]
    pub write: WriteOptions,

    /// Output formatting options.
    #[command(flatten)]
    pub output: OutputOptions,

    /// Folders to exclude from the search.
    #[arg(long, alias = "exclude-folder")]
    pub exclude_folders: Vec<String>,

    /// Folders to force-include in the search (overrides default exclusions).
    #[arg(long, alias = "include-folder")]
    pub include_folders: Vec<String>,

    /// Template extension to migrate (repeatable, replaces the configured list).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
}
