use crate::cli::Cli;
use crate::commands::{MigrateOptions, SearchOptions};
use crate::config::Config;
use crate::utils::normalize_extensions;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Runs rerender with the given arguments.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Run rerender with the given arguments, writing output to the specified writer.
///
/// This is the testable version of `run_with_args` that allows output capture.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["rerender".to_owned()];
    program_args.extend(args);
    let cli_var = match Cli::try_parse_from(program_args) {
        Ok(c) => c,
        Err(e) => {
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    write!(writer, "{e}")?;
                    writer.flush()?;
                    return Ok(0);
                }
                _ => {
                    eprint!("{e}");
                    return Ok(e.exit_code());
                }
            }
        }
    };

    init_logging(cli_var.output.verbose);

    for path in &cli_var.paths {
        if !path.exists() {
            eprintln!(
                "Error: The file or directory '{}' does not exist.",
                path.display()
            );
            return Ok(1);
        }
    }

    // Load config from the first path
    let config_path = cli_var
        .paths
        .first()
        .map_or(std::path::Path::new("."), std::path::PathBuf::as_path);
    let config = Config::load_from_path(config_path);

    let extensions = if cli_var.extensions.is_empty() {
        config.rerender.extensions()
    } else {
        normalize_extensions(&cli_var.extensions)
    };

    let mut exclude_folders = config.rerender.exclude_folders.clone().unwrap_or_default();
    exclude_folders.extend(cli_var.exclude_folders);

    let mut include_folders = config.rerender.include_folders.clone().unwrap_or_default();
    include_folders.extend(cli_var.include_folders);

    let dry_run = cli_var.write.dry_run || config.rerender.dry_run.unwrap_or(false);
    let verbose = cli_var.output.verbose;
    let json = cli_var.output.json;

    if verbose && !json {
        eprintln!("[VERBOSE] rerender v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Using {} threads", rayon::current_num_threads());
        if let Some(path) = &config.config_file_path {
            eprintln!("[VERBOSE] Config file: {}", path.display());
        }
        eprintln!("[VERBOSE] Configuration:");
        eprintln!("   Paths: {:?}", cli_var.paths);
        eprintln!("   Extensions: {extensions:?}");
        eprintln!("   Dry run: {dry_run}");
        eprintln!("   Check: {}", cli_var.write.check);
        eprintln!();
        crate::output::print_exclusion_list(writer, &exclude_folders)?;
    }

    let options = MigrateOptions {
        paths: cli_var.paths,
        search: SearchOptions {
            extensions,
            exclude: exclude_folders,
            include: include_folders,
            verbose,
        },
        dry_run,
        check: cli_var.write.check,
        json,
        quiet: cli_var.output.quiet,
    };
    crate::commands::run_migrate(&options, writer)
}

/// Installs the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects `debug` for this
/// crate and the default is `warn`. A second call is a no-op.
fn init_logging(verbose: bool) {
    let default = if verbose { "rerender=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
