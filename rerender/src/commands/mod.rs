//! Commands module - CLI command implementations.

mod migrate;
mod utils;

pub use migrate::{
    exit_code, migrate_file, migrate_files, run_migrate, FileReport, MigrateOptions,
    MigrationReport, MigrationSummary,
};
pub use utils::{find_template_files, SearchOptions};
