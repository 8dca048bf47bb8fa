//! Core library for the rerender template migrator.
//!
//! rerender rewrites the positional form of the `render` helper inside ERB
//! templates, `render "users/show", user: current_user`, into the explicit
//! `render({ partial: "users/show", locals: { user: current_user } })` form.
//! Everything outside the rewritten calls is copied byte for byte.
//!
//! ```
//! let migrated = rerender::rewrite_document("<p><%= render \"users/show\" %></p>");
//! assert_eq!(migrated.text, "<p><%= render({ partial: \"users/show\" }) %></p>");
//! assert_eq!(migrated.islands_changed, 1);
//! ```

#![allow(clippy::module_name_repetitions, clippy::items_after_statements)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Module containing the embedded-language lexer, parser, and printer.
pub mod syntax;

/// Module deciding whether a call node is a migratable `render` call.
pub mod classify;

/// Module splitting a template into code islands.
pub mod island;

/// Module containing the call, island, and document rewriters.
pub mod rewrite;

/// Module for applying byte-range edits to island code.
pub mod fix;

/// Module for loading configuration.
pub mod config;

/// Module containing utility functions.
/// This includes line numbering and template discovery.
pub mod utils;

/// Module containing shared constants and regex patterns.
pub mod constants;

/// Module defining the command-line interface arguments and structs.
pub mod cli;

/// Module for handling CLI commands and their execution logic.
pub mod commands;

/// Module for rich CLI output formatting with colored text and progress bars.
pub mod output;

/// Module defining the entry point logic shared by both binaries.
pub mod entry_point;

pub use classify::{classify, Classification, Eligible, Ineligible};
pub use rewrite::{
    rewrite_call, rewrite_document, rewrite_island, DocumentRewrite, IslandError, IslandFault,
    IslandRewrite,
};
