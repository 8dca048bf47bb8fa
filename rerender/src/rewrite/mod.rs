//! The rewrite pipeline: one call, one island, one document.
//!
//! [`rewrite_document`] segments a template into islands and hands each one
//! to [`rewrite_island`], which parses the code, classifies every call, and
//! replaces the eligible ones with the output of [`rewrite_call`].

mod call;
mod document;
mod island;

pub use call::rewrite_call;
pub use document::{rewrite_document, DocumentRewrite, IslandFault};
pub use island::{rewrite_island, IslandError, IslandRewrite};
