//! Byte-range rewriting of island code.
//!
//! `ByteRangeRewriter` collects edits keyed by offsets into the unmodified
//! code, applies them in one pass, and can verify the result still parses.

mod rewriter;

pub use rewriter::{ByteRangeRewriter, Edit, RewriteError};
