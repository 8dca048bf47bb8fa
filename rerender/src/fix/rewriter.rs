//! Byte-range code rewriter.
//!
//! Edits are keyed by offsets into the unmodified source, so independent
//! replacements never shift each other. Overlapping edits are rejected.
//!
//! # Usage
//!
//! ```
//! use rerender::fix::{ByteRangeRewriter, Edit};
//!
//! let source = r#" render "users/show" "#;
//! let mut rewriter = ByteRangeRewriter::new(source);
//! rewriter.add_edit(Edit::new(1, 20, r#"render({ partial: "users/show" })"#));
//! let fixed = rewriter.apply_verified().expect("should apply");
//! assert_eq!(fixed, r#" render({ partial: "users/show" }) "#);
//! ```

use thiserror::Error;

use crate::syntax::{self, ParseError};

/// A single replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start byte offset (inclusive)
    pub start_byte: usize,
    /// End byte offset (exclusive)
    pub end_byte: usize,
    /// Replacement content
    pub replacement: String,
    /// Optional description for logging
    pub description: Option<String>,
}

impl Edit {
    /// Create a new edit
    #[must_use]
    pub fn new(start_byte: usize, end_byte: usize, replacement: impl Into<String>) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement: replacement.into(),
            description: None,
        }
    }

    /// Create an edit with description
    #[must_use]
    pub fn with_description(
        start_byte: usize,
        end_byte: usize,
        replacement: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement: replacement.into(),
            description: Some(description.into()),
        }
    }

    /// Move the edit `delta` bytes towards the start of the text.
    #[must_use]
    pub fn shifted_back(mut self, delta: usize) -> Self {
        self.start_byte = self.start_byte.saturating_sub(delta);
        self.end_byte = self.end_byte.saturating_sub(delta);
        self
    }

    /// Check if this edit overlaps with another
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

/// Error during rewriting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Two or more edits have overlapping ranges
    #[error("overlapping edits at indices {edit_a} and {edit_b}")]
    OverlappingEdits {
        /// Index of first overlapping edit
        edit_a: usize,
        /// Index of second overlapping edit
        edit_b: usize,
    },
    /// Edit range is out of bounds or splits a character
    #[error("edit {edit_index} out of bounds: bytes {start_byte}..{end_byte} in source of length {source_len}")]
    OutOfBounds {
        /// Index of the bad edit
        edit_index: usize,
        /// Start byte of the edit
        start_byte: usize,
        /// End byte of the edit
        end_byte: usize,
        /// Length of the source
        source_len: usize,
    },
    /// The edited code no longer parses
    #[error("rewritten code does not parse: {0}")]
    Unparsable(#[source] ParseError),
}

/// Applies byte-range edits to one piece of source code.
#[derive(Debug, Clone)]
pub struct ByteRangeRewriter<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> ByteRangeRewriter<'a> {
    /// Create a new rewriter for the given source
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Add an edit to the pending list
    pub fn add_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Add multiple edits
    pub fn add_edits(&mut self, edits: impl IntoIterator<Item = Edit>) {
        self.edits.extend(edits);
    }

    /// Get the number of pending edits
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Check if there are any pending edits
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Validate edits without applying them
    ///
    /// # Errors
    /// Returns error if edits overlap or are out of bounds
    pub fn validate(&self) -> Result<(), RewriteError> {
        for (i, edit) in self.edits.iter().enumerate() {
            let fits = edit.start_byte <= edit.end_byte
                && self.source.is_char_boundary(edit.start_byte)
                && self.source.is_char_boundary(edit.end_byte);
            if !fits {
                return Err(RewriteError::OutOfBounds {
                    edit_index: i,
                    start_byte: edit.start_byte,
                    end_byte: edit.end_byte,
                    source_len: self.source.len(),
                });
            }
        }

        let mut order: Vec<usize> = (0..self.edits.len()).collect();
        order.sort_by_key(|&i| (self.edits[i].start_byte, self.edits[i].end_byte));
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.edits[a].overlaps(&self.edits[b]) {
                return Err(RewriteError::OverlappingEdits {
                    edit_a: a.min(b),
                    edit_b: a.max(b),
                });
            }
        }

        Ok(())
    }

    /// Apply all edits and return the modified source
    ///
    /// # Errors
    /// Returns error if edits overlap or are out of bounds
    pub fn apply(self) -> Result<String, RewriteError> {
        self.validate()?;

        let mut edits = self.edits;
        edits.sort_by_key(|edit| edit.start_byte);

        let growth: usize = edits.iter().map(|edit| edit.replacement.len()).sum();
        let mut result = String::with_capacity(self.source.len() + growth);
        let mut copied = 0;
        for edit in &edits {
            if let Some(description) = &edit.description {
                tracing::trace!(
                    start = edit.start_byte,
                    end = edit.end_byte,
                    "{description}"
                );
            }
            result.push_str(&self.source[copied..edit.start_byte]);
            result.push_str(&edit.replacement);
            copied = edit.end_byte;
        }
        result.push_str(&self.source[copied..]);

        Ok(result)
    }

    /// Apply edits and verify the result still parses
    ///
    /// # Errors
    /// Returns error if edits are invalid or the result doesn't parse
    pub fn apply_verified(self) -> Result<String, RewriteError> {
        let result = self.apply()?;
        syntax::parse(&result).map_err(RewriteError::Unparsable)?;
        Ok(result)
    }
}
