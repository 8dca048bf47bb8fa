//! Rewrites every eligible call inside one island's code.

use std::borrow::Cow;
use std::cell::Cell;

use thiserror::Error;

use super::call::rewrite_call;
use crate::classify::{classify, Classification};
use crate::fix::{ByteRangeRewriter, Edit, RewriteError};
use crate::syntax::{self, print_with, ParseError, SourceText, Span, SyntaxNode};

/// Why an island was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IslandError {
    /// The island's code does not parse.
    #[error("could not parse island code: {0}")]
    Parse(#[source] ParseError),
    /// The rewritten code did not parse, so the rewrite was discarded.
    #[error("rewrite produced code that does not parse: {0}")]
    Unverified(#[source] ParseError),
    /// The collected edits could not be applied.
    #[error(transparent)]
    Rewrite(RewriteError),
}

impl IslandError {
    /// Byte offset of the problem inside the original island code, when known.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse(error) => Some(error.offset),
            Self::Unverified(_) | Self::Rewrite(_) => None,
        }
    }
}

impl From<RewriteError> for IslandError {
    fn from(error: RewriteError) -> Self {
        match error {
            RewriteError::Unparsable(parse) => Self::Unverified(parse),
            other => Self::Rewrite(other),
        }
    }
}

/// Result of rewriting one island.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandRewrite<'a> {
    /// The new code, borrowed when nothing changed
    pub text: Cow<'a, str>,
    /// Whether any call was rewritten
    pub changed: bool,
    /// Number of calls rewritten, nested ones included
    pub calls_rewritten: usize,
}

impl<'a> IslandRewrite<'a> {
    const fn unchanged(code: &'a str) -> Self {
        Self {
            text: Cow::Borrowed(code),
            changed: false,
            calls_rewritten: 0,
        }
    }
}

/// Rewrite every eligible call in `code`.
///
/// Edits are keyed by offsets into the original code, so independent calls
/// never interfere. An eligible call nested inside another eligible call is
/// rewritten as part of the outer call's replacement text.
///
/// # Errors
///
/// Fails when `code` does not parse or when the rewritten code would not
/// parse; in both cases the caller should keep `code` unchanged.
pub fn rewrite_island(code: &str) -> Result<IslandRewrite<'_>, IslandError> {
    let tree = syntax::parse(code).map_err(IslandError::Parse)?;

    let nested = NestedRewrites::new(code);
    let mut rewriter = ByteRangeRewriter::new(code);
    for statement in &tree.statements {
        nested.collect(statement, &mut |edit| rewriter.add_edit(edit));
    }
    if !rewriter.has_edits() {
        return Ok(IslandRewrite::unchanged(code));
    }

    let calls_rewritten = rewriter.edit_count() + nested.count.get();
    let text = rewriter.apply_verified()?;
    Ok(IslandRewrite {
        text: Cow::Owned(text),
        changed: true,
        calls_rewritten,
    })
}

/// Resolves parsed sub-nodes to their source text with any eligible calls
/// inside them already rewritten.
struct NestedRewrites<'a> {
    source: &'a str,
    count: Cell<usize>,
}

impl<'a> NestedRewrites<'a> {
    const fn new(source: &'a str) -> Self {
        Self {
            source,
            count: Cell::new(0),
        }
    }

    /// Depth-first search for eligible calls; stops descending at each one.
    fn collect(&self, node: &SyntaxNode, emit: &mut dyn FnMut(Edit)) {
        if let (Classification::Eligible(eligible), Some(span)) = (classify(node), node.span()) {
            let replacement = print_with(&rewrite_call(&eligible), self);
            tracing::debug!(
                start = span.start,
                end = span.end,
                replacement = %replacement,
                "rewriting render call"
            );
            emit(Edit::with_description(
                span.start,
                span.end,
                replacement,
                "render call",
            ));
            return;
        }
        for child in node.children() {
            self.collect(child, emit);
        }
    }
}

impl SourceText for NestedRewrites<'_> {
    fn text(&self, node: &SyntaxNode, span: Span) -> Cow<'_, str> {
        let original = span.slice(self.source);
        let mut edits = Vec::new();
        self.collect(node, &mut |edit| edits.push(edit.shifted_back(span.start)));
        if edits.is_empty() {
            return Cow::Borrowed(original);
        }

        self.count.set(self.count.get() + edits.len());
        let mut rewriter = ByteRangeRewriter::new(original);
        rewriter.add_edits(edits);
        rewriter
            .apply()
            .map_or(Cow::Borrowed(original), Cow::Owned)
    }
}
