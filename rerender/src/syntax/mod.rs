//! Parsing and printing of the Ruby code inside template islands.
//!
//! `parse` turns one island's code into a [`SyntaxTree`] whose nodes remember
//! their byte spans; `print` turns a node (parsed, synthesized, or a mix of
//! both) back into code. Printing a tree built only from parsed sub-nodes
//! re-parses to a structurally equivalent tree.

mod error;
mod lexer;
mod node;
mod parser;
mod printer;

pub use error::{ParseError, ParseErrorKind};
pub use node::{Call, Descendants, NodeKind, Shape, Span, SyntaxNode};
pub use parser::parse;
pub use printer::{print, print_with, SourceText, Verbatim};

/// How deeply brackets, operators and interpolations may nest in one island.
///
/// Each level costs several stack frames and batch workers run on small
/// stacks, so deeper code is reported as a parse error instead.
pub const MAX_NESTING: usize = 32;

/// The statements of one parsed island, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyntaxTree {
    /// Top-level statements
    pub statements: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Structural equality of two trees, see [`SyntaxNode::same_structure`].
    #[must_use]
    pub fn same_structure(&self, other: &SyntaxTree) -> bool {
        self.statements.len() == other.statements.len()
            && self
                .statements
                .iter()
                .zip(&other.statements)
                .all(|(a, b)| a.same_structure(b))
    }

    /// Every node of the tree, depth-first, parents before children.
    pub fn nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.statements.iter().flat_map(SyntaxNode::descendants)
    }

    /// Every call node of the tree, depth-first.
    pub fn calls(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.nodes().filter(|node| node.kind() == NodeKind::Call)
    }
}
