//! Typed syntax tree for the Ruby expressions embedded in template islands.
//!
//! Nodes built by the parser remember the byte span they came from, so the
//! printer can reproduce them verbatim. Nodes built by the rewriter have no
//! span and are printed canonically.

use compact_str::CompactString;
use smallvec::SmallVec;

/// A byte range inside the text a node was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span covers no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The source text under this span, or `""` when the span does not fit.
    #[must_use]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }
}

/// Discriminant of a [`SyntaxNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Method invocation, with or without receiver and parentheses.
    Call,
    /// Quoted string without interpolation.
    StringLiteral,
    /// String containing at least one `#{...}` segment.
    InterpolatedString,
    /// `{ ... }` literal, or the trailing keyword arguments of a call.
    HashLiteral,
    /// `key: value`, `key => value`, or the value-less `key:` shorthand.
    Pair,
    /// `:name`, `:"name"`, or the key of a `name:` label.
    Symbol,
    /// Local names, constants, and `@`/`@@`/`$` variables.
    Identifier,
    /// Anything else.
    Other,
}

impl NodeKind {
    /// Short lowercase name used in diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::StringLiteral => "string-literal",
            Self::InterpolatedString => "interpolated-string",
            Self::HashLiteral => "hash-literal",
            Self::Pair => "pair",
            Self::Symbol => "symbol",
            Self::Identifier => "identifier",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a call node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Explicit receiver (`obj.method`), if any
    pub receiver: Option<Box<SyntaxNode>>,
    /// Method name as written
    pub method: CompactString,
    /// Arguments in source order; trailing keyword arguments form one bare hash
    pub args: Vec<SyntaxNode>,
    /// Whether the arguments are wrapped in parentheses
    pub parenthesized: bool,
}

/// Shape-specific payload of a [`SyntaxNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// See [`NodeKind::Call`].
    Call(Call),
    /// See [`NodeKind::StringLiteral`]. `content` is the raw text between the delimiters.
    StringLiteral {
        /// Raw, unescaped-as-written content
        content: String,
    },
    /// See [`NodeKind::InterpolatedString`]. `parts` are the interpolated expressions.
    InterpolatedString {
        /// Expressions found inside `#{...}`, in order
        parts: Vec<SyntaxNode>,
    },
    /// See [`NodeKind::HashLiteral`].
    HashLiteral {
        /// Pairs, shorthand identifiers, and double splats
        elements: Vec<SyntaxNode>,
        /// `false` for keyword arguments written without braces
        braced: bool,
    },
    /// See [`NodeKind::Pair`].
    Pair {
        /// Key node (symbol for labels)
        key: Box<SyntaxNode>,
        /// Value node, absent for `key:` shorthand
        value: Option<Box<SyntaxNode>>,
    },
    /// See [`NodeKind::Symbol`].
    Symbol {
        /// Name without the leading colon or trailing label colon
        name: CompactString,
    },
    /// See [`NodeKind::Identifier`].
    Identifier {
        /// Name including any sigil
        name: CompactString,
    },
    /// See [`NodeKind::Other`].
    Other {
        /// Sub-expressions, if any
        children: Vec<SyntaxNode>,
    },
}

/// An immutable syntax tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    span: Option<Span>,
    shape: Shape,
}

impl SyntaxNode {
    const fn synthesized(shape: Shape) -> Self {
        Self { span: None, shape }
    }

    /// Parenthesized call without receiver: `method(args...)`.
    #[must_use]
    pub fn call(method: impl Into<CompactString>, args: Vec<SyntaxNode>) -> Self {
        Self::method_call(None, method, args, true)
    }

    /// General call node.
    #[must_use]
    pub fn method_call(
        receiver: Option<SyntaxNode>,
        method: impl Into<CompactString>,
        args: Vec<SyntaxNode>,
        parenthesized: bool,
    ) -> Self {
        Self::synthesized(Shape::Call(Call {
            receiver: receiver.map(Box::new),
            method: method.into(),
            args,
            parenthesized,
        }))
    }

    /// String literal with the given raw content.
    #[must_use]
    pub fn string_literal(content: impl Into<String>) -> Self {
        Self::synthesized(Shape::StringLiteral {
            content: content.into(),
        })
    }

    /// String with interpolated expressions.
    #[must_use]
    pub fn interpolated_string(parts: Vec<SyntaxNode>) -> Self {
        Self::synthesized(Shape::InterpolatedString { parts })
    }

    /// Braced hash literal.
    #[must_use]
    pub fn hash(elements: Vec<SyntaxNode>) -> Self {
        Self::synthesized(Shape::HashLiteral {
            elements,
            braced: true,
        })
    }

    /// Keyword arguments written without braces.
    #[must_use]
    pub fn bare_hash(elements: Vec<SyntaxNode>) -> Self {
        Self::synthesized(Shape::HashLiteral {
            elements,
            braced: false,
        })
    }

    /// `key: value` / `key => value`.
    #[must_use]
    pub fn pair(key: SyntaxNode, value: SyntaxNode) -> Self {
        Self::synthesized(Shape::Pair {
            key: Box::new(key),
            value: Some(Box::new(value)),
        })
    }

    /// Value-less `key:` shorthand.
    #[must_use]
    pub fn shorthand_pair(key: SyntaxNode) -> Self {
        Self::synthesized(Shape::Pair {
            key: Box::new(key),
            value: None,
        })
    }

    /// Symbol named `name`.
    #[must_use]
    pub fn symbol(name: impl Into<CompactString>) -> Self {
        Self::synthesized(Shape::Symbol { name: name.into() })
    }

    /// Identifier named `name`.
    #[must_use]
    pub fn identifier(name: impl Into<CompactString>) -> Self {
        Self::synthesized(Shape::Identifier { name: name.into() })
    }

    /// Catch-all node with optional sub-expressions.
    #[must_use]
    pub fn other(children: Vec<SyntaxNode>) -> Self {
        Self::synthesized(Shape::Other { children })
    }

    /// Attach the source span this node was parsed from.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Source span, `None` for synthesized nodes
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        self.span
    }

    /// Shape payload
    #[must_use]
    pub const fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Discriminant tag
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match &self.shape {
            Shape::Call(_) => NodeKind::Call,
            Shape::StringLiteral { .. } => NodeKind::StringLiteral,
            Shape::InterpolatedString { .. } => NodeKind::InterpolatedString,
            Shape::HashLiteral { .. } => NodeKind::HashLiteral,
            Shape::Pair { .. } => NodeKind::Pair,
            Shape::Symbol { .. } => NodeKind::Symbol,
            Shape::Identifier { .. } => NodeKind::Identifier,
            Shape::Other { .. } => NodeKind::Other,
        }
    }

    /// Call payload, if this is a call
    #[must_use]
    pub const fn as_call(&self) -> Option<&Call> {
        match &self.shape {
            Shape::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Elements of a hash literal, if this is one
    #[must_use]
    pub fn hash_elements(&self) -> Option<&[SyntaxNode]> {
        match &self.shape {
            Shape::HashLiteral { elements, .. } => Some(elements),
            _ => None,
        }
    }

    /// Whether this is a hash literal written without braces
    #[must_use]
    pub const fn is_bare_hash(&self) -> bool {
        matches!(self.shape, Shape::HashLiteral { braced: false, .. })
    }

    /// Ordered child nodes.
    #[must_use]
    pub fn children(&self) -> SmallVec<[&SyntaxNode; 4]> {
        match &self.shape {
            Shape::Call(call) => call
                .receiver
                .as_deref()
                .into_iter()
                .chain(call.args.iter())
                .collect(),
            Shape::InterpolatedString { parts } => parts.iter().collect(),
            Shape::HashLiteral { elements, .. } => elements.iter().collect(),
            Shape::Pair { key, value } => std::iter::once(key.as_ref())
                .chain(value.as_deref())
                .collect(),
            Shape::Other { children } => children.iter().collect(),
            Shape::StringLiteral { .. } | Shape::Symbol { .. } | Shape::Identifier { .. } => {
                SmallVec::new()
            }
        }
    }

    /// This node and all nodes below it, depth-first, parents before children.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Structural equality: same shapes, names, and string contents.
    ///
    /// Spans are ignored, as are the purely presentational `braced` and
    /// `parenthesized` flags.
    #[must_use]
    pub fn same_structure(&self, other: &SyntaxNode) -> bool {
        let shallow = match (&self.shape, &other.shape) {
            (Shape::Call(a), Shape::Call(b)) => {
                a.method == b.method && a.receiver.is_some() == b.receiver.is_some()
            }
            (Shape::StringLiteral { content: a }, Shape::StringLiteral { content: b }) => a == b,
            (Shape::Symbol { name: a }, Shape::Symbol { name: b })
            | (Shape::Identifier { name: a }, Shape::Identifier { name: b }) => a == b,
            (Shape::Pair { value: a, .. }, Shape::Pair { value: b, .. }) => {
                a.is_some() == b.is_some()
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        };
        if !shallow {
            return false;
        }
        let ours = self.children();
        let theirs = other.children();
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| a.same_structure(b))
    }
}

/// Pre-order iterator returned by [`SyntaxNode::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_constructor() {
        assert_eq!(SyntaxNode::call("render", vec![]).kind(), NodeKind::Call);
        assert_eq!(SyntaxNode::string_literal("a").kind(), NodeKind::StringLiteral);
        assert_eq!(
            SyntaxNode::interpolated_string(vec![]).kind(),
            NodeKind::InterpolatedString
        );
        assert_eq!(SyntaxNode::hash(vec![]).kind(), NodeKind::HashLiteral);
        assert_eq!(
            SyntaxNode::shorthand_pair(SyntaxNode::symbol("a")).kind(),
            NodeKind::Pair
        );
        assert_eq!(SyntaxNode::identifier("x").kind(), NodeKind::Identifier);
        assert_eq!(SyntaxNode::other(vec![]).kind(), NodeKind::Other);
    }

    #[test]
    fn test_children_order() {
        let call = SyntaxNode::method_call(
            Some(SyntaxNode::identifier("obj")),
            "meth",
            vec![SyntaxNode::identifier("a"), SyntaxNode::identifier("b")],
            false,
        );
        let names: Vec<_> = call
            .children()
            .iter()
            .map(|c| match c.shape() {
                Shape::Identifier { name } => name.to_string(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, ["obj", "a", "b"]);
    }

    #[test]
    fn test_same_structure_ignores_spans_and_braces() {
        let pair = SyntaxNode::pair(SyntaxNode::symbol("user"), SyntaxNode::identifier("u"));
        let bare = SyntaxNode::bare_hash(vec![pair.clone().with_span(Span::new(3, 10))]);
        let braced = SyntaxNode::hash(vec![pair]).with_span(Span::new(0, 14));
        assert!(bare.same_structure(&braced));
        assert_ne!(bare, braced);
    }

    #[test]
    fn test_same_structure_detects_content_change() {
        let a = SyntaxNode::string_literal("users/show");
        let b = SyntaxNode::string_literal("users/index");
        assert!(!a.same_structure(&b));
    }

    #[test]
    fn test_span_slice_out_of_range() {
        assert_eq!(Span::new(2, 50).slice("short"), "");
        assert_eq!(Span::new(0, 5).slice("short"), "short");
    }
}
