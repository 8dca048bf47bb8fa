use thiserror::Error;

/// What went wrong while tokenizing or parsing island code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A quoted literal reached end of input
    #[error("unterminated string literal")]
    UnterminatedString,
    /// A `#{` never found its `}`
    #[error("unterminated interpolation")]
    UnterminatedInterpolation,
    /// A `%w[`-style literal reached end of input
    #[error("unterminated percent literal")]
    UnterminatedPercentLiteral,
    /// A `/regex/` reached end of input
    #[error("unterminated regular expression")]
    UnterminatedRegex,
    /// A byte that cannot start any token
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    /// A token that does not fit where it appears
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    /// A specific construct was required
    #[error("expected {expected}, found {found}")]
    Expected {
        /// What the parser needed
        expected: &'static str,
        /// What it got instead
        found: String,
    },
    /// An opening bracket without its closing partner
    #[error("unclosed `{0}`")]
    Unclosed(char),
    /// A hash element that is neither a pair, a shorthand name, nor a double splat
    #[error("hash elements must be pairs, shorthand names, or double splats")]
    InvalidHashElement,
    /// Brackets or operators nested past the parser's depth limit
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Malformed code inside one island.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    /// Error category
    pub kind: ParseErrorKind,
    /// Byte offset inside the parsed text
    pub offset: usize,
}

impl ParseError {
    /// Create a new parse error
    #[must_use]
    pub const fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
