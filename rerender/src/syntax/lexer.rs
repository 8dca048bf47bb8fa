//! Byte-offset tokenizer for island code.
//!
//! The lexer works on bytes and only ever splits at ASCII positions, so every
//! token span lands on a UTF-8 boundary. Whether a `/`, `%`, `?` or `:` starts
//! a literal depends on whether the previous token finished a value, which is
//! tracked in `value_ended`.

use super::error::{ParseError, ParseErrorKind};
use super::node::Span;
use super::MAX_NESTING;

/// Reserved words of the embedded language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    Alias,
    And,
    Begin,
    Break,
    Case,
    Class,
    Def,
    Defined,
    Do,
    Else,
    Elsif,
    End,
    Ensure,
    False,
    For,
    If,
    In,
    Module,
    Next,
    Nil,
    Not,
    Or,
    Redo,
    Rescue,
    Retry,
    Return,
    SelfValue,
    Super,
    Then,
    True,
    Undef,
    Unless,
    Until,
    When,
    While,
    Yield,
    File,
    Line,
    Method,
}

impl Keyword {
    /// Look up a keyword by its spelling.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "alias" => Self::Alias,
            "and" => Self::And,
            "begin" => Self::Begin,
            "break" => Self::Break,
            "case" => Self::Case,
            "class" => Self::Class,
            "def" => Self::Def,
            "defined?" => Self::Defined,
            "do" => Self::Do,
            "else" => Self::Else,
            "elsif" => Self::Elsif,
            "end" => Self::End,
            "ensure" => Self::Ensure,
            "false" => Self::False,
            "for" => Self::For,
            "if" => Self::If,
            "in" => Self::In,
            "module" => Self::Module,
            "next" => Self::Next,
            "nil" => Self::Nil,
            "not" => Self::Not,
            "or" => Self::Or,
            "redo" => Self::Redo,
            "rescue" => Self::Rescue,
            "retry" => Self::Retry,
            "return" => Self::Return,
            "self" => Self::SelfValue,
            "super" => Self::Super,
            "then" => Self::Then,
            "true" => Self::True,
            "undef" => Self::Undef,
            "unless" => Self::Unless,
            "until" => Self::Until,
            "when" => Self::When,
            "while" => Self::While,
            "yield" => Self::Yield,
            "__FILE__" => Self::File,
            "__LINE__" => Self::Line,
            "__method__" => Self::Method,
            _ => return None,
        })
    }

    /// Keywords that are complete values on their own.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(
            self,
            Self::Nil
                | Self::True
                | Self::False
                | Self::SelfValue
                | Self::File
                | Self::Line
                | Self::Method
                | Self::Redo
                | Self::Retry
        )
    }

    /// Keywords that behave like a method call taking optional arguments.
    #[must_use]
    pub const fn is_callable(self) -> bool {
        matches!(
            self,
            Self::Yield | Self::Super | Self::Defined | Self::Not | Self::Return | Self::Break | Self::Next
        )
    }
}

/// Token category. Literal variants carry the spans the parser needs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TokenKind {
    Ident,
    Constant,
    InstanceVar,
    ClassVar,
    GlobalVar,
    /// `name:`; `name` excludes the colon
    Label {
        name: Span,
    },
    /// `"name":`
    StringLabel {
        content: Span,
    },
    /// `:name`, `:"name"`, `%s(name)`, `:+`
    Symbol {
        name: Span,
    },
    /// Quoted string; `interpolations` are the code spans inside `#{...}`
    Str {
        content: Span,
        interpolations: Vec<Span>,
    },
    Backtick,
    Regex,
    Words,
    Char,
    Number,
    Keyword(Keyword),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    SafeNav,
    ColonColon,
    FatArrow,
    Lambda,
    Semi,
    Newline,
    Colon,
    Question,
    Pipe,
    Op(&'static str),
    Eof,
}

impl TokenKind {
    fn ends_value(&self) -> bool {
        match self {
            Self::Ident
            | Self::Constant
            | Self::InstanceVar
            | Self::ClassVar
            | Self::GlobalVar
            | Self::Symbol { .. }
            | Self::Str { .. }
            | Self::Backtick
            | Self::Regex
            | Self::Words
            | Self::Char
            | Self::Number
            | Self::RParen
            | Self::RBracket
            | Self::RBrace => true,
            Self::Keyword(k) => k.is_value() || *k == Keyword::End,
            _ => false,
        }
    }
}

/// One token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Category and literal details
    pub kind: TokenKind,
    /// Byte range in the source
    pub span: Span,
    /// Whether whitespace (or the start of input) precedes the token
    pub space_before: bool,
}

impl Token {
    /// Human-readable token description for error messages.
    #[must_use]
    pub fn describe(&self, source: &str) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_owned(),
            TokenKind::Newline => "newline".to_owned(),
            _ => format!("`{}`", self.span.slice(source)),
        }
    }
}

/// Operators, longest spelling first.
const OPERATORS: [&str; 41] = [
    "**=", "<=>", "===", "...", "<<=", ">>=", "&&=", "||=", "**", "==", "!=", ">=", "<=", "&&",
    "||", "<<", ">>", "=~", "!~", "..", "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=", "+", "-",
    "*", "/", "%", "=", "<", ">", "!", "&", "|", "^", "~",
];

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

const fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

const fn closing_delimiter(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        other => other,
    }
}

/// Tokenize the whole of `source`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    tokenize_range(source, Span::new(0, source.len()))
}

/// Tokenize only `range` of `source`; spans stay relative to `source`.
pub fn tokenize_range(source: &str, range: Span) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source, range).run()
}

struct Lexer<'a> {
    bytes: &'a [u8],
    start: usize,
    pos: usize,
    end: usize,
    value_ended: bool,
    last_was_ident: bool,
    /// Open `#{` interpolations around the current position.
    interpolation_depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, range: Span) -> Self {
        let end = range.end.min(source.len());
        Self {
            bytes: source.as_bytes(),
            start: range.start,
            pos: range.start,
            end,
            value_ended: false,
            last_was_ident: false,
            interpolation_depth: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        let at = self.pos + ahead;
        (at < self.end).then(|| self.bytes[at])
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        ParseError::new(kind, offset)
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            let skipped = self.skip_blanks();
            let space_before = skipped || self.pos == self.start;
            if self.pos >= self.end {
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(self.end, self.end),
                    space_before,
                });
                return Ok(self.tokens);
            }

            let begin = self.pos;
            let kind = self.next_kind(space_before)?;

            let collapse = kind == TokenKind::Newline
                && self
                    .tokens
                    .last()
                    .map_or(true, |t| t.kind == TokenKind::Newline);
            self.value_ended = kind.ends_value();
            self.last_was_ident = kind == TokenKind::Ident;
            if !collapse {
                self.tokens.push(Token {
                    kind,
                    span: Span::new(begin, self.pos),
                    space_before,
                });
            }
        }
    }

    /// Skip spaces, line continuations and comments. Newlines are tokens.
    fn skip_blanks(&mut self) -> bool {
        let before = self.pos;
        while let Some(b) = self.peek(0) {
            match b {
                b' ' | b'\t' | b'\r' | b'\x0c' => self.pos += 1,
                b'\\' if self.peek(1) == Some(b'\n') => self.pos += 2,
                b'#' => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        self.pos > before
    }

    fn next_kind(&mut self, space_before: bool) -> Result<TokenKind, ParseError> {
        let b = self.bytes[self.pos];
        // Heuristic for `puts /re/` and `link_to %w[a b]`: an identifier
        // followed by a space and then a tight literal is a command argument.
        let literal_allowed = !self.value_ended
            || (space_before
                && self.last_was_ident
                && self.peek(1).is_some_and(|c| !matches!(c, b' ' | b'=' | b'\n')));

        let kind = match b {
            b'\n' => {
                self.pos += 1;
                TokenKind::Newline
            }
            b'"' | b'`' => {
                let (content, interpolations) = self.lex_quoted(b, true)?;
                if b == b'`' {
                    TokenKind::Backtick
                } else if self.peek(0) == Some(b':') && self.peek(1) != Some(b':') {
                    self.pos += 1;
                    TokenKind::StringLabel { content }
                } else {
                    TokenKind::Str {
                        content,
                        interpolations,
                    }
                }
            }
            b'\'' => {
                let (content, _) = self.lex_quoted(b'\'', false)?;
                if self.peek(0) == Some(b':') && self.peek(1) != Some(b':') {
                    self.pos += 1;
                    TokenKind::StringLabel { content }
                } else {
                    TokenKind::Str {
                        content,
                        interpolations: Vec::new(),
                    }
                }
            }
            b'@' => self.lex_variable()?,
            b'$' => self.lex_global()?,
            b':' => self.lex_colon()?,
            b'?' => self.lex_question(),
            b'%' if literal_allowed && self.percent_literal_ahead() => self.lex_percent()?,
            b'/' if literal_allowed => self.lex_regex()?,
            b'0'..=b'9' => self.lex_number(),
            b if is_ident_start(b) => self.lex_word(),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semi),
            b'.' if self.peek(1) != Some(b'.') => self.single(TokenKind::Dot),
            b'&' if self.peek(1) == Some(b'.') => {
                self.pos += 2;
                TokenKind::SafeNav
            }
            b'=' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::FatArrow
            }
            b'-' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::Lambda
            }
            b'|' if !matches!(self.peek(1), Some(b'|' | b'=')) => self.single(TokenKind::Pipe),
            _ => match self.match_operator(self.pos) {
                Some(op) => {
                    self.pos += op.len();
                    TokenKind::Op(op)
                }
                None => {
                    let ch = self.current_char();
                    return Err(self.error(ParseErrorKind::UnexpectedChar(ch), self.pos));
                }
            },
        };
        Ok(kind)
    }

    fn current_char(&self) -> char {
        let rest = &self.bytes[self.pos..self.end];
        std::str::from_utf8(rest)
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn match_operator(&self, at: usize) -> Option<&'static str> {
        let rest = &self.bytes[at..self.end];
        OPERATORS
            .iter()
            .copied()
            .find(|op| rest.starts_with(op.as_bytes()))
    }

    fn eat_ident_chars(&mut self) {
        while self.peek(0).is_some_and(is_ident_char) {
            self.pos += 1;
        }
    }

    /// Consume a `?` or `!` method suffix unless it begins `!=`/`?=`-style operators.
    fn eat_method_suffix(&mut self) {
        if matches!(self.peek(0), Some(b'?' | b'!')) && self.peek(1) != Some(b'=') {
            self.pos += 1;
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let begin = self.pos;
        self.eat_ident_chars();
        self.eat_method_suffix();
        let name = Span::new(begin, self.pos);

        if self.peek(0) == Some(b':') && self.peek(1) != Some(b':') {
            self.pos += 1;
            return TokenKind::Label { name };
        }

        let word = std::str::from_utf8(&self.bytes[begin..self.pos]).unwrap_or_default();
        if let Some(keyword) = Keyword::from_word(word) {
            return TokenKind::Keyword(keyword);
        }
        if self.bytes[begin].is_ascii_uppercase() {
            TokenKind::Constant
        } else {
            TokenKind::Ident
        }
    }

    fn lex_variable(&mut self) -> Result<TokenKind, ParseError> {
        let begin = self.pos;
        self.pos += 1;
        let kind = if self.peek(0) == Some(b'@') {
            self.pos += 1;
            TokenKind::ClassVar
        } else {
            TokenKind::InstanceVar
        };
        if !self.peek(0).is_some_and(is_ident_start) {
            return Err(self.error(ParseErrorKind::UnexpectedChar('@'), begin));
        }
        self.eat_ident_chars();
        Ok(kind)
    }

    fn lex_global(&mut self) -> Result<TokenKind, ParseError> {
        let begin = self.pos;
        self.pos += 1;
        match self.peek(0) {
            Some(b) if is_ident_char(b) => self.eat_ident_chars(),
            Some(b'!' | b'@' | b'~' | b'=' | b'/' | b'\\' | b',' | b';' | b'.' | b'<' | b'>'
                | b'_' | b'*' | b'$' | b'?' | b':' | b'"' | b'&' | b'`' | b'\'' | b'+') => {
                self.pos += 1;
            }
            _ => return Err(self.error(ParseErrorKind::UnexpectedChar('$'), begin)),
        }
        Ok(TokenKind::GlobalVar)
    }

    fn lex_colon(&mut self) -> Result<TokenKind, ParseError> {
        match self.peek(1) {
            Some(b':') => {
                self.pos += 2;
                Ok(TokenKind::ColonColon)
            }
            Some(b) if is_ident_start(b) => {
                self.pos += 1;
                let begin = self.pos;
                self.eat_ident_chars();
                self.eat_method_suffix();
                if self.peek(0) == Some(b'=') && !matches!(self.peek(1), Some(b'=' | b'~' | b'>'))
                {
                    self.pos += 1;
                }
                Ok(TokenKind::Symbol {
                    name: Span::new(begin, self.pos),
                })
            }
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let (name, _) = self.lex_quoted(quote, quote == b'"')?;
                Ok(TokenKind::Symbol { name })
            }
            Some(b'@' | b'$') => {
                self.pos += 1;
                let begin = self.pos;
                if self.bytes[self.pos] == b'@' {
                    self.lex_variable()?;
                } else {
                    self.lex_global()?;
                }
                Ok(TokenKind::Symbol {
                    name: Span::new(begin, self.pos),
                })
            }
            Some(b'[') if !self.value_ended && self.peek(2) == Some(b']') => {
                let begin = self.pos + 1;
                self.pos += 3;
                if self.peek(0) == Some(b'=') {
                    self.pos += 1;
                }
                Ok(TokenKind::Symbol {
                    name: Span::new(begin, self.pos),
                })
            }
            Some(_) if !self.value_ended => match self.match_operator(self.pos + 1) {
                Some(op) => {
                    let begin = self.pos + 1;
                    self.pos = begin + op.len();
                    Ok(TokenKind::Symbol {
                        name: Span::new(begin, self.pos),
                    })
                }
                None => Ok(self.single(TokenKind::Colon)),
            },
            _ => Ok(self.single(TokenKind::Colon)),
        }
    }

    fn lex_question(&mut self) -> TokenKind {
        if !self.value_ended {
            match (self.peek(1), self.peek(2)) {
                (Some(b'\\'), Some(_)) => {
                    self.pos += 3;
                    return TokenKind::Char;
                }
                (Some(c), next)
                    if !c.is_ascii_whitespace() && !next.is_some_and(is_ident_char) =>
                {
                    self.pos += 2;
                    return TokenKind::Char;
                }
                _ => {}
            }
        }
        self.single(TokenKind::Question)
    }

    fn lex_number(&mut self) -> TokenKind {
        while let Some(b) = self.peek(0) {
            let exponent_sign = matches!(b, b'-' | b'+')
                && matches!(self.bytes[self.pos - 1], b'e' | b'E')
                && !self.bytes[..self.pos].ends_with(b"0x");
            if is_ident_char(b) || exponent_sign {
                self.pos += 1;
            } else if b == b'.' && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 2;
            } else {
                break;
            }
        }
        TokenKind::Number
    }

    /// Scan a quoted literal starting at the opening delimiter.
    ///
    /// Returns the content span and the code spans of any interpolations.
    fn lex_quoted(&mut self, delim: u8, interpolate: bool) -> Result<(Span, Vec<Span>), ParseError> {
        let open = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        let mut interpolations = Vec::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error(ParseErrorKind::UnterminatedString, open));
            };
            if c == b'\\' {
                self.pos = (self.pos + 2).min(self.end);
            } else if c == delim {
                let content = Span::new(content_start, self.pos);
                self.pos += 1;
                return Ok((content, interpolations));
            } else if interpolate && c == b'#' && self.peek(1) == Some(b'{') {
                self.pos += 2;
                let inner_start = self.pos;
                let inner_end = self.skip_interpolation(inner_start - 2)?;
                interpolations.push(Span::new(inner_start, inner_end));
            } else {
                self.pos += 1;
            }
        }
    }

    /// Skip to the `}` closing an interpolation; returns its offset.
    fn skip_interpolation(&mut self, open: usize) -> Result<usize, ParseError> {
        if self.interpolation_depth >= MAX_NESTING {
            return Err(self.error(ParseErrorKind::TooDeep(MAX_NESTING), open));
        }
        self.interpolation_depth += 1;
        let close = self.scan_interpolation(open);
        self.interpolation_depth -= 1;
        close
    }

    fn scan_interpolation(&mut self, open: usize) -> Result<usize, ParseError> {
        let mut depth = 1usize;
        while let Some(c) = self.peek(0) {
            match c {
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let close = self.pos;
                        self.pos += 1;
                        return Ok(close);
                    }
                    self.pos += 1;
                }
                b'"' | b'`' => {
                    self.lex_quoted(c, true)?;
                }
                b'\'' => {
                    self.lex_quoted(b'\'', false)?;
                }
                _ => self.pos += 1,
            }
        }
        Err(self.error(ParseErrorKind::UnterminatedInterpolation, open))
    }

    fn percent_literal_ahead(&self) -> bool {
        let is_delim = |b: u8| b.is_ascii_punctuation() && b != b'=';
        match (self.peek(1), self.peek(2)) {
            (Some(b'q' | b'Q' | b'w' | b'W' | b'i' | b'I' | b'r' | b's' | b'x'), Some(d)) => {
                is_delim(d)
            }
            (Some(d), _) => matches!(d, b'(' | b'[' | b'{' | b'<' | b'|' | b'!' | b'^'),
            _ => false,
        }
    }

    fn lex_percent(&mut self) -> Result<TokenKind, ParseError> {
        let open = self.pos;
        self.pos += 1;
        let flavor = match self.peek(0) {
            Some(c) if c.is_ascii_alphabetic() => {
                self.pos += 1;
                c
            }
            _ => b'Q',
        };
        let opener = self.bytes[self.pos];
        let closer = closing_delimiter(opener);
        let interpolate = matches!(flavor, b'Q' | b'W' | b'I' | b'r' | b'x');
        self.pos += 1;
        let content_start = self.pos;
        let mut interpolations = Vec::new();
        let mut depth = 1usize;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error(ParseErrorKind::UnterminatedPercentLiteral, open));
            };
            if c == b'\\' {
                self.pos = (self.pos + 2).min(self.end);
            } else if interpolate && c == b'#' && self.peek(1) == Some(b'{') {
                self.pos += 2;
                let inner_start = self.pos;
                let inner_end = self.skip_interpolation(inner_start - 2)?;
                interpolations.push(Span::new(inner_start, inner_end));
            } else if c == closer && opener != closer && depth > 1 {
                depth -= 1;
                self.pos += 1;
            } else if c == closer {
                break;
            } else {
                if c == opener && opener != closer {
                    depth += 1;
                }
                self.pos += 1;
            }
        }
        let content = Span::new(content_start, self.pos);
        self.pos += 1;
        Ok(match flavor {
            b'w' | b'W' | b'i' | b'I' => TokenKind::Words,
            b'r' => {
                self.eat_ident_chars();
                TokenKind::Regex
            }
            b's' => TokenKind::Symbol { name: content },
            b'x' => TokenKind::Backtick,
            b'q' => TokenKind::Str {
                content,
                interpolations: Vec::new(),
            },
            _ => TokenKind::Str {
                content,
                interpolations,
            },
        })
    }

    fn lex_regex(&mut self) -> Result<TokenKind, ParseError> {
        let open = self.pos;
        self.pos += 1;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(self.error(ParseErrorKind::UnterminatedRegex, open));
            };
            match c {
                b'\\' => self.pos = (self.pos + 2).min(self.end),
                b'/' => {
                    self.pos += 1;
                    break;
                }
                b'#' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_interpolation(self.pos - 2)?;
                }
                _ => self.pos += 1,
            }
        }
        self.eat_ident_chars();
        Ok(TokenKind::Regex)
    }
}
