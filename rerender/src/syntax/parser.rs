//! Recursive-descent parser for island code.
//!
//! Template code splits block constructs across islands (`<% if x %>` ...
//! `<% end %>`), so block keywords are accepted as standalone leaves instead of
//! being matched against their `end`. Everything that *is* delimited inside one
//! island (parentheses, brackets, braces, strings) must balance.

use super::error::{ParseError, ParseErrorKind};
use super::lexer::{tokenize, tokenize_range, Keyword, Token, TokenKind};
use super::node::{Span, SyntaxNode};
use super::{SyntaxTree, MAX_NESTING};

/// Parse one island's code into a [`SyntaxTree`].
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the byte offset of the first problem.
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    let tokens = tokenize(source)?;
    let statements = Parser::new(source, tokens, 0).program()?;
    Ok(SyntaxTree { statements })
}

/// Parse the code of one `#{...}` interpolation, keeping absolute offsets.
fn parse_interpolation(source: &str, range: Span, depth: usize) -> Result<SyntaxNode, ParseError> {
    let tokens = tokenize_range(source, range)?;
    let mut statements = Parser::new(source, tokens, depth).program()?;
    if statements.len() == 1 {
        return Ok(statements.remove(0));
    }
    Ok(SyntaxNode::other(statements).with_span(range))
}

/// Where a statement list stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Eof,
    Paren,
    Brace,
}

/// Binary operator precedence, loosest first.
fn binary_precedence(kind: &TokenKind) -> Option<(u8, bool)> {
    let op = match kind {
        TokenKind::Pipe => return Some((6, false)),
        TokenKind::Op(op) => *op,
        _ => return None,
    };
    let entry = match op {
        ".." | "..." => (1, false),
        "||" => (2, false),
        "&&" => (3, false),
        "<=>" | "==" | "===" | "!=" | "=~" | "!~" => (4, false),
        "<" | "<=" | ">" | ">=" => (5, false),
        "|" | "^" => (6, false),
        "&" => (7, false),
        "<<" | ">>" => (8, false),
        "+" | "-" => (9, false),
        "*" | "/" | "%" => (10, false),
        "**" => (12, true),
        _ => return None,
    };
    Some(entry)
}

const fn is_assignment(op: &str) -> bool {
    matches!(
        op.as_bytes(),
        b"=" | b"+=" | b"-=" | b"*=" | b"/=" | b"%=" | b"**=" | b"|=" | b"&=" | b"^=" | b"<<="
            | b">>=" | b"&&=" | b"||="
    )
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    /// The last statement ended in a block opener, so no separator is needed.
    relaxed: bool,
    /// Inside command arguments or a loop condition, `do` belongs to the outer construct.
    no_do_block: bool,
    /// Set when the primary just parsed was a command call.
    command_ended: bool,
    /// Current expression nesting, bounded by [`MAX_NESTING`].
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>, depth: usize) -> Self {
        let last_end = tokens.first().map_or(0, |t| t.span.start);
        Self {
            source,
            tokens,
            pos: 0,
            last_end,
            relaxed: false,
            no_do_block: false,
            command_ended: false,
            depth,
        }
    }

    // ----- token cursor -----

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, ahead: usize) -> &TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + ahead).min(last)].kind
    }

    fn peek_token(&self, ahead: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.last_end = token.span.end;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        *self.kind() == TokenKind::Keyword(keyword)
    }

    fn at_separator(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Semi)
    }

    fn at_closer(&self, closer: Closer) -> bool {
        match closer {
            Closer::Eof => false,
            Closer::Paren => self.at(&TokenKind::RParen),
            Closer::Brace => self.at(&TokenKind::RBrace),
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while self.at_separator() {
            self.advance();
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.last_end.max(start))
    }

    fn start(&self) -> usize {
        self.current().span.start
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current();
        ParseError::new(
            ParseErrorKind::UnexpectedToken(token.describe(self.source)),
            token.span.start,
        )
    }

    fn expected(&self, expected: &'static str) -> ParseError {
        let token = self.current();
        ParseError::new(
            ParseErrorKind::Expected {
                expected,
                found: token.describe(self.source),
            },
            token.span.start,
        )
    }

    /// Consume the closing bracket or report the opener as unclosed.
    fn close(&mut self, closing: &TokenKind, open: char, open_at: usize) -> Result<(), ParseError> {
        if self.at(closing) {
            self.advance();
            return Ok(());
        }
        if self.at(&TokenKind::Eof) {
            return Err(ParseError::new(ParseErrorKind::Unclosed(open), open_at));
        }
        Err(self.unexpected())
    }

    /// Run `parse` inside brackets, where `do` blocks bind again and the
    /// separator state of the enclosing statement is kept.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = (self.no_do_block, self.relaxed);
        self.no_do_block = false;
        let result = parse(self);
        (self.no_do_block, self.relaxed) = saved;
        result
    }

    /// Run `parse` one nesting level deeper, failing at the current token
    /// once [`MAX_NESTING`] is reached.
    fn descend<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep(MAX_NESTING),
                self.start(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Whether the current token closes a block clause, ending the statement before it.
    fn at_clause_keyword(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Keyword(
                Keyword::End
                    | Keyword::Else
                    | Keyword::Elsif
                    | Keyword::When
                    | Keyword::In
                    | Keyword::Ensure
                    | Keyword::Then
            )
        )
    }

    // ----- statements -----

    fn program(mut self) -> Result<Vec<SyntaxNode>, ParseError> {
        let statements = self.statements(Closer::Eof)?;
        if !self.at(&TokenKind::Eof) {
            return Err(self.unexpected());
        }
        Ok(statements)
    }

    fn statements(&mut self, closer: Closer) -> Result<Vec<SyntaxNode>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.at(&TokenKind::Eof) || self.at_closer(closer) {
                return Ok(statements);
            }
            self.relaxed = false;
            statements.push(self.statement()?);
            if self.at_separator()
                || self.at(&TokenKind::Eof)
                || self.at_closer(closer)
                || self.at_clause_keyword()
                || self.relaxed
            {
                continue;
            }
            return Err(self.unexpected());
        }
    }

    fn statement(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let mut node = self.expression_statement()?;
        while let TokenKind::Keyword(
            Keyword::If | Keyword::Unless | Keyword::While | Keyword::Until | Keyword::Rescue,
        ) = self.kind()
        {
            self.advance();
            let condition = self.expression_statement()?;
            node = SyntaxNode::other(vec![node, condition]).with_span(self.span_from(start));
        }
        Ok(node)
    }

    /// Expression joined by the low-precedence `and` / `or` / `not`.
    fn expression_statement(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let mut left = self.not_expression()?;
        while let TokenKind::Keyword(Keyword::And | Keyword::Or) = self.kind() {
            self.advance();
            self.skip_newlines();
            let right = self.not_expression()?;
            left = SyntaxNode::other(vec![left, right]).with_span(self.span_from(start));
        }
        Ok(left)
    }

    fn not_expression(&mut self) -> Result<SyntaxNode, ParseError> {
        if self.at_keyword(Keyword::Not) {
            let start = self.start();
            self.advance();
            let operand = self.descend(Self::not_expression)?;
            return Ok(SyntaxNode::other(vec![operand]).with_span(self.span_from(start)));
        }
        self.expression()
    }

    // ----- expressions -----

    fn expression(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let target = self.ternary()?;
        if let TokenKind::Op(op) = self.kind() {
            if is_assignment(op) {
                self.advance();
                self.skip_newlines();
                let value = self.descend(Self::expression)?;
                return Ok(SyntaxNode::other(vec![target, value]).with_span(self.span_from(start)));
            }
        }
        Ok(target)
    }

    fn ternary(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let condition = self.binary(0)?;
        if !self.at(&TokenKind::Question) {
            return Ok(condition);
        }
        self.advance();
        self.skip_newlines();
        let then_branch = self.descend(Self::ternary)?;
        self.skip_newlines();
        if !self.at(&TokenKind::Colon) {
            return Err(self.expected("`:` in conditional expression"));
        }
        self.advance();
        self.skip_newlines();
        let else_branch = self.descend(Self::ternary)?;
        Ok(SyntaxNode::other(vec![condition, then_branch, else_branch])
            .with_span(self.span_from(start)))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let mut left = self.unary()?;
        while let Some((precedence, right_assoc)) = binary_precedence(self.kind()) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            self.skip_newlines();
            let next_min = if right_assoc { precedence } else { precedence + 1 };
            let right = self.descend(|p| p.binary(next_min))?;
            left = SyntaxNode::other(vec![left, right]).with_span(self.span_from(start));
        }
        Ok(left)
    }

    /// Every nested expression passes through here, so this is where depth is counted.
    fn unary(&mut self) -> Result<SyntaxNode, ParseError> {
        self.descend(Self::unary_operand)
    }

    fn unary_operand(&mut self) -> Result<SyntaxNode, ParseError> {
        match self.kind() {
            TokenKind::Op("!" | "~" | "-" | "+" | "*" | "**" | "&" | ".." | "...") => {
                let start = self.start();
                self.advance();
                let operand = self.unary()?;
                Ok(SyntaxNode::other(vec![operand]).with_span(self.span_from(start)))
            }
            TokenKind::Keyword(Keyword::Not) => {
                let start = self.start();
                self.advance();
                let operand = self.expression()?;
                Ok(SyntaxNode::other(vec![operand]).with_span(self.span_from(start)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let (mut node, command) = self.primary()?;
        if command {
            return Ok(node);
        }
        loop {
            match self.kind() {
                TokenKind::Dot | TokenKind::SafeNav => {
                    self.advance();
                    self.skip_newlines();
                    let (call, command) = self.method_call(start, Some(node))?;
                    node = call;
                    if command {
                        return self.attach_do_block(start, node);
                    }
                }
                TokenKind::ColonColon if !self.current().space_before => {
                    self.advance();
                    let (call, command) = self.method_call(start, Some(node))?;
                    node = call;
                    if command {
                        return self.attach_do_block(start, node);
                    }
                }
                TokenKind::LBracket if !self.current().space_before => {
                    let open_at = self.start();
                    self.advance();
                    let mut children = vec![node];
                    children.extend(self.nested(|p| p.argument_list(&TokenKind::RBracket))?);
                    self.close(&TokenKind::RBracket, '[', open_at)?;
                    node = SyntaxNode::other(children).with_span(self.span_from(start));
                }
                TokenKind::LBrace if node.as_call().is_some() || is_identifier(&node) => {
                    let block = self.brace_block()?;
                    node = SyntaxNode::other(vec![node, block]).with_span(self.span_from(start));
                }
                TokenKind::Keyword(Keyword::Do)
                    if !self.no_do_block && (node.as_call().is_some() || is_identifier(&node)) =>
                {
                    return self.attach_do_block(start, node);
                }
                TokenKind::Newline
                    if matches!(self.peek_kind(1), TokenKind::Dot | TokenKind::SafeNav) =>
                {
                    self.advance();
                }
                _ => return Ok(node),
            }
        }
    }

    /// Method name plus arguments after `.`, `&.` or `::`, or for a bare name.
    ///
    /// The flag reports a command call, which nothing may follow but a `do` block.
    fn method_call(
        &mut self,
        start: usize,
        receiver: Option<SyntaxNode>,
    ) -> Result<(SyntaxNode, bool), ParseError> {
        let name_token = self.current().clone();
        let method = match &name_token.kind {
            TokenKind::Ident | TokenKind::Constant | TokenKind::Keyword(_) => {
                self.advance();
                name_token.span.slice(self.source).to_owned()
            }
            TokenKind::Op(op) if !is_assignment(op) => {
                self.advance();
                (*op).to_owned()
            }
            TokenKind::LParen => "call".to_owned(),
            _ => return Err(self.expected("method name")),
        };
        self.call_arguments(start, receiver, method)
    }

    fn call_arguments(
        &mut self,
        start: usize,
        receiver: Option<SyntaxNode>,
        method: String,
    ) -> Result<(SyntaxNode, bool), ParseError> {
        if self.at(&TokenKind::LParen) && !self.current().space_before {
            let open_at = self.start();
            self.advance();
            let args = self.nested(|p| p.argument_list(&TokenKind::RParen))?;
            self.close(&TokenKind::RParen, '(', open_at)?;
            let call = SyntaxNode::method_call(receiver, method, args, true)
                .with_span(self.span_from(start));
            return Ok((call, false));
        }
        if self.command_arguments_follow() {
            let saved = std::mem::replace(&mut self.no_do_block, true);
            let args = self.argument_list(&TokenKind::Eof);
            self.no_do_block = saved;
            let call = SyntaxNode::method_call(receiver, method, args?, false)
                .with_span(self.span_from(start));
            return Ok((call, true));
        }
        let call =
            SyntaxNode::method_call(receiver, method, Vec::new(), false).with_span(self.span_from(start));
        Ok((call, false))
    }

    /// Whether the current token starts the first argument of a command call.
    fn command_arguments_follow(&self) -> bool {
        let token = self.current();
        if !token.space_before {
            return false;
        }
        let tight_next = !self.peek_token(1).space_before
            && !matches!(self.peek_kind(1), TokenKind::Eof | TokenKind::Newline);
        match &token.kind {
            TokenKind::Ident
            | TokenKind::Constant
            | TokenKind::InstanceVar
            | TokenKind::ClassVar
            | TokenKind::GlobalVar
            | TokenKind::Label { .. }
            | TokenKind::StringLabel { .. }
            | TokenKind::Symbol { .. }
            | TokenKind::Str { .. }
            | TokenKind::Backtick
            | TokenKind::Regex
            | TokenKind::Words
            | TokenKind::Char
            | TokenKind::Number
            | TokenKind::Lambda
            | TokenKind::LBracket
            | TokenKind::LParen => true,
            TokenKind::Keyword(k) => {
                k.is_value()
                    || matches!(
                        k,
                        Keyword::Defined | Keyword::Super | Keyword::Yield
                    )
            }
            TokenKind::Op("!") => true,
            TokenKind::Op("-" | "+" | "*" | "**" | "&" | "~") | TokenKind::ColonColon => {
                tight_next
            }
            _ => false,
        }
    }

    /// Comma-separated arguments up to `closing` (left unconsumed).
    ///
    /// With `Eof` as closing, parses command arguments, which end at the first
    /// token that cannot continue the list. Trailing `key: value` pairs are
    /// grouped into one bare hash.
    fn argument_list(&mut self, closing: &TokenKind) -> Result<Vec<SyntaxNode>, ParseError> {
        let bracketed = *closing != TokenKind::Eof;
        let mut args = Vec::new();
        let mut pairs: Vec<SyntaxNode> = Vec::new();
        let mut pairs_start = 0;
        loop {
            if bracketed {
                self.skip_newlines();
                if self.at(closing) {
                    break;
                }
            }
            let element_start = self.start();
            match self.argument()? {
                Argument::Pair(pair) => {
                    if pairs.is_empty() {
                        pairs_start = element_start;
                    }
                    pairs.push(pair);
                }
                Argument::Positional(node) => {
                    flush_pairs(&mut args, &mut pairs, pairs_start);
                    args.push(node);
                }
            }
            if bracketed {
                self.skip_newlines();
            }
            if self.at(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                continue;
            }
            break;
        }
        flush_pairs(&mut args, &mut pairs, pairs_start);
        Ok(args)
    }

    fn argument(&mut self) -> Result<Argument, ParseError> {
        let start = self.start();
        match self.kind().clone() {
            TokenKind::Label { .. } | TokenKind::StringLabel { .. } => {
                self.hash_element().map(Argument::Pair)
            }
            TokenKind::Op("**") => self.hash_element().map(Argument::Pair),
            _ => {
                let value = self.expression()?;
                if self.at(&TokenKind::FatArrow) {
                    self.advance();
                    self.skip_newlines();
                    let mapped = self.expression()?;
                    return Ok(Argument::Pair(
                        SyntaxNode::pair(value, mapped).with_span(self.span_from(start)),
                    ));
                }
                Ok(Argument::Positional(value))
            }
        }
    }

    // ----- primaries -----

    /// A primary expression, plus whether it was a command call.
    fn primary(&mut self) -> Result<(SyntaxNode, bool), ParseError> {
        let node = self.primary_node()?;
        Ok((node, std::mem::take(&mut self.command_ended)))
    }

    fn primary_node(&mut self) -> Result<SyntaxNode, ParseError> {
        let token = self.current().clone();
        let start = token.span.start;
        let text = token.span.slice(self.source);
        match &token.kind {
            TokenKind::Ident => {
                self.advance();
                let calls_with_parens =
                    self.at(&TokenKind::LParen) && !self.current().space_before;
                if calls_with_parens || self.command_arguments_follow() {
                    let (call, command) = self.call_arguments(start, None, text.to_owned())?;
                    if command {
                        self.command_ended = true;
                        return self.attach_do_block(start, call);
                    }
                    return Ok(call);
                }
                Ok(SyntaxNode::identifier(text).with_span(token.span))
            }
            TokenKind::Constant => {
                self.advance();
                if self.at(&TokenKind::LParen) && !self.current().space_before {
                    let (call, _) = self.call_arguments(start, None, text.to_owned())?;
                    return Ok(call);
                }
                Ok(SyntaxNode::identifier(text).with_span(token.span))
            }
            TokenKind::InstanceVar | TokenKind::ClassVar | TokenKind::GlobalVar => {
                self.advance();
                Ok(SyntaxNode::identifier(text).with_span(token.span))
            }
            TokenKind::Symbol { name } => {
                self.advance();
                Ok(SyntaxNode::symbol(name.slice(self.source)).with_span(token.span))
            }
            TokenKind::Str { .. } => self.string(),
            TokenKind::Backtick
            | TokenKind::Regex
            | TokenKind::Words
            | TokenKind::Char
            | TokenKind::Number => {
                self.advance();
                Ok(SyntaxNode::other(Vec::new()).with_span(token.span))
            }
            TokenKind::ColonColon => {
                self.advance();
                if !self.at(&TokenKind::Constant) {
                    return Err(self.expected("constant after `::`"));
                }
                self.advance();
                Ok(SyntaxNode::identifier(self.span_from(start).slice(self.source))
                    .with_span(self.span_from(start)))
            }
            TokenKind::LParen => {
                self.advance();
                let body = self.nested(|p| p.statements(Closer::Paren))?;
                self.close(&TokenKind::RParen, '(', start)?;
                Ok(SyntaxNode::other(body).with_span(self.span_from(start)))
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.nested(|p| p.argument_list(&TokenKind::RBracket))?;
                self.close(&TokenKind::RBracket, '[', start)?;
                Ok(SyntaxNode::other(elements).with_span(self.span_from(start)))
            }
            TokenKind::LBrace => self.hash_literal(),
            TokenKind::Lambda => self.lambda(),
            TokenKind::Keyword(keyword) => self.keyword(*keyword),
            TokenKind::Eof | TokenKind::Newline | TokenKind::Semi => {
                Err(self.expected("expression"))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// A string literal, joining adjacent quoted literals (`"users/" "show"`)
    /// into one node the way Ruby concatenates them.
    fn string(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        let mut content = String::new();
        let mut interpolations = Vec::new();
        loop {
            let TokenKind::Str {
                content: piece,
                interpolations: ranges,
            } = self.advance().kind
            else {
                break;
            };
            content.push_str(piece.slice(self.source));
            interpolations.extend(ranges);
            if !self.at_quoted_literal() {
                break;
            }
        }
        let span = self.span_from(start);
        if interpolations.is_empty() {
            return Ok(SyntaxNode::string_literal(content).with_span(span));
        }
        let parts = interpolations
            .iter()
            .map(|range| parse_interpolation(self.source, *range, self.depth))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SyntaxNode::interpolated_string(parts).with_span(span))
    }

    /// Whether the current token is a `"..."` or `'...'` literal.
    fn at_quoted_literal(&self) -> bool {
        matches!(self.kind(), TokenKind::Str { .. })
            && matches!(self.source.as_bytes().get(self.start()), Some(b'"' | b'\''))
    }

    fn keyword(&mut self, keyword: Keyword) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        if keyword.is_value() {
            self.advance();
            return Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)));
        }
        match keyword {
            Keyword::Yield
            | Keyword::Super
            | Keyword::Defined
            | Keyword::Return
            | Keyword::Break
            | Keyword::Next => {
                let name = self.advance().span.slice(self.source).to_owned();
                let (call, command) = self.call_arguments(start, None, name)?;
                let args = call.children().into_iter().cloned().collect();
                let node = SyntaxNode::other(args).with_span(self.span_from(start));
                if command {
                    self.command_ended = true;
                    return self.attach_do_block(start, node);
                }
                Ok(node)
            }
            Keyword::Not => {
                self.advance();
                let operand = self.expression()?;
                Ok(SyntaxNode::other(vec![operand]).with_span(self.span_from(start)))
            }
            Keyword::If | Keyword::Unless | Keyword::Elsif | Keyword::While | Keyword::Until => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_do_block, true);
                let condition = self.expression_statement();
                self.no_do_block = saved;
                let condition = condition?;
                if let TokenKind::Keyword(Keyword::Then | Keyword::Do) = self.kind() {
                    self.advance();
                }
                self.relaxed = true;
                Ok(SyntaxNode::other(vec![condition]).with_span(self.span_from(start)))
            }
            Keyword::Case => {
                self.advance();
                let mut children = Vec::new();
                if !self.at_separator() && !self.at(&TokenKind::Eof) {
                    children.push(self.expression_statement()?);
                }
                self.relaxed = true;
                Ok(SyntaxNode::other(children).with_span(self.span_from(start)))
            }
            Keyword::When => {
                self.advance();
                let mut children = vec![self.expression()?];
                while self.at(&TokenKind::Comma) {
                    self.advance();
                    self.skip_newlines();
                    children.push(self.expression()?);
                }
                if self.at_keyword(Keyword::Then) {
                    self.advance();
                }
                self.relaxed = true;
                Ok(SyntaxNode::other(children).with_span(self.span_from(start)))
            }
            Keyword::Do => {
                self.advance();
                self.block_parameters()?;
                self.relaxed = true;
                Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)))
            }
            Keyword::Else | Keyword::Ensure | Keyword::Begin | Keyword::Then | Keyword::End => {
                self.advance();
                self.relaxed = true;
                Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)))
            }
            Keyword::Rescue | Keyword::In => {
                self.advance();
                self.skip_clause(true);
                self.relaxed = true;
                Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)))
            }
            Keyword::Def
            | Keyword::Class
            | Keyword::Module
            | Keyword::Alias
            | Keyword::Undef
            | Keyword::For => {
                self.advance();
                self.skip_clause(false);
                self.relaxed = true;
                Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)))
            }
            Keyword::And | Keyword::Or => Err(self.unexpected()),
            _ => {
                self.advance();
                Ok(SyntaxNode::other(Vec::new()).with_span(self.span_from(start)))
            }
        }
    }

    /// Skip a header we do not model (`def name(args)`, `rescue Error => e`)
    /// up to the end of the line, or up to `then` when `stop_at_then` is set.
    fn skip_clause(&mut self, stop_at_then: bool) {
        while !self.at_separator() && !self.at(&TokenKind::Eof) {
            if stop_at_then && self.at_keyword(Keyword::Then) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Optional `|params|` after `do` or `{`.
    fn block_parameters(&mut self) -> Result<(), ParseError> {
        match self.kind() {
            TokenKind::Op("||") => {
                self.advance();
                Ok(())
            }
            TokenKind::Pipe => {
                let open_at = self.start();
                self.advance();
                while !self.at(&TokenKind::Pipe) {
                    if self.at(&TokenKind::Eof) {
                        return Err(ParseError::new(ParseErrorKind::Unclosed('|'), open_at));
                    }
                    self.advance();
                }
                self.advance();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn attach_do_block(&mut self, start: usize, node: SyntaxNode) -> Result<SyntaxNode, ParseError> {
        if self.no_do_block || !self.at_keyword(Keyword::Do) {
            return Ok(node);
        }
        let opener = self.keyword(Keyword::Do)?;
        Ok(SyntaxNode::other(vec![node, opener]).with_span(self.span_from(start)))
    }

    fn brace_block(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        self.advance();
        self.skip_newlines();
        self.block_parameters()?;
        let body = self.nested(|p| p.statements(Closer::Brace))?;
        self.close(&TokenKind::RBrace, '{', start)?;
        Ok(SyntaxNode::other(body).with_span(self.span_from(start)))
    }

    fn lambda(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        self.advance();
        if self.at(&TokenKind::LParen) {
            let open_at = self.start();
            let mut depth = 0usize;
            loop {
                match self.kind() {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => depth = depth.saturating_sub(1),
                    TokenKind::Eof => {
                        return Err(ParseError::new(ParseErrorKind::Unclosed('('), open_at));
                    }
                    _ => {}
                }
                self.advance();
                if depth == 0 {
                    break;
                }
            }
        } else {
            while matches!(self.kind(), TokenKind::Ident | TokenKind::Comma) {
                self.advance();
            }
        }
        let body = match self.kind() {
            TokenKind::LBrace => self.brace_block()?,
            TokenKind::Keyword(Keyword::Do) => self.keyword(Keyword::Do)?,
            _ => return Err(self.expected("lambda body")),
        };
        Ok(SyntaxNode::other(vec![body]).with_span(self.span_from(start)))
    }

    // ----- hashes -----

    fn hash_literal(&mut self) -> Result<SyntaxNode, ParseError> {
        let start = self.start();
        self.advance();
        let elements = self.nested(Self::hash_elements)?;
        self.close(&TokenKind::RBrace, '{', start)?;
        Ok(SyntaxNode::hash(elements).with_span(self.span_from(start)))
    }

    fn hash_elements(&mut self) -> Result<Vec<SyntaxNode>, ParseError> {
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(&TokenKind::RBrace) || self.at(&TokenKind::Eof) {
                return Ok(elements);
            }
            elements.push(self.hash_element()?);
            self.skip_newlines();
            if self.at(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            if self.at(&TokenKind::RBrace) || self.at(&TokenKind::Eof) {
                return Ok(elements);
            }
            return Err(self.expected("`,` or `}`"));
        }
    }

    /// One hash element: `key: value`, `key:`, `"key": value`, `key => value`,
    /// `**splat`, or a shorthand name.
    fn hash_element(&mut self) -> Result<SyntaxNode, ParseError> {
        let token = self.current().clone();
        let start = token.span.start;
        match &token.kind {
            TokenKind::Label { name } => {
                self.advance();
                let key = SyntaxNode::symbol(name.slice(self.source)).with_span(*name);
                if self.value_follows() {
                    let value = self.expression()?;
                    return Ok(SyntaxNode::pair(key, value).with_span(self.span_from(start)));
                }
                Ok(SyntaxNode::shorthand_pair(key).with_span(self.span_from(start)))
            }
            TokenKind::StringLabel { content } => {
                self.advance();
                self.skip_newlines();
                let key = SyntaxNode::symbol(content.slice(self.source)).with_span(*content);
                let value = self.expression()?;
                Ok(SyntaxNode::pair(key, value).with_span(self.span_from(start)))
            }
            TokenKind::Op("**") => {
                self.advance();
                let operand = self.unary()?;
                Ok(SyntaxNode::other(vec![operand]).with_span(self.span_from(start)))
            }
            _ => {
                let key = self.expression()?;
                if self.at(&TokenKind::FatArrow) {
                    self.advance();
                    self.skip_newlines();
                    let value = self.expression()?;
                    return Ok(SyntaxNode::pair(key, value).with_span(self.span_from(start)));
                }
                if is_identifier(&key) && is_local_name(&token, self.source) {
                    return Ok(key);
                }
                Err(ParseError::new(ParseErrorKind::InvalidHashElement, start))
            }
        }
    }

    /// Whether a value follows a label on the same line.
    fn value_follows(&self) -> bool {
        !matches!(
            self.kind(),
            TokenKind::Comma
                | TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::Eof
                | TokenKind::Keyword(
                    Keyword::If | Keyword::Unless | Keyword::Do | Keyword::While | Keyword::Until
                )
        )
    }
}

enum Argument {
    Positional(SyntaxNode),
    Pair(SyntaxNode),
}

fn is_identifier(node: &SyntaxNode) -> bool {
    node.kind() == super::node::NodeKind::Identifier
}

/// Only a plain local name (`post`, not `@post`, `Post` or `valid?`) may stand
/// alone as a hash element.
fn is_local_name(token: &Token, source: &str) -> bool {
    token.kind == TokenKind::Ident && !token.span.slice(source).ends_with(['?', '!'])
}

/// Move collected `key: value` arguments into one bare hash argument.
fn flush_pairs(args: &mut Vec<SyntaxNode>, pairs: &mut Vec<SyntaxNode>, start: usize) {
    let Some(end) = pairs.last().and_then(SyntaxNode::span).map(|span| span.end) else {
        return;
    };
    let elements = std::mem::take(pairs);
    args.push(SyntaxNode::bare_hash(elements).with_span(Span::new(start, end)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::node::{NodeKind, Shape};

    fn single(source: &str) -> SyntaxNode {
        let mut tree = parse(source).unwrap();
        assert_eq!(tree.statements.len(), 1, "{source}");
        tree.statements.remove(0)
    }

    fn text(node: &SyntaxNode, source: &str) -> String {
        node.span().unwrap().slice(source).to_owned()
    }

    #[test]
    fn test_command_call_with_keyword_arguments() {
        let source = r#" render "users/show", user: current_user, admin: true "#;
        let node = single(source);
        let call = node.as_call().unwrap();
        assert_eq!(call.method, "render");
        assert!(call.receiver.is_none());
        assert!(!call.parenthesized);
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].kind(), NodeKind::StringLiteral);
        assert!(call.args[1].is_bare_hash());
        assert_eq!(text(&call.args[1], source), "user: current_user, admin: true");
        assert_eq!(
            text(&node, source),
            r#"render "users/show", user: current_user, admin: true"#
        );
    }

    #[test]
    fn test_positional_arguments() {
        let node = single(r#"render "posts/card", post, comments, author"#);
        let call = node.as_call().unwrap();
        assert_eq!(call.args.len(), 4);
        assert!(call.args[1..]
            .iter()
            .all(|a| a.kind() == NodeKind::Identifier));
    }

    #[test]
    fn test_parenthesized_call_with_hash() {
        let node = single(r#"render({ partial: "users/show", locals: { post, comments } })"#);
        let call = node.as_call().unwrap();
        assert!(call.parenthesized);
        assert_eq!(call.args.len(), 1);
        let elements = call.args[0].hash_elements().unwrap();
        assert_eq!(elements.len(), 2);
        let Shape::Pair { value, .. } = elements[1].shape() else {
            panic!("expected pair");
        };
        let locals = value.as_deref().unwrap();
        assert_eq!(locals.hash_elements().unwrap().len(), 2);
    }

    #[test]
    fn test_receiver_call() {
        let node = single(r#"view.render "users/show""#);
        let call = node.as_call().unwrap();
        assert_eq!(call.method, "render");
        assert!(call.receiver.is_some());
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn test_bare_identifier() {
        let node = single(" render user_template_path ");
        let call = node.as_call().unwrap();
        assert_eq!(call.args[0].kind(), NodeKind::Identifier);
        assert_eq!(single("current_user").kind(), NodeKind::Identifier);
    }

    #[test]
    fn test_interpolated_string_parts_use_absolute_offsets() {
        let source = r#"render "posts/#{post.kind}""#;
        let node = single(source);
        let arg = &node.as_call().unwrap().args[0];
        assert_eq!(arg.kind(), NodeKind::InterpolatedString);
        let part = arg.children()[0];
        assert_eq!(text(part, source), "post.kind");
    }

    #[test]
    fn test_do_block_spanning_islands() {
        let tree = parse(" @posts.each do |post| ").unwrap();
        assert_eq!(tree.statements.len(), 1);
        let tree = parse(" end ").unwrap();
        assert_eq!(tree.statements.len(), 1);
        let tree = parse(" if user.admin? ").unwrap();
        assert_eq!(tree.statements.len(), 1);
        assert!(parse(" else ").is_ok());
    }

    #[test]
    fn test_do_block_binds_to_command_call() {
        let node = single(" form_with model: @user do |f| ");
        let children = node.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_call().unwrap().method, "form_with");
    }

    #[test]
    fn test_modifier_and_ternary() {
        let tree = parse(r#"render "a" if show_a?"#).unwrap();
        assert_eq!(tree.statements.len(), 1);
        assert!(parse("x ? y : z").is_ok());
        assert!(parse(r#"content_for?(:title) ? yield(:title) : "Default""#).is_ok());
    }

    #[test]
    fn test_brace_block() {
        let node = single("items.map { |i| i * 2 }.join(', ')");
        assert_eq!(node.as_call().unwrap().method, "join");
    }

    #[test]
    fn test_hash_shorthand_and_value_omission() {
        let node = single("{ post, author:, title: t }");
        let elements = node.hash_elements().unwrap();
        assert_eq!(elements[0].kind(), NodeKind::Identifier);
        assert!(matches!(elements[1].shape(), Shape::Pair { value: None, .. }));
        assert!(matches!(elements[2].shape(), Shape::Pair { value: Some(_), .. }));
    }

    #[test]
    fn test_invalid_hash_element() {
        let err = parse("{ 1 + 2 }").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidHashElement);
    }

    #[test]
    fn test_shorthand_requires_local_name() {
        for source in ["{ @post }", "{ @@count }", "{ $stdout }", "{ Post }", "{ ::Post }", "{ valid? }"] {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::InvalidHashElement, "{source}");
            assert_eq!(err.offset, 2, "{source}");
        }
        assert!(parse("{ post, _author }").is_ok());
    }

    #[test]
    fn test_unclosed_paren() {
        let err = parse(r#"render("users/show""#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Unclosed('('));
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("{}1{}", "(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert!(parse(&within).is_ok());

        for source in [
            format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000)),
            format!("{}{}", "[".repeat(5_000), "]".repeat(5_000)),
            format!("{}1", "!".repeat(5_000)),
            format!("{}x", "not ".repeat(5_000)),
            format!("x{}", " = x".repeat(5_000)),
            format!("a{}", " ** a".repeat(5_000)),
            format!("a{}", " ? a : a".repeat(5_000)),
            format!("{}x{}", "\"#{".repeat(5_000), "}\"".repeat(5_000)),
        ] {
            let err = parse(&source).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::TooDeep(MAX_NESTING), "{}", &source[..20]);
        }
    }

    #[test]
    fn test_adjacent_literals_are_one_string() {
        let source = r#"render "users/" 'show', user: u"#;
        let node = single(source);
        let call = node.as_call().unwrap();
        assert_eq!(call.args.len(), 2);
        assert!(matches!(
            call.args[0].shape(),
            Shape::StringLiteral { content } if content == "users/show"
        ));
        assert_eq!(text(&call.args[0], source), r#""users/" 'show'"#);

        let node = single(r##"render "posts/" "#{kind}""##);
        assert_eq!(node.as_call().unwrap().args[0].kind(), NodeKind::InterpolatedString);
        assert_eq!(parse("x = \"a\"\n\"b\"").unwrap().statements.len(), 2);
    }

    #[test]
    fn test_stray_closing_bracket() {
        let err = parse("foo)").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken(_)));
    }

    #[test]
    fn test_missing_operand() {
        let err = parse("a +").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Expected { .. }));
    }

    #[test]
    fn test_multiple_statements() {
        let tree = parse("x = 1; render \"a\"\nrender \"b\"").unwrap();
        assert_eq!(tree.statements.len(), 3);
    }

    #[test]
    fn test_fat_arrow_pairs() {
        let node = single(r#"render "a", :user => u, "k" => v"#);
        let call = node.as_call().unwrap();
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[1].hash_elements().unwrap().len(), 2);
    }

    #[test]
    fn test_index_and_scope() {
        assert!(parse("params[:id]").is_ok());
        let node = single("Foo::Bar.render \"x\"");
        assert!(node.as_call().unwrap().receiver.is_some());
    }

    #[test]
    fn test_binary_vs_unary_minus() {
        let node = single("x - 1");
        assert_eq!(node.kind(), NodeKind::Other);
        let node = single("foo -1");
        assert_eq!(node.kind(), NodeKind::Call);
    }
}
