//! Printing syntax nodes back to code.
//!
//! Parsed nodes are reproduced from their source span through a
//! [`SourceText`] resolver; nodes without a span are printed in a fixed
//! canonical form. Keyword arguments that were written without braces gain
//! `{ }` whenever they are printed anywhere but the end of an argument list.

use std::borrow::Cow;

use super::node::{Shape, Span, SyntaxNode};

/// Resolves the text of nodes that were parsed from source.
pub trait SourceText {
    /// Text to print for `node`, which was parsed from `span`.
    fn text(&self, node: &SyntaxNode, span: Span) -> Cow<'_, str>;
}

/// Resolver returning the source text under each span unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Verbatim<'a>(pub &'a str);

impl SourceText for Verbatim<'_> {
    fn text(&self, _node: &SyntaxNode, span: Span) -> Cow<'_, str> {
        Cow::Borrowed(span.slice(self.0))
    }
}

/// Print `node`, taking parsed sub-nodes verbatim from `source`.
#[must_use]
pub fn print(node: &SyntaxNode, source: &str) -> String {
    print_with(node, &Verbatim(source))
}

/// Print `node`, asking `resolver` for the text of parsed sub-nodes.
#[must_use]
pub fn print_with(node: &SyntaxNode, resolver: &dyn SourceText) -> String {
    let mut out = String::new();
    write_node(&mut out, node, resolver, Position::Value);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Value,
    Argument,
}

fn write_node(out: &mut String, node: &SyntaxNode, resolver: &dyn SourceText, position: Position) {
    if let Some(span) = node.span() {
        let text = resolver.text(node, span);
        if node.is_bare_hash() && position == Position::Value {
            out.push_str("{ ");
            out.push_str(&text);
            out.push_str(" }");
        } else {
            out.push_str(&text);
        }
        return;
    }

    match node.shape() {
        Shape::Call(call) => {
            if let Some(receiver) = &call.receiver {
                write_node(out, receiver, resolver, Position::Value);
                out.push('.');
            }
            out.push_str(&call.method);
            if call.parenthesized {
                out.push('(');
                write_list(out, &call.args, resolver, Position::Argument);
                out.push(')');
            } else if !call.args.is_empty() {
                out.push(' ');
                write_list(out, &call.args, resolver, Position::Argument);
            }
        }
        Shape::StringLiteral { content } => {
            out.push('"');
            out.push_str(content);
            out.push('"');
        }
        Shape::InterpolatedString { parts } => {
            out.push('"');
            for part in parts {
                out.push_str("#{");
                write_node(out, part, resolver, Position::Value);
                out.push('}');
            }
            out.push('"');
        }
        Shape::HashLiteral { elements, braced } => {
            if !braced && position == Position::Argument {
                write_list(out, elements, resolver, Position::Value);
            } else if elements.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                write_list(out, elements, resolver, Position::Value);
                out.push_str(" }");
            }
        }
        Shape::Pair { key, value } => {
            if let Shape::Symbol { name } = key.shape() {
                write_label(out, name);
                if let Some(value) = value {
                    out.push(' ');
                    write_node(out, value, resolver, Position::Value);
                }
            } else {
                write_node(out, key, resolver, Position::Value);
                if let Some(value) = value {
                    out.push_str(" => ");
                    write_node(out, value, resolver, Position::Value);
                }
            }
        }
        Shape::Symbol { name } => {
            out.push(':');
            if is_plain_name(name) {
                out.push_str(name);
            } else {
                out.push('"');
                out.push_str(name);
                out.push('"');
            }
        }
        Shape::Identifier { name } => out.push_str(name),
        Shape::Other { children } => {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_node(out, child, resolver, Position::Value);
            }
        }
    }
}

fn write_list(
    out: &mut String,
    nodes: &[SyntaxNode],
    resolver: &dyn SourceText,
    position: Position,
) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_node(out, node, resolver, position);
    }
}

fn write_label(out: &mut String, name: &str) {
    if is_plain_name(name) {
        out.push_str(name);
    } else {
        out.push('"');
        out.push_str(name);
        out.push('"');
    }
    out.push(':');
}

/// Whether `name` can be written as a bare label or symbol.
fn is_plain_name(name: &str) -> bool {
    let body = name.strip_suffix(|c| c == '?' || c == '!').unwrap_or(name);
    let mut bytes = body.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_' || b >= 0x80)
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn test_parsed_nodes_print_verbatim() {
        let source = r#"render  "users/show" ,user:current_user"#;
        let tree = parse(source).unwrap();
        assert_eq!(print(&tree.statements[0], source), source);
    }

    #[test]
    fn test_synthesized_call_with_nested_hash() {
        let node = SyntaxNode::call(
            "render",
            vec![SyntaxNode::hash(vec![
                SyntaxNode::pair(
                    SyntaxNode::symbol("partial"),
                    SyntaxNode::string_literal("users/show"),
                ),
                SyntaxNode::pair(
                    SyntaxNode::symbol("locals"),
                    SyntaxNode::hash(vec![SyntaxNode::identifier("post")]),
                ),
            ])],
        );
        assert_eq!(
            print(&node, ""),
            r#"render({ partial: "users/show", locals: { post } })"#
        );
    }

    #[test]
    fn test_bare_hash_gains_braces_as_value() {
        let source = r#"render "a", user: u"#;
        let tree = parse(source).unwrap();
        let bare = &tree.statements[0].as_call().unwrap().args[1];
        assert_eq!(print(bare, source), "{ user: u }");

        let wrapped = SyntaxNode::pair(SyntaxNode::symbol("locals"), bare.clone());
        assert_eq!(print(&wrapped, source), "locals: { user: u }");
    }

    #[test]
    fn test_bare_hash_stays_bare_as_trailing_argument() {
        let node = SyntaxNode::method_call(
            None,
            "link_to",
            vec![
                SyntaxNode::string_literal("Home"),
                SyntaxNode::bare_hash(vec![SyntaxNode::pair(
                    SyntaxNode::symbol("class"),
                    SyntaxNode::string_literal("nav"),
                )]),
            ],
            false,
        );
        assert_eq!(print(&node, ""), r#"link_to "Home", class: "nav""#);
    }

    #[test]
    fn test_empty_hash_and_odd_keys() {
        assert_eq!(print(&SyntaxNode::hash(vec![]), ""), "{}");
        let pair = SyntaxNode::pair(
            SyntaxNode::symbol("data-id"),
            SyntaxNode::identifier("x"),
        );
        assert_eq!(print(&pair, ""), r#""data-id": x"#);
        let arrow = SyntaxNode::pair(SyntaxNode::string_literal("k"), SyntaxNode::identifier("v"));
        assert_eq!(print(&arrow, ""), r#""k" => v"#);
        assert_eq!(print(&SyntaxNode::symbol("ok?"), ""), ":ok?");
    }

    struct Upper<'a>(&'a str);

    impl SourceText for Upper<'_> {
        fn text(&self, _node: &SyntaxNode, span: Span) -> Cow<'_, str> {
            Cow::Owned(span.slice(self.0).to_uppercase())
        }
    }

    #[test]
    fn test_custom_resolver_is_used_for_parsed_nodes() {
        let source = "post";
        let tree = parse(source).unwrap();
        let node = SyntaxNode::hash(vec![tree.statements[0].clone()]);
        assert_eq!(print_with(&node, &Upper(source)), "{ POST }");
    }
}
