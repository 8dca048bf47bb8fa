//! Builds the explicit `render({ partial: ..., locals: ... })` form.

use crate::classify::Eligible;
use crate::constants::{LOCALS_KEY, PARTIAL_KEY, RESERVED_WORD};
use crate::syntax::{NodeKind, SyntaxNode};

/// Build the replacement for an eligible call.
///
/// The result is a parenthesized receiver-less call whose only argument is a
/// hash with `partial:` first and, when there were further arguments,
/// `locals:` second. Every sub-node is taken from the original call, so no
/// literal text is ever re-encoded.
#[must_use]
pub fn rewrite_call(eligible: &Eligible<'_>) -> SyntaxNode {
    let mut pairs = vec![SyntaxNode::pair(
        SyntaxNode::symbol(PARTIAL_KEY),
        eligible.template.clone(),
    )];

    match eligible.remaining {
        [] => {}
        [hash] if hash.kind() == NodeKind::HashLiteral => {
            pairs.push(SyntaxNode::pair(SyntaxNode::symbol(LOCALS_KEY), hash.clone()));
        }
        rest => {
            let elements = rest
                .iter()
                .flat_map(|arg| match arg.hash_elements() {
                    Some(elements) if arg.is_bare_hash() => elements.to_vec(),
                    _ => vec![arg.clone()],
                })
                .collect();
            pairs.push(SyntaxNode::pair(
                SyntaxNode::symbol(LOCALS_KEY),
                SyntaxNode::hash(elements),
            ));
        }
    }

    SyntaxNode::call(RESERVED_WORD, vec![SyntaxNode::hash(pairs)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::syntax::{parse, print};

    fn rewrite_source(source: &str) -> String {
        let tree = parse(source).unwrap();
        let classification = classify(&tree.statements[0]);
        let eligible = classification.eligible().unwrap();
        print(&rewrite_call(eligible), source)
    }

    #[test]
    fn test_template_only() {
        assert_eq!(
            rewrite_source(r#"render "users/show""#),
            r#"render({ partial: "users/show" })"#
        );
    }

    #[test]
    fn test_keyword_arguments_become_locals() {
        assert_eq!(
            rewrite_source(r#"render "users/show", user: current_user, admin: true"#),
            r#"render({ partial: "users/show", locals: { user: current_user, admin: true } })"#
        );
    }

    #[test]
    fn test_positional_arguments_become_shorthand_locals() {
        assert_eq!(
            rewrite_source(r#"render "posts/card", post, comments, author"#),
            r#"render({ partial: "posts/card", locals: { post, comments, author } })"#
        );
    }

    #[test]
    fn test_braced_hash_is_kept_as_written() {
        assert_eq!(
            rewrite_source(r#"render "users/show", {user:  u}"#),
            r#"render({ partial: "users/show", locals: {user:  u} })"#
        );
    }

    #[test]
    fn test_mixed_arguments_are_flattened() {
        assert_eq!(
            rewrite_source(r#"render "posts/card", post, author: current_user"#),
            r#"render({ partial: "posts/card", locals: { post, author: current_user } })"#
        );
    }

    #[test]
    fn test_interpolated_template_is_byte_identical() {
        let source = r#"render "posts/#{post.kind}_card\t", post"#;
        let out = rewrite_source(source);
        assert_eq!(
            out,
            r#"render({ partial: "posts/#{post.kind}_card\t", locals: { post } })"#
        );
    }

    #[test]
    fn test_single_quoted_template_keeps_quotes() {
        assert_eq!(
            rewrite_source("render 'users/show'"),
            "render({ partial: 'users/show' })"
        );
    }

    #[test]
    fn test_output_reparses_to_rewritten_tree() {
        let source = r#"render "users/show", user: current_user"#;
        let tree = parse(source).unwrap();
        let classification = classify(&tree.statements[0]);
        let rewritten = rewrite_call(classification.eligible().unwrap());
        let printed = print(&rewritten, source);
        let reparsed = parse(&printed).unwrap();
        assert!(reparsed.statements[0].same_structure(&rewritten));
    }

    #[test]
    fn test_output_is_not_eligible_again() {
        let out = rewrite_source(r#"render "users/show", user: u"#);
        let tree = parse(&out).unwrap();
        assert!(classify(&tree.statements[0]).eligible().is_none());
    }
}
