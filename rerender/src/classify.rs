//! Decides whether a call node is a legacy `render "path", ...` call.
//!
//! The checks run in a fixed order and the first failing one decides the
//! reason. Nothing here fails: an unsupported shape is simply not eligible.

use crate::constants::{OVERRIDE_KEYS, RESERVED_WORD};
use crate::syntax::{NodeKind, Shape, SyntaxNode};

/// Why a node was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ineligible {
    /// The node is not a method call.
    NotACall,
    /// The call has an explicit receiver (`view.render ...`).
    HasReceiver,
    /// The method is not the reserved one.
    OtherCallee,
    /// A hash argument already carries `partial:`, `template:` or `layout:`.
    OverrideKey,
    /// The call has no arguments.
    MissingTemplate,
    /// The first argument is not a string literal.
    TemplateNotLiteral,
}

impl Ineligible {
    /// Short human-readable reason
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotACall => "not a call",
            Self::HasReceiver => "call has a receiver",
            Self::OtherCallee => "different method",
            Self::OverrideKey => "explicit partial/template/layout key",
            Self::MissingTemplate => "no template argument",
            Self::TemplateNotLiteral => "template is not a string literal",
        }
    }
}

impl std::fmt::Display for Ineligible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of an eligible call, borrowed from the parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligible<'a> {
    /// The call node itself
    pub call: &'a SyntaxNode,
    /// First argument, a string literal with or without interpolation
    pub template: &'a SyntaxNode,
    /// Every argument after the template, in source order
    pub remaining: &'a [SyntaxNode],
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// Leave the node unchanged.
    NotEligible(Ineligible),
    /// Rewrite the node.
    Eligible(Eligible<'a>),
}

impl<'a> Classification<'a> {
    /// The eligible parts, if any
    #[must_use]
    pub const fn eligible(&self) -> Option<&Eligible<'a>> {
        match self {
            Self::Eligible(eligible) => Some(eligible),
            Self::NotEligible(_) => None,
        }
    }
}

/// Classify `node`.
#[must_use]
pub fn classify(node: &SyntaxNode) -> Classification<'_> {
    let Some(call) = node.as_call() else {
        return Classification::NotEligible(Ineligible::NotACall);
    };
    if call.receiver.is_some() {
        return Classification::NotEligible(Ineligible::HasReceiver);
    }
    if call.method != RESERVED_WORD {
        return Classification::NotEligible(Ineligible::OtherCallee);
    }
    if call.args.iter().any(has_override_key) {
        return Classification::NotEligible(Ineligible::OverrideKey);
    }
    let Some((template, remaining)) = call.args.split_first() else {
        return Classification::NotEligible(Ineligible::MissingTemplate);
    };
    if !matches!(
        template.kind(),
        NodeKind::StringLiteral | NodeKind::InterpolatedString
    ) {
        return Classification::NotEligible(Ineligible::TemplateNotLiteral);
    }
    Classification::Eligible(Eligible {
        call: node,
        template,
        remaining,
    })
}

/// Whether `arg` is a hash literal with a pair keyed by an override key.
fn has_override_key(arg: &SyntaxNode) -> bool {
    arg.hash_elements().is_some_and(|elements| {
        elements.iter().any(|element| match element.shape() {
            Shape::Pair { key, .. } => key_name(key).is_some_and(|name| OVERRIDE_KEYS.contains(&name)),
            _ => false,
        })
    })
}

/// The literal name of a hash key: symbols and plain string literals.
fn key_name(key: &SyntaxNode) -> Option<&str> {
    match key.shape() {
        Shape::Symbol { name } => Some(name.as_str()),
        Shape::StringLiteral { content } => Some(content.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn classify_source(source: &str) -> Result<(), Ineligible> {
        let tree = parse(source).unwrap();
        match classify(&tree.statements[0]) {
            Classification::Eligible(_) => Ok(()),
            Classification::NotEligible(reason) => Err(reason),
        }
    }

    #[test]
    fn test_plain_template_is_eligible() {
        assert_eq!(classify_source(r#"render "users/show""#), Ok(()));
        assert_eq!(classify_source(r#"render("users/show")"#), Ok(()));
        assert_eq!(classify_source(r#"render 'users/show'"#), Ok(()));
        assert_eq!(classify_source(r#"render "users/#{kind}""#), Ok(()));
    }

    #[test]
    fn test_eligible_parts() {
        let tree = parse(r#"render "posts/card", post, comments"#).unwrap();
        let classification = classify(&tree.statements[0]);
        let eligible = classification.eligible().unwrap();
        assert_eq!(eligible.template.kind(), NodeKind::StringLiteral);
        assert_eq!(eligible.remaining.len(), 2);
    }

    #[test]
    fn test_receiver_is_rejected_first() {
        assert_eq!(
            classify_source(r#"view.render partial: "x""#),
            Err(Ineligible::HasReceiver)
        );
    }

    #[test]
    fn test_other_callee() {
        assert_eq!(
            classify_source(r#"render_card "users/show""#),
            Err(Ineligible::OtherCallee)
        );
    }

    #[test]
    fn test_override_keys_in_any_spelling() {
        for source in [
            r#"render partial: "users/show", locals: { user: current_user }"#,
            r#"render "users/show", layout: "admin""#,
            r#"render template: "users/show""#,
            r#"render "users/show", :partial => "x""#,
            r#"render "users/show", "template" => "x""#,
            r#"render({ partial: "users/show" })"#,
            r#"render "a", { :layout => false }"#,
        ] {
            assert_eq!(classify_source(source), Err(Ineligible::OverrideKey), "{source}");
        }
    }

    #[test]
    fn test_override_key_is_syntactic() {
        // A local variable named `partial` is not a key.
        assert_eq!(classify_source(r#"render "users/show", partial"#), Ok(()));
        // Nested keys do not count, only the argument hash itself.
        assert_eq!(
            classify_source(r#"render "users/show", locals: { layout: 1 }"#),
            Ok(())
        );
    }

    #[test]
    fn test_template_must_be_literal() {
        assert_eq!(
            classify_source("render user_template_path"),
            Err(Ineligible::TemplateNotLiteral)
        );
        assert_eq!(
            classify_source(r#"render :show"#),
            Err(Ineligible::TemplateNotLiteral)
        );
    }

    #[test]
    fn test_not_a_call() {
        assert_eq!(classify_source("render"), Err(Ineligible::NotACall));
        assert_eq!(classify_source(r#""users/show""#), Err(Ineligible::NotACall));
    }

    #[test]
    fn test_missing_template() {
        assert_eq!(classify_source("render()"), Err(Ineligible::MissingTemplate));
    }
}
