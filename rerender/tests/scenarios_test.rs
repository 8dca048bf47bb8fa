//! End-to-end migration scenarios through the public library API.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use rerender::{rewrite_document, rewrite_island, IslandError};

fn migrate(code: &str) -> String {
    rewrite_island(code).expect("island should parse").text.into_owned()
}

#[test]
fn test_template_only() {
    assert_eq!(
        migrate(r#"render "users/show""#),
        r#"render({ partial: "users/show" })"#
    );
}

#[test]
fn test_keyword_locals() {
    assert_eq!(
        migrate(r#"render "users/show", user: current_user, admin: true"#),
        r#"render({ partial: "users/show", locals: { user: current_user, admin: true } })"#
    );
}

#[test]
fn test_positional_locals_become_shorthand() {
    assert_eq!(
        migrate(r#"render "posts/card", post, comments, author"#),
        r#"render({ partial: "posts/card", locals: { post, comments, author } })"#
    );
}

#[test]
fn test_explicit_form_is_untouched() {
    let code = r#"render partial: "users/show", locals: { user: current_user }"#;
    let out = rewrite_island(code).unwrap();
    assert!(!out.changed);
    assert_eq!(out.text, code);
}

#[test]
fn test_dynamic_template_is_untouched() {
    let out = rewrite_island("render user_template_path").unwrap();
    assert!(!out.changed);
    assert_eq!(out.calls_rewritten, 0);
}

#[test]
fn test_broken_island_does_not_block_valid_one() {
    let host = "<ul>\n  <%= render \"users/row\", user: user %>\n  <%= render(\"users/footer\" %>\n</ul>\n";
    let result = rewrite_document(host);

    assert_eq!(result.islands_found, 2);
    assert_eq!(result.islands_changed, 1);
    assert_eq!(
        result.text,
        "<ul>\n  <%= render({ partial: \"users/row\", locals: { user: user } }) %>\n  <%= render(\"users/footer\" %>\n</ul>\n"
    );
    assert_eq!(result.faults.len(), 1);
    assert_eq!(result.faults[0].line, 3);
    assert!(matches!(result.faults[0].error, IslandError::Parse(_)));
}

#[test]
fn test_receiver_calls_are_untouched() {
    for code in [
        r#"view.render "users/show""#,
        r#"controller&.render "users/show", user: user"#,
    ] {
        assert!(!rewrite_island(code).unwrap().changed, "{code}");
    }
}

#[test]
fn test_other_override_keys_block_rewrite() {
    for code in [
        r#"render "users/show", layout: "narrow""#,
        r#"render "users/show", :template => "x""#,
        r#"render "users/show", { "partial" => "x" }"#,
    ] {
        assert!(!rewrite_island(code).unwrap().changed, "{code}");
    }
}

#[test]
fn test_parenthesized_and_interpolated_templates() {
    assert_eq!(
        migrate(r#"render("users/#{kind}", user: user)"#),
        r#"render({ partial: "users/#{kind}", locals: { user: user } })"#
    );
}

#[test]
fn test_existing_hash_is_kept_as_locals() {
    assert_eq!(
        migrate(r#"render "users/show", { user: user, admin: false }"#),
        r#"render({ partial: "users/show", locals: { user: user, admin: false } })"#
    );
}

#[test]
fn test_mixed_shorthand_and_pairs() {
    assert_eq!(
        migrate(r#"render "posts/card", post, author: post.author"#),
        r#"render({ partial: "posts/card", locals: { post, author: post.author } })"#
    );
}

#[test]
fn test_calls_inside_block_islands() {
    let host = "<% @posts.each do |post| %>\n  <%= render \"posts/card\", post %>\n<% end %>\n";
    let result = rewrite_document(host);
    assert_eq!(result.islands_found, 3);
    assert_eq!(result.islands_changed, 1);
    assert!(result.faults.is_empty());
    assert_eq!(
        result.text,
        "<% @posts.each do |post| %>\n  <%= render({ partial: \"posts/card\", locals: { post } }) %>\n<% end %>\n"
    );
}
