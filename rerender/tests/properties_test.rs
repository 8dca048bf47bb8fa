//! Invariants of the rewrite: idempotence, round-trip, literal preservation,
//! and non-interference between islands and calls.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use rerender::syntax::{parse, print, SyntaxNode};
use rerender::{classify, rewrite_call, rewrite_document, rewrite_island, Classification};

const CALLS: &[&str] = &[
    r#"render "users/show""#,
    r#"render 'users/show'"#,
    r#"render "users/show", user: current_user, admin: true"#,
    r#"render "posts/card", post, comments, author"#,
    r#"render("posts/#{kind}/card", post: @post)"#,
    r#"render "users/show", { user: user }"#,
    r#"render "users/show", :user => user, "admin" => true"#,
    r#"render "users/show", user: users.find { |u| u.admin? }"#,
    r#"render "users/show", count: items.size * 2, label: t("users.title")"#,
];

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <%# render "commented/out" %>
  <p>Literal <%%= render "escaped" %></p>
  <h1><%= @title %></h1>
  <% if current_user %>
    <%= render "users/nav", user: current_user -%>
  <% else %>
    <%== render "users/guest" %>
  <% end %>
  <% @posts.each do |post| %>
    <%= render "posts/card", post, comments: post.comments %>
  <% end %>
  <%= render partial: "shared/footer" %>
  <%= link_to "Home", root_path %>
</body>
</html>
"#;

fn only_call(source: &str) -> SyntaxNode {
    let tree = parse(source).unwrap();
    assert_eq!(tree.statements.len(), 1, "{source}");
    tree.statements.into_iter().next().unwrap()
}

#[test]
fn test_idempotence_of_calls() {
    for &code in CALLS {
        let first = rewrite_island(code).unwrap();
        assert!(first.changed, "{code}");
        let second = rewrite_island(&first.text).unwrap();
        assert!(!second.changed, "{code}");
        assert_eq!(second.text, first.text);
    }
}

#[test]
fn test_idempotence_of_documents() {
    let first = rewrite_document(TEMPLATE);
    assert!(first.changed());
    let second = rewrite_document(&first.text);
    assert!(!second.changed());
    assert_eq!(second.text, first.text);
}

#[test]
fn test_printed_rewrite_reparses_to_same_structure() {
    for &code in CALLS {
        let node = only_call(code);
        let Classification::Eligible(eligible) = classify(&node) else {
            panic!("{code} should be eligible");
        };
        let rewritten = rewrite_call(&eligible);
        let printed = print(&rewritten, code);
        let reparsed = only_call(&printed);
        assert!(
            reparsed.same_structure(&rewritten),
            "{code} printed as {printed}"
        );
    }
}

#[test]
fn test_template_literal_is_preserved_exactly() {
    for (code, literal) in [
        (r#"render 'users/show'"#, "'users/show'"),
        (r#"render "a\"b""#, r#""a\"b""#),
        (r#"render "posts/#{kind}/card", post"#, r#""posts/#{kind}/card""#),
        (r#"render %q(users/show)"#, "%q(users/show)"),
    ] {
        let out = rewrite_island(code).unwrap();
        assert!(out.changed, "{code}");
        assert!(
            out.text.starts_with(&format!("render({{ partial: {literal}")),
            "{code} became {}",
            out.text
        );
    }
}

#[test]
fn test_markup_and_untouched_islands_are_byte_identical() {
    let result = rewrite_document(TEMPLATE);
    let expected = TEMPLATE
        .replace(
            r#"render "users/nav", user: current_user -%>"#,
            r#"render({ partial: "users/nav", locals: { user: current_user } }) -%>"#,
        )
        .replace(
            r#"render "users/guest" %>"#,
            r#"render({ partial: "users/guest" }) %>"#,
        )
        .replace(
            r#"render "posts/card", post, comments: post.comments %>"#,
            r#"render({ partial: "posts/card", locals: { post, comments: post.comments } }) %>"#,
        );
    assert_eq!(result.text, expected);
    assert_eq!(result.islands_changed, 3);
    assert_eq!(result.calls_rewritten, 3);
    assert!(result.faults.is_empty());
}

#[test]
fn test_comments_and_escapes_are_not_islands() {
    let result = rewrite_document(TEMPLATE);
    // 11 code tags; the comment and the escape are skipped.
    assert_eq!(result.islands_found, 11);
    assert!(result.text.contains(r#"<%# render "commented/out" %>"#));
    assert!(result.text.contains(r#"<%%= render "escaped" %>"#));
}

#[test]
fn test_fault_in_one_island_does_not_change_others() {
    let clean = "<%= render \"a\" %>\n<%= render \"b\", x: 1 %>\n";
    let dirty = "<%= render \"a\" %>\n<%= render(( %>\n<%= render \"b\", x: 1 %>\n";

    let clean_out = rewrite_document(clean);
    let dirty_out = rewrite_document(dirty);
    assert_eq!(
        dirty_out.text,
        "<%= render({ partial: \"a\" }) %>\n<%= render(( %>\n<%= render({ partial: \"b\", locals: { x: 1 } }) %>\n"
    );
    assert_eq!(clean_out.calls_rewritten, dirty_out.calls_rewritten);
    assert_eq!(dirty_out.faults.len(), 1);
    assert_eq!(dirty_out.faults[0].island, 2);
}

#[test]
fn test_independent_calls_in_one_island_do_not_interfere() {
    let out = rewrite_island(r#" [render("a"), helper(1), render("b", y: 2)].join "#).unwrap();
    assert_eq!(out.calls_rewritten, 2);
    assert_eq!(
        out.text,
        r#" [render({ partial: "a" }), helper(1), render({ partial: "b", locals: { y: 2 } })].join "#
    );
}
