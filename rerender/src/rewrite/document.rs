//! Rewrites every island of a template document.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use super::island::{rewrite_island, IslandError};
use crate::island::islands;
use crate::utils::LineIndex;

/// An island that was left unchanged because it could not be rewritten safely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IslandFault {
    /// 1-indexed line of the problem in the document
    pub line: usize,
    /// 1-indexed position of the island among the document's islands
    pub island: usize,
    /// What went wrong
    #[serde(serialize_with = "serialize_display")]
    pub error: IslandError,
}

impl fmt::Display for IslandFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

fn serialize_display<S: serde::Serializer>(
    error: &IslandError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRewrite<'a> {
    /// The new document, borrowed when nothing changed
    pub text: Cow<'a, str>,
    /// Code islands seen (comments and escapes excluded)
    pub islands_found: usize,
    /// Islands whose code was replaced
    pub islands_changed: usize,
    /// Calls rewritten across all islands
    pub calls_rewritten: usize,
    /// Islands skipped because of parse problems
    pub faults: Vec<IslandFault>,
}

impl DocumentRewrite<'_> {
    /// Whether the document text differs from the input
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.islands_changed > 0
    }
}

/// Rewrite every island of `host`.
///
/// Text outside islands, delimiters, and islands that are not rewritten are
/// copied byte for byte. A fault in one island never affects the others.
#[must_use]
pub fn rewrite_document(host: &str) -> DocumentRewrite<'_> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut lines: Option<LineIndex> = None;
    let mut result = DocumentRewrite {
        text: Cow::Borrowed(host),
        islands_found: 0,
        islands_changed: 0,
        calls_rewritten: 0,
        faults: Vec::new(),
    };

    for island in islands(host) {
        result.islands_found += 1;
        if !island.mentions_reserved_word() {
            continue;
        }
        match rewrite_island(island.code) {
            Ok(rewrite) if rewrite.changed => {
                let buffer = out.get_or_insert_with(|| String::with_capacity(host.len() + 64));
                buffer.push_str(&host[copied..island.code_range.start]);
                buffer.push_str(&rewrite.text);
                copied = island.code_range.end;
                result.islands_changed += 1;
                result.calls_rewritten += rewrite.calls_rewritten;
            }
            Ok(_) => {}
            Err(error) => {
                let offset = island.code_range.start + error.offset().unwrap_or(0);
                let line = lines
                    .get_or_insert_with(|| LineIndex::new(host))
                    .line_number(offset);
                tracing::debug!(line, island = result.islands_found, %error, "leaving island unchanged");
                result.faults.push(IslandFault {
                    line,
                    island: result.islands_found,
                    error,
                });
            }
        }
    }

    if let Some(mut buffer) = out {
        buffer.push_str(&host[copied..]);
        result.text = Cow::Owned(buffer);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_without_islands_is_borrowed() {
        let host = "<p>plain html</p>";
        let result = rewrite_document(host);
        assert!(matches!(result.text, Cow::Borrowed(_)));
        assert_eq!(result.islands_found, 0);
        assert!(!result.changed());
    }

    #[test]
    fn test_delimiters_and_markup_are_preserved() {
        let host = "<div>\n  <%= render \"users/show\" -%>\n</div>\n";
        let result = rewrite_document(host);
        assert_eq!(
            result.text,
            "<div>\n  <%= render({ partial: \"users/show\" }) -%>\n</div>\n"
        );
        assert_eq!(result.islands_found, 1);
        assert_eq!(result.islands_changed, 1);
    }

    #[test]
    fn test_fault_line_points_into_document() {
        let host = "<h1>Title</h1>\n<p>\n<%= render(\"a\" %>\n</p>";
        let result = rewrite_document(host);
        assert_eq!(result.faults.len(), 1);
        assert_eq!(result.faults[0].line, 3);
        assert_eq!(result.faults[0].island, 1);
        assert_eq!(result.text, host);
    }

    #[test]
    fn test_islands_without_reserved_word_are_counted_but_not_parsed() {
        // `)` would not parse, but the island never reaches the parser.
        let host = "<%= foo) %><%= render \"a\" %>";
        let result = rewrite_document(host);
        assert_eq!(result.islands_found, 2);
        assert_eq!(result.islands_changed, 1);
        assert!(result.faults.is_empty());
    }

    #[test]
    fn test_deeply_nested_island_is_a_fault_not_a_crash() {
        let depth = 10_000;
        let host = format!(
            "<%= render \"a\", x: {}1{} %><%= render \"b\" %>",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let result = rewrite_document(&host);
        assert_eq!(result.islands_found, 2);
        assert_eq!(result.islands_changed, 1);
        assert_eq!(result.faults.len(), 1);
        assert_eq!(result.faults[0].island, 1);
        assert!(result.text.ends_with("<%= render({ partial: \"b\" }) %>"));
    }

    #[test]
    fn test_fault_serializes_as_message() {
        let result = rewrite_document("<% render(\"a\" %>");
        let json = serde_json::to_value(&result.faults[0]).unwrap();
        assert_eq!(json["line"], 1);
        assert!(json["error"].as_str().unwrap().contains("unclosed `(`"));
    }
}
