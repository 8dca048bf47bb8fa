//! Segmentation of a template into embedded code islands.
//!
//! Islands are found with a non-greedy regex, so a `%>` written inside a Ruby
//! string literal ends the island early. That island then usually fails to
//! parse and is left untouched.

use std::ops::Range;

use crate::constants::{ISLAND_RE, RESERVED_WORD};

/// How an island's value is used by the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelimiterStyle {
    /// `<%= ... %>` and `<%== ... %>`: the value is written to the output.
    Expression,
    /// `<% ... %>` and `<%- ... %>`: the code only runs.
    Statement,
}

/// One delimited span of embedded code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeIsland<'a> {
    /// Output or statement tag
    pub style: DelimiterStyle,
    /// Opening marker as written, e.g. `<%=`
    pub open: &'a str,
    /// Code between the markers
    pub code: &'a str,
    /// Closing marker as written, e.g. `-%>`
    pub close: &'a str,
    /// Byte range of the whole tag in the document
    pub range: Range<usize>,
    /// Byte range of `code` in the document
    pub code_range: Range<usize>,
}

impl CodeIsland<'_> {
    /// Whether the code could contain a call worth parsing for.
    #[must_use]
    pub fn mentions_reserved_word(&self) -> bool {
        self.code.contains(RESERVED_WORD)
    }
}

/// Lazy left-to-right iterator over the islands of a document.
///
/// Comment tags (`<%# ... %>`) and literal `<%%` escapes are skipped.
#[derive(Debug)]
pub struct Islands<'a> {
    text: &'a str,
    pos: usize,
}

/// Iterate over the code islands of `text`.
#[must_use]
pub fn islands(text: &str) -> Islands<'_> {
    Islands { text, pos: 0 }
}

impl<'a> Iterator for Islands<'a> {
    type Item = CodeIsland<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = ISLAND_RE().captures_at(self.text, self.pos)?;
            let whole = caps.get(0)?;
            let marker = caps.get(1).map_or("", |m| m.as_str());
            match marker {
                "%" => {
                    // `<%%` is text; whatever follows is template again.
                    self.pos = whole.start() + 3;
                    continue;
                }
                "#" => {
                    self.pos = whole.end();
                    continue;
                }
                _ => {}
            }
            let code = caps.get(2)?;
            let close = caps.get(3)?;
            self.pos = whole.end();

            let style = if marker.starts_with('=') {
                DelimiterStyle::Expression
            } else {
                DelimiterStyle::Statement
            };
            return Some(CodeIsland {
                style,
                open: &self.text[whole.start()..code.start()],
                code: code.as_str(),
                close: close.as_str(),
                range: whole.range(),
                code_range: code.range(),
            });
        }
    }
}
