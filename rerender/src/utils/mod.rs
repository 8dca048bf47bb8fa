//! Utilities shared by the document pass and the batch driver.

mod paths;

pub use paths::{
    collect_template_files, has_template_extension, is_excluded, normalize_display_path,
};

/// Converts byte offsets in a template to 1-indexed line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the text for newlines.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        // '\n' is always a single byte in UTF-8
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-indexed line number.
    #[must_use]
    pub fn line_number(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Number of lines in the indexed text.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Normalizes user-supplied extensions: strips leading dots, lowercases,
/// drops empty entries and duplicates while keeping the first occurrence.
#[must_use]
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(extensions.len());
    for ext in extensions {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_number_boundaries() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_number(0), 1);
        assert_eq!(index.line_number(2), 1);
        assert_eq!(index.line_number(3), 2);
        assert_eq!(index.line_number(6), 3);
        assert_eq!(index.line_number(7), 4);
        assert_eq!(index.line_number(100), 4);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_line_number_multibyte() {
        let text = "é\n<%= x %>";
        let index = LineIndex::new(text);
        assert_eq!(index.line_number(text.find('<').unwrap()), 2);
    }

    #[test]
    fn test_normalize_extensions() {
        assert_eq!(
            normalize_extensions(&[".erb", "ERB", "", " rhtml "]),
            vec!["erb".to_owned(), "rhtml".to_owned()]
        );
    }
}
