use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Name of the project-level configuration file.
pub const CONFIG_FILENAME: &str = ".rerender.toml";

/// The legacy method whose calls are migrated.
pub const RESERVED_WORD: &str = "render";

/// Hash keys that mark a call as already using the explicit form.
pub const OVERRIDE_KEYS: [&str; 3] = ["partial", "template", "layout"];

/// Key under which the template path is emitted.
pub const PARTIAL_KEY: &str = "partial";

/// Key under which the remaining arguments are emitted.
pub const LOCALS_KEY: &str = "locals";

/// Template extension scanned when neither config nor CLI names one.
pub const DEFAULT_EXTENSION: &str = "erb";

/// Regex matching one ERB tag: open marker, code, close marker.
///
/// The code group is non-greedy, so a `%>` inside a string literal ends the tag early.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn get_island_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?s)<%(==|=|-|#|%)?(.*?)(-?%>)").expect("Invalid island regex pattern")
    })
}

/// Set of folders to exclude by default.
pub fn get_default_exclude_folders() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert(".git");
        s.insert(".bundle");
        s.insert("node_modules");
        s.insert("vendor");
        s.insert("tmp");
        s.insert("log");
        s.insert("coverage");
        s.insert("public");
        s
    })
}

pub use get_default_exclude_folders as DEFAULT_EXCLUDE_FOLDERS;
pub use get_island_re as ISLAND_RE;
