//! Comment tag extraction
//!
//! Tags are comment lines of the form `<marker><key>=<value>`. Keys may
//! repeat; values are collected in source order.

use indexmap::IndexMap;

/// Collect `key=value` tags from comment lines that start with `marker`
///
/// A tagged line without `=` yields an empty value.
pub fn extract_comment_tags<S: AsRef<str>>(marker: &str, lines: &[S]) -> IndexMap<String, Vec<String>> {
    let mut out: IndexMap<String, Vec<String>> = IndexMap::new();

    for line in lines {
        let line = line.as_ref().trim_matches(' ');
        let Some(rest) = line.strip_prefix(marker) else {
            continue;
        };
        let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
        out.entry(key.to_string()).or_default().push(value.to_string());
    }

    out
}
