//! Key/value property text parsing.
//!
//! Accepts the common subset of Java properties syntax: one entry per line,
//! separated by `=`, `:` or whitespace. Lines starting with `#` or `!` are
//! comments. A line with no separator defines its key with an empty value.

/// Parse property text into `(key, value)` pairs in file order.
///
/// Duplicate keys are returned as-is; later entries win once the pairs are
/// layered into a configuration.
///
/// # Examples
///
/// ```
/// use addon_packager_common::parse_properties;
///
/// let pairs = parse_properties("# comment\npluginNodeName=Share\nflags : -ObjC\n");
/// assert_eq!(
///     pairs,
///     vec![
///         ("pluginNodeName".to_owned(), "Share".to_owned()),
///         ("flags".to_owned(), "-ObjC".to_owned()),
///     ]
/// );
/// ```
#[must_use]
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }

    let separator = trimmed.find(|c: char| c == '=' || c == ':' || c.is_whitespace());
    let (key, value) = match separator {
        Some(index) => {
            let (key, rest) = trimmed.split_at(index);
            let rest = rest.trim_start();
            // Whitespace may precede an explicit `=` or `:` separator.
            let value = rest
                .strip_prefix('=')
                .or_else(|| rest.strip_prefix(':'))
                .unwrap_or(rest);
            (key, value.trim())
        }
        None => (trimmed, ""),
    };

    Some((key.to_owned(), value.to_owned()))
}
