//! SQL escaping helpers shared by both backends (§4.1, §8).

/// Doubles every `'` and every `\` so `s` is safe inside a single-quoted SQL
/// string literal.
pub fn escape_sql(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '\'' || ch == '\\' {
            out.push(ch);
        }
        out.push(ch);
    }
    out
}

/// Wraps `s` in single quotes after escaping it.
pub fn sql_literal(s: &str) -> String {
    format!("'{}'", escape_sql(s))
}

/// Wraps an already-escaped `s` in single quotes, doubling only the `'`s it
/// contains. Unlike `sql_literal`, this does not re-escape `\`, so it's safe
/// to use on a string (like JSON) whose own backslash-escaping must survive
/// the SQL layer untouched.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Serializes `tags` as a JSON array literal suitable for a JSON column:
/// embedded `"` become `\"`, embedded `\` become `\\`, then the whole array
/// is wrapped in a single-quoted SQL literal with embedded `'` doubled.
pub fn format_tags(tags: &[String]) -> String {
    let items: Vec<String> = tags
        .iter()
        .map(|t| format!("\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    let json = format!("[{}]", items.join(","));
    quote_literal(&json)
}

/// Parses a JSON array column value back into tags. Malformed input yields
/// an empty list rather than an error (§4.5).
pub fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}
