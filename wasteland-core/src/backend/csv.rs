//! CSV shape shared by both backends (§4.1): header row, then data rows,
//! quoted fields with doubled `""` for embedded quotes. The remote backend
//! converts its native JSON rows into this same shape so callers never see
//! the transport difference (§9).

pub fn encode_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn encode_row(fields: &[String]) -> String {
    fields.iter().map(|f| encode_field(f)).collect::<Vec<_>>().join(",")
}

pub fn encode(header: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&encode_row(header));
    for row in rows {
        out.push('\n');
        out.push_str(&encode_row(row));
    }
    out
}

/// Parses one CSV line into fields, honoring quoted fields with doubled `""`.
fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == ',' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

/// Parses a full CSV blob into `(header, rows)`. Returns an empty header and
/// no rows for empty input.
pub fn parse(csv: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut lines = csv.lines();
    let header = match lines.next() {
        Some(line) => parse_line(line),
        None => return (Vec::new(), Vec::new()),
    };
    let rows = lines.map(parse_line).collect();
    (header, rows)
}

/// Parses rows into maps keyed by header column name, for callers that want
/// to look up columns by name rather than position.
pub fn parse_rows_as_maps(csv: &str) -> Vec<std::collections::HashMap<String, String>> {
    let (header, rows) = parse(csv);
    rows.into_iter()
        .map(|row| {
            header
                .iter()
                .cloned()
                .zip(row.into_iter())
                .collect::<std::collections::HashMap<_, _>>()
        })
        .collect()
}
