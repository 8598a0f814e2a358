//! In-memory stand-in for the `dolt`-backed store, built to understand
//! exactly the SQL shapes `wasteland-core` generates — not a general SQL
//! engine. Each statement form below corresponds 1:1 to a `format!` site in
//! `client.rs`/`board/query.rs`/`board/leaderboard.rs`/`overlay.rs`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use wasteland_core::backend::csv;
use wasteland_core::backend::Csv;
use wasteland_core::backend::DB;
use wasteland_core::WastelandError;

pub type Row = HashMap<String, String>;

const WANTED_COLUMNS: &[&str] = &[
    "id", "title", "description", "project", "type", "priority", "tags", "posted_by", "claimed_by", "status", "effort_level", "sandbox_required", "created_at", "updated_at",
];
const COMPLETION_COLUMNS: &[&str] = &["id", "wanted_id", "completed_by", "evidence", "hop_uri", "validated_by", "stamp_id", "completed_at", "validated_at"];
const STAMP_COLUMNS: &[&str] = &["id", "author", "subject", "valence", "severity", "context_id", "context_type", "skill_tags", "message", "hop_uri", "created_at"];

#[derive(Clone, Default)]
struct BranchData {
    wanted: Vec<Row>,
    completions: Vec<Row>,
    stamps: Vec<Row>,
}

pub struct FakeDb {
    branches: Mutex<HashMap<String, BranchData>>,
    wild_west: bool,
}

impl FakeDb {
    pub fn new() -> Self {
        FakeDb {
            branches: Mutex::new(HashMap::from([(String::new(), BranchData::default())])),
            wild_west: true,
        }
    }

    /// Seeds one row directly onto main, bypassing SQL parsing, the way a
    /// test fixture populates starting state.
    pub fn seed_wanted(&self, fields: &[(&str, &str)]) {
        let mut row = Row::new();
        for (k, v) in fields {
            row.insert(k.to_string(), v.to_string());
        }
        let mut guard = self.branches.lock().unwrap();
        guard.get_mut("").unwrap().wanted.push(row);
    }

    pub fn seed_completion(&self, fields: &[(&str, &str)]) {
        let mut row = Row::new();
        for (k, v) in fields {
            row.insert(k.to_string(), v.to_string());
        }
        let mut guard = self.branches.lock().unwrap();
        guard.get_mut("").unwrap().completions.push(row);
    }

    pub fn seed_stamp(&self, fields: &[(&str, &str)]) {
        let mut row = Row::new();
        for (k, v) in fields {
            row.insert(k.to_string(), v.to_string());
        }
        let mut guard = self.branches.lock().unwrap();
        guard.get_mut("").unwrap().stamps.push(row);
    }
}

fn norm(branch: &str) -> String {
    if branch.is_empty() || branch == "main" {
        String::new()
    } else {
        branch.to_string()
    }
}

fn encode(columns: &[&str], rows: &[&Row]) -> String {
    let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| columns.iter().map(|c| r.get(*c).cloned().unwrap_or_default()).collect())
        .collect();
    csv::encode(&header, &body)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Strips a single-quoted SQL literal and reverses `escape_sql`'s doubling
/// of `'` and `\`.
fn parse_quoted(s: &str) -> String {
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if (ch == '\'' || ch == '\\') && chars.peek() == Some(&ch) {
            chars.next();
        }
        out.push(ch);
    }
    out
}

fn parse_value(token: &str) -> String {
    let token = token.trim();
    if token.starts_with('\'') && token.ends_with('\'') && token.len() >= 2 {
        parse_quoted(token)
    } else if token == "NOW()" {
        now()
    } else if token == "NULL" {
        String::new()
    } else {
        token.to_string()
    }
}

/// Splits `s` on top-level commas, respecting single-quoted strings.
fn split_values(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            current.push(ch);
            if ch == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push(chars.next().unwrap());
                } else {
                    in_quotes = false;
                }
            }
        } else if ch == '\'' {
            in_quotes = true;
            current.push(ch);
        } else if ch == ',' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Splits `s` on a top-level separator, respecting quotes and one level of
/// parens (for the `(a OR b)` groups the browse filter produces).
fn split_top_level<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let bytes = s.as_bytes();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        if in_quotes {
            if ch == '\'' {
                in_quotes = false;
            }
        } else if ch == '\'' {
            in_quotes = true;
        } else if ch == '(' {
            depth += 1;
        } else if ch == ')' {
            depth -= 1;
        } else if depth == 0 && !in_quotes && s[i..].starts_with(sep) {
            parts.push(s[start..i].trim());
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(s[start..].trim());
    parts
}

fn eval_condition(row: &Row, cond: &str) -> bool {
    let cond = cond.trim();
    if cond.starts_with('(') && cond.ends_with(')') {
        let inner = &cond[1..cond.len() - 1];
        return split_top_level(inner, " OR ").iter().any(|c| eval_condition(row, c));
    }
    if let Some(idx) = cond.find(" LIKE ") {
        let col = cond[..idx].trim();
        let pat = parse_value(cond[idx + 6..].trim());
        let needle = pat.trim_matches('%');
        return row.get(col).map(|v| v.contains(needle)).unwrap_or(false);
    }
    if let Some(idx) = cond.find(" IN (") {
        let col = cond[..idx].trim();
        let list = cond[idx + 5..].trim_end_matches(')');
        let vals: Vec<String> = split_values(list).into_iter().map(|v| parse_value(&v)).collect();
        return row.get(col).map(|v| vals.contains(v)).unwrap_or(false);
    }
    if let Some(idx) = cond.find(" = ") {
        let col = cond[..idx].trim().trim_start_matches("c.").trim_start_matches("s.");
        let val = parse_value(cond[idx + 3..].trim());
        return row.get(col).map(|v| v == &val).unwrap_or(false);
    }
    true
}

fn eval_where(row: &Row, clause: &str) -> bool {
    split_top_level(clause, " AND ").iter().all(|c| eval_condition(row, c))
}

fn extract_where(sql: &str) -> Option<&str> {
    let start = sql.find(" WHERE ")? + 7;
    let rest = &sql[start..];
    let end = [" ORDER BY ", " GROUP BY ", " LIMIT "]
        .iter()
        .filter_map(|kw| rest.find(kw))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn extract_limit(sql: &str) -> Option<usize> {
    let idx = sql.rfind(" LIMIT ")? + 7;
    sql[idx..].trim().parse().ok()
}

fn extract_order_by(sql: &str) -> Option<&str> {
    let start = sql.find(" ORDER BY ")? + 10;
    let rest = &sql[start..];
    let end = rest.find(" LIMIT ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn sort_rows(rows: &mut [&Row], order_by: &str) {
    let keys: Vec<(String, bool)> = order_by
        .split(',')
        .map(|k| {
            let k = k.trim();
            if let Some(col) = k.strip_suffix(" DESC") {
                (col.trim().to_string(), true)
            } else if let Some(col) = k.strip_suffix(" ASC") {
                (col.trim().to_string(), false)
            } else {
                (k.to_string(), false)
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        for (col, desc) in &keys {
            let av = a.get(col).cloned().unwrap_or_default();
            let bv = b.get(col).cloned().unwrap_or_default();
            let ord = if let (Ok(an), Ok(bn)) = (av.parse::<i64>(), bv.parse::<i64>()) {
                an.cmp(&bn)
            } else {
                av.cmp(&bv)
            };
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn apply_insert_wanted(data: &mut BranchData, sql: &str) -> bool {
    let values_start = sql.find("VALUES (").unwrap() + 8;
    let values = &sql[values_start..sql.len() - 1];
    let tokens = split_values(values);
    let mut row = Row::new();
    for (col, tok) in WANTED_COLUMNS.iter().zip(tokens.iter()) {
        row.insert(col.to_string(), parse_value(tok));
    }
    data.wanted.push(row);
    true
}

fn apply_update_wanted(data: &mut BranchData, sql: &str) -> bool {
    let set_start = sql.find("SET ").unwrap() + 4;
    let where_idx = sql.find(" WHERE ").unwrap();
    let assignments = split_values(&sql[set_start..where_idx]);
    let where_clause = extract_where(sql).unwrap_or_default();
    let mut changed = false;
    for row in data.wanted.iter_mut() {
        if eval_where(row, where_clause) {
            for assignment in &assignments {
                if let Some(idx) = assignment.find(" = ") {
                    let col = assignment[..idx].trim();
                    let val = parse_value(assignment[idx + 3..].trim());
                    row.insert(col.to_string(), val);
                }
            }
            changed = true;
        }
    }
    changed
}

fn apply_insert_completion_guarded(data: &mut BranchData, sql: &str) -> bool {
    let select_idx = sql.find("SELECT ").unwrap() + 7;
    let where_not_exists_idx = sql.find(" WHERE NOT EXISTS").unwrap();
    let tokens = split_values(&sql[select_idx..where_not_exists_idx]);
    let mut row = Row::new();
    for (col, tok) in COMPLETION_COLUMNS.iter().take(tokens.len()).zip(tokens.iter()) {
        row.insert(col.to_string(), parse_value(tok));
    }
    let guard_start = sql.rfind("wanted_id = ").unwrap() + 12;
    let guard_end = sql[guard_start..].find(')').map(|i| guard_start + i).unwrap_or(sql.len());
    let guard_value = parse_value(sql[guard_start..guard_end].trim());
    if data.completions.iter().any(|r| r.get("wanted_id").map(String::as_str) == Some(guard_value.as_str())) {
        return false;
    }
    data.completions.push(row);
    true
}

fn apply_update_completions(data: &mut BranchData, sql: &str) -> bool {
    let set_start = sql.find("SET ").unwrap() + 4;
    let where_idx = sql.find(" WHERE ").unwrap();
    let assignments = split_values(&sql[set_start..where_idx]);
    let where_clause = extract_where(sql).unwrap_or_default();
    let mut changed = false;
    for row in data.completions.iter_mut() {
        if eval_where(row, where_clause) {
            for assignment in &assignments {
                if let Some(idx) = assignment.find(" = ") {
                    let col = assignment[..idx].trim();
                    let val = parse_value(assignment[idx + 3..].trim());
                    row.insert(col.to_string(), val);
                }
            }
            changed = true;
        }
    }
    changed
}

fn apply_delete_completions(data: &mut BranchData, sql: &str) -> bool {
    let where_clause = extract_where(sql).unwrap_or_default();
    let before = data.completions.len();
    data.completions.retain(|row| !eval_where(row, where_clause));
    data.completions.len() != before
}

fn apply_insert_stamp(data: &mut BranchData, sql: &str) -> bool {
    let values_start = sql.find("VALUES (").unwrap() + 8;
    let values = &sql[values_start..sql.len() - 1];
    let tokens = split_values(values);
    let mut row = Row::new();
    for (col, tok) in STAMP_COLUMNS.iter().take(tokens.len()).zip(tokens.iter()) {
        row.insert(col.to_string(), parse_value(tok));
    }
    data.stamps.push(row);
    true
}

fn apply_stmt(data: &mut BranchData, stmt: &str) -> bool {
    if stmt.starts_with("INSERT INTO wanted") {
        apply_insert_wanted(data, stmt)
    } else if stmt.starts_with("UPDATE wanted") {
        apply_update_wanted(data, stmt)
    } else if stmt.starts_with("INSERT INTO completions") {
        apply_insert_completion_guarded(data, stmt)
    } else if stmt.starts_with("UPDATE completions") {
        apply_update_completions(data, stmt)
    } else if stmt.starts_with("DELETE FROM completions") {
        apply_delete_completions(data, stmt)
    } else if stmt.starts_with("INSERT INTO stamps") {
        apply_insert_stamp(data, stmt)
    } else {
        panic!("fake db: unrecognized statement shape: {stmt}");
    }
}

#[async_trait]
impl DB for FakeDb {
    async fn query(&self, sql: &str, branch_ref: &str) -> Result<Csv, WastelandError> {
        let guard = self.branches.lock().unwrap();
        let key = norm(branch_ref);
        let Some(data) = guard.get(&key) else {
            return Ok(String::new());
        };

        if sql.contains("FROM completions c JOIN stamps s") && sql.contains("GROUP BY") {
            let mut groups: HashMap<String, (u64, f64, f64)> = HashMap::new();
            for completion in &data.completions {
                let Some(stamp_id) = completion.get("stamp_id").filter(|s| !s.is_empty()) else { continue };
                let Some(stamp) = data.stamps.iter().find(|s| s.get("id").map(String::as_str) == Some(stamp_id.as_str())) else { continue };
                let rig = completion.get("completed_by").cloned().unwrap_or_default();
                let valence: wasteland_core::model::Valence = serde_json::from_str(stamp.get("valence").map(String::as_str).unwrap_or("{}")).unwrap_or(wasteland_core::model::Valence { quality: 0, reliability: 0 });
                let entry = groups.entry(rig).or_insert((0, 0.0, 0.0));
                entry.0 += 1;
                entry.1 += valence.quality as f64;
                entry.2 += valence.reliability as f64;
            }
            let mut rows: Vec<Row> = groups
                .into_iter()
                .map(|(rig, (count, qsum, rsum))| {
                    let mut r = Row::new();
                    r.insert("rig".to_string(), rig);
                    r.insert("validated_completions".to_string(), count.to_string());
                    r.insert("avg_quality".to_string(), (qsum / count as f64).to_string());
                    r.insert("avg_reliability".to_string(), (rsum / count as f64).to_string());
                    r
                })
                .collect();
            rows.sort_by(|a, b| {
                let ac: u64 = a["validated_completions"].parse().unwrap();
                let bc: u64 = b["validated_completions"].parse().unwrap();
                bc.cmp(&ac)
                    .then_with(|| b["avg_quality"].partial_cmp(&a["avg_quality"]).unwrap())
                    .then_with(|| a["rig"].cmp(&b["rig"]))
            });
            if let Some(limit) = extract_limit(sql) {
                rows.truncate(limit);
            }
            let refs: Vec<&Row> = rows.iter().collect();
            return Ok(encode(&["rig", "validated_completions", "avg_quality", "avg_reliability"], &refs));
        }

        if sql.contains("FROM completions c JOIN stamps s") && sql.contains(" IN (") {
            let where_clause = extract_where(sql).unwrap_or_default();
            let rows: Vec<Row> = data
                .completions
                .iter()
                .filter(|c| eval_where(c, where_clause))
                .filter_map(|c| {
                    let stamp_id = c.get("stamp_id").filter(|s| !s.is_empty())?;
                    let stamp = data.stamps.iter().find(|s| s.get("id").map(String::as_str) == Some(stamp_id.as_str()))?;
                    let mut r = Row::new();
                    r.insert("rig".to_string(), c.get("completed_by").cloned().unwrap_or_default());
                    r.insert("skill_tags".to_string(), stamp.get("skill_tags").cloned().unwrap_or_default());
                    Some(r)
                })
                .collect();
            let refs: Vec<&Row> = rows.iter().collect();
            return Ok(encode(&["rig", "skill_tags"], &refs));
        }

        if sql.contains("FROM stamps s JOIN completions c") {
            let where_clause = extract_where(sql).unwrap_or_default();
            let rows: Vec<&Row> = data
                .completions
                .iter()
                .filter(|c| eval_where(c, where_clause))
                .filter_map(|c| {
                    let stamp_id = c.get("stamp_id").filter(|s| !s.is_empty())?;
                    data.stamps.iter().find(|s| s.get("id").map(String::as_str) == Some(stamp_id.as_str()))
                })
                .collect();
            return Ok(encode(STAMP_COLUMNS, &rows));
        }

        if sql.contains("FROM completions") {
            let where_clause = extract_where(sql).unwrap_or_default();
            let rows: Vec<&Row> = data.completions.iter().filter(|r| eval_where(r, where_clause)).collect();
            return Ok(encode(COMPLETION_COLUMNS, &rows));
        }

        if sql.contains("FROM wanted") {
            let mut rows: Vec<&Row> = match extract_where(sql) {
                Some(clause) => data.wanted.iter().filter(|r| eval_where(r, clause)).collect(),
                None => data.wanted.iter().collect(),
            };
            if let Some(order_by) = extract_order_by(sql) {
                sort_rows(&mut rows, order_by);
            }
            if let Some(limit) = extract_limit(sql) {
                rows.truncate(limit);
            }
            return Ok(encode(WANTED_COLUMNS, &rows));
        }

        panic!("fake db: unrecognized query shape: {sql}");
    }

    async fn exec(&self, branch: &str, _msg: &str, _signed: bool, stmts: &[String]) -> Result<(), WastelandError> {
        let mut guard = self.branches.lock().unwrap();
        let key = norm(branch);
        if !key.is_empty() && !guard.contains_key(&key) {
            let main = guard.get("").cloned().unwrap_or_default();
            guard.insert(key.clone(), main);
        }
        let data = guard.entry(key.clone()).or_default();
        let mut changed = false;
        for stmt in stmts {
            changed |= apply_stmt(data, stmt);
        }
        if !changed {
            return Err(WastelandError::nothing_to_commit(format!("nothing to commit on branch '{branch}'")));
        }
        Ok(())
    }

    async fn branches(&self, prefix: &str) -> Result<Vec<String>, WastelandError> {
        let guard = self.branches.lock().unwrap();
        let mut names: Vec<String> = guard.keys().filter(|k| !k.is_empty() && k.starts_with(prefix)).cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_branch(&self, name: &str) -> Result<(), WastelandError> {
        if name.is_empty() || name == "main" {
            return Ok(());
        }
        self.branches.lock().unwrap().remove(name);
        Ok(())
    }

    async fn push_branch(&self, _name: &str) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn push_main(&self) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn push_with_sync(&self) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn sync(&self) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn merge_branch(&self, name: &str) -> Result<(), WastelandError> {
        let mut guard = self.branches.lock().unwrap();
        let Some(branch_data) = guard.get(name).cloned() else {
            return Ok(());
        };
        let main = guard.entry(String::new()).or_default();
        for row in branch_data.wanted {
            let id = row.get("id").cloned().unwrap_or_default();
            main.wanted.retain(|r| r.get("id") != Some(&id));
            main.wanted.push(row);
        }
        for row in branch_data.completions {
            let id = row.get("id").cloned().unwrap_or_default();
            main.completions.retain(|r| r.get("id") != Some(&id));
            main.completions.push(row);
        }
        for row in branch_data.stamps {
            let id = row.get("id").cloned().unwrap_or_default();
            main.stamps.retain(|r| r.get("id") != Some(&id));
            main.stamps.push(row);
        }
        Ok(())
    }

    async fn delete_remote_branch(&self, _name: &str) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn diff(&self, name: &str) -> Result<String, WastelandError> {
        Ok(format!("diff main..{name}"))
    }

    fn can_wild_west(&self) -> Result<(), WastelandError> {
        if self.wild_west {
            Ok(())
        } else {
            Err(WastelandError::backend("wild west", "backend does not support direct commits"))
        }
    }
}
