//! Leaderboard aggregation (§4.5). The heavy lifting (grouping, averaging)
//! happens in SQL; a single follow-up `IN (…)` query fetches skill tags for
//! every ranked rig (never N+1, §9), and the top-5-by-frequency tie-break is
//! plain Rust so it's deterministic and unit-testable without a backend.

use crate::backend::sql::sql_literal;
use crate::board::{LEADERBOARD_DEFAULT_LIMIT, LEADERBOARD_LIMIT_CEILING};

/// `(main_query, skills_query_builder)`. Call the builder with the list of
/// ranked rig handles once the main query's rows are known.
pub fn build_leaderboard_queries(limit: Option<u32>) -> String {
    let limit = limit.unwrap_or(LEADERBOARD_DEFAULT_LIMIT).min(LEADERBOARD_LIMIT_CEILING);
    format!(
        "SELECT c.completed_by AS rig, COUNT(*) AS validated_completions, \
         AVG(JSON_EXTRACT(s.valence, '$.quality')) AS avg_quality, \
         AVG(JSON_EXTRACT(s.valence, '$.reliability')) AS avg_reliability \
         FROM completions c JOIN stamps s ON s.id = c.stamp_id \
         GROUP BY c.completed_by \
         ORDER BY validated_completions DESC, avg_quality DESC, rig ASC \
         LIMIT {limit}"
    )
}

pub fn build_skill_tags_query(rigs: &[String]) -> Option<String> {
    if rigs.is_empty() {
        return None;
    }
    let list = rigs.iter().map(|r| sql_literal(r)).collect::<Vec<_>>().join(", ");
    Some(format!(
        "SELECT c.completed_by AS rig, s.skill_tags AS skill_tags \
         FROM completions c JOIN stamps s ON s.id = c.stamp_id \
         WHERE c.completed_by IN ({list})"
    ))
}

/// Top-`n` items by descending frequency, ties broken alphabetically —
/// deterministic regardless of input order (§8).
pub fn top_n_by_frequency(items: &[String], n: usize) -> Vec<String> {
    use std::collections::HashMap;
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(s, _)| s.to_string()).collect()
}
