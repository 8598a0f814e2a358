//! Row -> entity parsing for board query results. Rows arrive as
//! `HashMap<String, String>` from `backend::csv::parse_rows_as_maps`;
//! malformed tags yield an empty list rather than failing the row (§4.5).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::backend::sql::parse_tags;
use crate::error::WastelandError;
use crate::model::{CompletionRecord, Stamp, Valence, WantedItem, WantedStatus, WantedType};

fn get<'a>(row: &'a HashMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn parse_wanted_row(row: &HashMap<String, String>) -> Result<WantedItem, WastelandError> {
    let status = WantedStatus::parse(get(row, "status"))
        .ok_or_else(|| WastelandError::backend("parse wanted row", "unknown status"))?;
    let kind = WantedType::parse(get(row, "type")).unwrap_or(WantedType::Feature);

    Ok(WantedItem {
        id: get(row, "id").to_string(),
        title: get(row, "title").to_string(),
        description: get(row, "description").to_string(),
        project: get(row, "project").to_string(),
        kind,
        priority: get(row, "priority").parse().unwrap_or(0),
        tags: parse_tags(get(row, "tags")),
        posted_by: get(row, "posted_by").to_string(),
        claimed_by: get(row, "claimed_by").to_string(),
        status,
        effort_level: {
            let v = get(row, "effort_level");
            if v.is_empty() { "medium".to_string() } else { v.to_string() }
        },
        sandbox_required: matches!(get(row, "sandbox_required"), "1" | "true" | "TRUE"),
        created_at: parse_timestamp(get(row, "created_at")),
        updated_at: parse_timestamp(get(row, "updated_at")),
    })
}

pub fn parse_completion_row(row: &HashMap<String, String>) -> CompletionRecord {
    let none_if_empty = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
    CompletionRecord {
        id: get(row, "id").to_string(),
        wanted_id: get(row, "wanted_id").to_string(),
        completed_by: get(row, "completed_by").to_string(),
        evidence: get(row, "evidence").to_string(),
        hop_uri: none_if_empty(get(row, "hop_uri")),
        validated_by: none_if_empty(get(row, "validated_by")),
        stamp_id: none_if_empty(get(row, "stamp_id")),
        completed_at: parse_timestamp(get(row, "completed_at")),
        validated_at: none_if_empty(get(row, "validated_at")).map(|s| parse_timestamp(&s)),
    }
}

pub fn parse_stamp_row(row: &HashMap<String, String>) -> Option<Stamp> {
    let id = get(row, "id");
    if id.is_empty() {
        return None;
    }
    let valence: Valence = serde_json::from_str(get(row, "valence")).unwrap_or(Valence {
        quality: 0,
        reliability: 0,
    });
    let none_if_empty = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
    Some(Stamp {
        id: id.to_string(),
        author: get(row, "author").to_string(),
        subject: get(row, "subject").to_string(),
        valence,
        severity: crate::model::Severity::parse(get(row, "severity")).unwrap_or(crate::model::Severity::Leaf),
        context_id: get(row, "context_id").to_string(),
        context_type: get(row, "context_type").to_string(),
        skill_tags: parse_tags(get(row, "skill_tags")),
        message: none_if_empty(get(row, "message")),
        hop_uri: none_if_empty(get(row, "hop_uri")),
        created_at: parse_timestamp(get(row, "created_at")),
    })
}
