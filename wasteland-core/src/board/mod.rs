//! Board query layer (C5, §4.5) — filter-to-SQL translation, row parsing,
//! and leaderboard aggregation.

pub mod leaderboard;
pub mod parse;
pub mod query;

pub use leaderboard::{build_leaderboard_queries, build_skill_tags_query, top_n_by_frequency};
pub use parse::{parse_completion_row, parse_stamp_row, parse_wanted_row};
pub use query::{build_browse_query, build_dashboard_queries, build_wanted_detail_query, BrowseFilter, Sort};

pub const DEFAULT_BROWSE_LIMIT: u32 = 50;
pub const LEADERBOARD_DEFAULT_LIMIT: u32 = 20;
pub const LEADERBOARD_LIMIT_CEILING: u32 = 100;
