use clap::{Parser, Subcommand};

/// CLI for the federated wanted board.
#[derive(Parser, Debug)]
#[command(name = "wasteland", version, about, arg_required_else_help = true)]
pub struct Cli {
    /// Upstream wasteland to operate on (`org/db`); auto-selected when only
    /// one is joined.
    #[arg(short = 'w', long = "wasteland", global = true)]
    pub wasteland: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Post a new wanted item.
    Post {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        project: String,
        #[arg(short = 't', long = "type", default_value = "feature")]
        item_type: String,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "medium")]
        effort: String,
        #[arg(long)]
        sandbox: bool,
    },
    /// Claim an open item.
    Claim { id: String },
    /// Release a claimed item.
    Unclaim { id: String },
    /// Submit evidence that an item is done.
    Done { id: String, evidence: String },
    /// Accept a completed item's review.
    Accept {
        id: String,
        #[arg(long, default_value_t = 5)]
        quality: u8,
        #[arg(long, default_value_t = 5)]
        reliability: u8,
        #[arg(long, default_value = "leaf")]
        severity: String,
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// Reject a completed item's review, returning it to claimed.
    Reject { id: String, reason: String },
    /// Close an item in review as completed without a formal accept.
    Close { id: String },
    /// Soft-delete an open item.
    Delete { id: String },
    /// Edit an open item's fields.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
    },
    /// List wanted items matching a filter.
    Browse {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long = "type")]
        item_type: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value = "mine")]
        view: String,
    },
    /// Show full detail for one item.
    Show { id: String },
    /// Show the active rig's dashboard.
    Me,
    /// Update persisted settings for the active wasteland.
    Settings {
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        signing: Option<bool>,
    },
    /// Merge a mutation branch into main.
    Apply { branch: String },
    /// Discard a mutation branch.
    Discard { branch: String },
    /// Open (or find) a PR for a mutation branch.
    Submit { branch: String },
    /// Join a wasteland.
    Join {
        upstream: String,
        #[arg(long)]
        fork_org: String,
        #[arg(long)]
        rig_handle: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        version: String,
        #[arg(long)]
        anonymous: bool,
        #[arg(long)]
        direct: bool,
        #[arg(long)]
        signing: bool,
        #[arg(long)]
        local_dir: String,
    },
    /// Leave a joined wasteland (local config only).
    Leave { upstream: String },
    /// Show the cross-rig leaderboard.
    Leaderboard {
        #[arg(long)]
        limit: Option<u32>,
    },
}
