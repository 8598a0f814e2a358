use std::sync::Arc;

use wasteland_core::backend::LocalBackend;
use wasteland_core::board::BrowseFilter;
use wasteland_core::client::{BrowseView, WastelandClient};
use wasteland_core::config::{Config, ConfigStore};
use wasteland_core::lifecycle::WorkflowMode;
use wasteland_core::model::{Severity, WantedStatus, WantedType};
use wasteland_core::WastelandError;

use crate::cli::args::{Cli, Commands};
use crate::provider::FileProvider;
use crate::status::with_status;
use crate::vcs::DoltVcs;

fn mode_of(config: &Config) -> WorkflowMode {
    match config.mode {
        wasteland_core::config::Mode::WildWest => WorkflowMode::WildWest,
        wasteland_core::config::Mode::Pr => WorkflowMode::Pr,
    }
}

fn build_client(config: &Config) -> WastelandClient {
    let db = Arc::new(LocalBackend::new(config.local_dir.clone()));
    let provider = Arc::new(FileProvider::new(config.upstream_url.clone()));
    WastelandClient::new(db, provider, mode_of(config), config.rig_handle.clone(), config.signing)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: failed to render output: {e}"),
    }
}

/// Runs the CLI; returns the process exit code (§6: 0 on success, non-zero
/// on any SDK error, 2 for unrecognized subcommands — clap itself already
/// enforces the latter).
pub async fn run(cli: Cli) -> i32 {
    let store = match ConfigStore::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    match dispatch(&store, cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

async fn dispatch(store: &ConfigStore, cli: Cli) -> Result<(), WastelandError> {
    if let Commands::Join {
        upstream,
        fork_org,
        rig_handle,
        display_name,
        email,
        version,
        anonymous,
        direct,
        signing,
        local_dir,
    } = &cli.command
    {
        let provider = FileProvider::new(upstream.clone());
        let vcs = DoltVcs::new();
        let req = wasteland_core::federation::JoinRequest {
            upstream: upstream.as_str(),
            fork_org: fork_org.as_str(),
            rig_handle: rig_handle.as_str(),
            display_name: display_name.as_str(),
            email: email.as_str(),
            version: version.as_str(),
            anonymous: *anonymous,
            direct: *direct,
            signing: *signing,
            local_dir: local_dir.as_str(),
        };
        let config = with_status("joining wasteland", || wasteland_core::federation::join(store, &provider, &vcs, req)).await?;
        print_json(&config);
        return Ok(());
    }

    if let Commands::Leave { upstream } = &cli.command {
        store.delete(upstream)?;
        println!("left {upstream}");
        return Ok(());
    }

    let config = wasteland_core::config::resolve(store, cli.wasteland.as_deref())?;
    let client = build_client(&config);

    match cli.command {
        Commands::Post {
            title,
            description,
            project,
            item_type,
            priority,
            tags,
            effort,
            sandbox,
        } => {
            let kind = WantedType::parse(&item_type).unwrap_or(WantedType::Feature);
            let item = with_status("posting item", || client.post(&title, &description, &project, kind, priority, &tags, &effort, sandbox)).await?;
            print_json(&item);
        }
        Commands::Claim { id } => {
            let result = with_status("claiming item", || client.claim(&id)).await?;
            print_json(&result.detail);
        }
        Commands::Unclaim { id } => {
            let result = with_status("releasing item", || client.unclaim(&id)).await?;
            print_json(&result.detail);
        }
        Commands::Done { id, evidence } => {
            let result = with_status("submitting evidence", || client.done(&id, &evidence)).await?;
            print_json(&result.detail);
        }
        Commands::Accept {
            id,
            quality,
            reliability,
            severity,
            skills,
            message,
        } => {
            let severity = Severity::parse(&severity).unwrap_or(Severity::Leaf);
            let result = with_status("accepting item", || client.accept(&id, quality, reliability, severity, &skills, message.as_deref())).await?;
            print_json(&result.detail);
        }
        Commands::Reject { id, reason } => {
            let result = with_status("rejecting item", || client.reject(&id, &reason)).await?;
            print_json(&result.detail);
        }
        Commands::Close { id } => {
            let result = with_status("closing item", || client.close(&id)).await?;
            print_json(&result.detail);
        }
        Commands::Delete { id } => {
            let result = with_status("deleting item", || client.delete(&id)).await?;
            print_json(&result.detail);
        }
        Commands::Update { id, title, description, priority } => {
            let result = with_status("updating item", || client.update(&id, title.as_deref(), description.as_deref(), priority)).await?;
            print_json(&result.detail);
        }
        Commands::Browse {
            status,
            project,
            item_type,
            search,
            mine,
            view,
        } => {
            let filter = BrowseFilter {
                status: status.as_deref().and_then(WantedStatus::parse),
                project,
                item_type: item_type.as_deref().and_then(WantedType::parse),
                search,
                my_items: if mine { Some(config.rig_handle.clone()) } else { None },
                ..Default::default()
            };
            let view = match view.as_str() {
                "all" => BrowseView::All,
                "upstream" => BrowseView::Upstream,
                _ => BrowseView::Mine,
            };
            let result = with_status("browsing board", || client.browse(filter, view)).await?;
            print_json(&result.items);
        }
        Commands::Show { id } => {
            let detail = with_status("loading detail", || client.detail(&id)).await?;
            print_json(&detail);
        }
        Commands::Me => {
            let dashboard = with_status("loading dashboard", || client.dashboard()).await?;
            print_json(&dashboard);
        }
        Commands::Settings { mode, signing } => {
            let mode = match mode.as_deref() {
                Some("wild-west") => WorkflowMode::WildWest,
                Some("pr") => WorkflowMode::Pr,
                _ => mode_of(&config),
            };
            let signing = signing.unwrap_or(config.signing);
            client.save_config(store, config.clone(), mode, signing).await?;
            println!("settings saved");
        }
        Commands::Apply { branch } => {
            with_status("applying branch", || client.apply_branch(&branch)).await?;
            println!("applied {branch}");
        }
        Commands::Discard { branch } => {
            with_status("discarding branch", || client.discard_branch(&branch)).await?;
            println!("discarded {branch}");
        }
        Commands::Submit { branch } => {
            let url = with_status("submitting pr", || client.submit_pr(&branch)).await?;
            println!("{url}");
        }
        Commands::Leaderboard { limit } => {
            let entries = with_status("loading leaderboard", || client.leaderboard(limit)).await?;
            print_json(&entries);
        }
        Commands::Join { .. } | Commands::Leave { .. } => unreachable!("handled above"),
    }

    Ok(())
}
