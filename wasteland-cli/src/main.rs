mod cli;
mod provider;
mod status;
mod vcs;

use clap::Parser;
use cli::args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = cli::dispatch::run(cli).await;
    std::process::exit(code);
}
