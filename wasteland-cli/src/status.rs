//! Status-line rendering for long-running SDK calls: a spinner on stderr
//! driven by an mpsc channel, so the CLI can report "working" without the
//! library ever printing anything itself.

use std::io::stderr;

use crossterm::{
    cursor::MoveToColumn,
    execute,
    terminal::{Clear, ClearType},
};
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::time::Duration;

pub enum Status {
    Working(String),
    Done,
    Error(String),
}

async fn display_status(mut rx: Receiver<Status>) {
    let spinner = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let mut i = 0usize;
    let mut last_message = String::new();

    loop {
        tokio::select! {
            Some(status) = rx.recv() => match status {
                Status::Working(msg) => {
                    last_message = msg;
                    let _ = execute!(stderr(), MoveToColumn(0), Clear(ClearType::CurrentLine));
                    eprint!("{} {}", spinner[i % spinner.len()], last_message);
                    i = i.wrapping_add(1);
                }
                Status::Done => {
                    let _ = execute!(stderr(), MoveToColumn(0), Clear(ClearType::CurrentLine));
                    break;
                }
                Status::Error(e) => {
                    let _ = execute!(stderr(), MoveToColumn(0), Clear(ClearType::CurrentLine));
                    eprintln!("error: {e}");
                    break;
                }
            },
            _ = tokio::time::sleep(Duration::from_millis(80)) => {
                let _ = execute!(stderr(), MoveToColumn(0), Clear(ClearType::CurrentLine));
                eprint!("{} {}", spinner[i % spinner.len()], last_message);
                i = i.wrapping_add(1);
            }
        }
    }
}

/// Runs `f`, rendering a spinner with `message` until it resolves.
pub async fn with_status<F, Fut, T>(message: &str, f: F) -> Result<T, wasteland_core::WastelandError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, wasteland_core::WastelandError>>,
{
    let (tx, rx) = channel(10);
    let handle = tokio::spawn(display_status(rx));
    let _ = tx.send(Status::Working(message.to_string())).await;

    let result = f().await;

    match &result {
        Ok(_) => {
            let _ = tx.send(Status::Done).await;
        }
        Err(e) => {
            let _ = tx.send(Status::Error(e.to_string())).await;
        }
    }
    drop(tx);
    let _ = handle.await;
    result
}
