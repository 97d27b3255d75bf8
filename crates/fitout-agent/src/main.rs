//! fitout-agent CLI: HTTP gateway or local repl.
//!
//! Configuration comes from `FITOUT_*` environment variables (tool server
//! URLs, inference endpoint, timeouts).
//!
//! Logging: set `RUST_LOG=fitout_agent=debug` (or `info`, `warn`) to see
//! agent logs on stderr.

mod cli;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use fitout_agent::{Agent, AgentConfig, run_http};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fitout_agent=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = AgentConfig::from_env();
    let agent = Agent::from_config(config)?;

    match cli.command {
        Command::Gateway {
            bind,
            max_concurrent,
        } => run_http(agent, &bind, max_concurrent).await,
        Command::Repl { query, session_id } => run_repl(agent, query, &session_id).await,
    }
}

/// One-shot or interactive message loop on stdin/stdout.
async fn run_repl(agent: Agent, query: Option<String>, session_id: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    if let Some(message) = query {
        let outcome = agent.handle(session_id, "repl", &message).await;
        stdout.write_all(outcome.text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        return Ok(());
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    stdout.write_all("입력하세요 (/clear 초기화, /exit 종료)\n".as_bytes()).await?;
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/exit" {
            break;
        }
        if message == "/clear" {
            agent.clear_session(session_id).await;
            stdout.write_all("대화를 초기화했어요.\n".as_bytes()).await?;
            continue;
        }
        let outcome = agent.handle(session_id, "repl", message).await;
        stdout.write_all(outcome.text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}
