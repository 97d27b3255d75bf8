//! Command-line interface.

use clap::{Parser, Subcommand};

/// fitout-agent: Korean chat assistant for interior fit-out field work.
#[derive(Debug, Parser)]
#[command(name = "fitout-agent", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway (POST /chat, GET /health).
    Gateway {
        /// Bind address.
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Limit concurrent message handles (absent = unlimited).
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Send one message (or run an interactive loop) against a local session.
    Repl {
        /// One-shot message; omit for the interactive loop.
        #[arg(long)]
        query: Option<String>,
        /// Session id for the conversation.
        #[arg(long, default_value = "repl")]
        session_id: String,
    },
}
