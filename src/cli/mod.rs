//! CLI module for Careflow
//!
//! Provides commands:
//! - `serve`: Run the HTTP server
//! - `agents`: List the agent directory
//! - `replay`: Feed a recorded transcript through the board

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod agents;
pub mod replay;

/// Careflow appointment board CLI
#[derive(Parser, Debug)]
#[command(name = "careflow")]
#[command(about = "Multi-agent chat with a live appointment board")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// List selectable agents
    Agents,
    /// Replay a recorded transcript (JSON) against the board
    Replay {
        /// Transcript file: `{"thread_id", "messages"}` or a message array
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Agents) => agents::run().await,
        Some(Commands::Replay { path, json }) => replay::run(&path, json).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from(["careflow", "replay", "session.json", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Replay { path, json }) => {
                assert_eq!(path, PathBuf::from("session.json"));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["careflow"]).unwrap();
        assert!(cli.command.is_none());
    }
}
