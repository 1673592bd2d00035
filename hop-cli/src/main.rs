//! Hop CLI - shell-facing surface for frecency-ranked directory jumps
//!
//! The shell adapter calls `hop visit` from its directory-change hook
//! (backgrounded, fire-and-forget) and `hop query` from the jump alias and
//! completion wiring. Everything here is glue; the ranking and persistence
//! logic lives in hop-core.

use clap::{Parser, Subcommand};
use hop_core::{reduce, run_query, Config, RankMode, Session};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "hop")]
#[command(about = "Jump to frecency-ranked directories", long_about = None)]
struct Cli {
    /// Override the data file location
    #[arg(long, global = true, env = "HOP_DATA")]
    data: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a visit to a directory (called by the shell hook)
    Visit {
        /// Directory that was entered
        path: PathBuf,
    },

    /// Remove the current directory from the history
    Remove,

    /// Resolve a query against the history
    Query {
        /// Whitespace-separated tokens, matched in order anywhere in a path
        tokens: Vec<String>,

        /// Ranking mode
        #[arg(short, long, value_parser = ["rank", "time", "frecency"], default_value = "frecency")]
        mode: String,

        /// Only match inside the current directory's subtree
        #[arg(short = 'c', long)]
        subtree: bool,

        /// List every match with its score
        #[arg(short, long)]
        list: bool,

        /// Print matching paths in descending score order, for completion
        #[arg(long)]
        complete: bool,

        /// Always print the literal best match, never the common root
        #[arg(short = 'e', long)]
        best_only: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = match load_config(cli.data) {
        Ok(config) => match cli.command {
            Commands::Visit { path } => cmd_visit(&config, path),
            Commands::Remove => cmd_remove(&config, json),
            Commands::Query {
                tokens,
                mode,
                subtree,
                list,
                complete,
                best_only,
            } => cmd_query(&config, tokens, &mode, subtree, list, complete, best_only, json),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if json {
                eprintln!(
                    "{}",
                    serde_json::json!({ "error": e.to_string() })
                );
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(1);
        }
    }
}

fn load_config(data_override: Option<PathBuf>) -> hop_core::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(data) = data_override {
        config.data_path = data;
    }
    Ok(config)
}

fn cmd_visit(config: &Config, path: PathBuf) -> hop_core::Result<bool> {
    let mut session = Session::load(config);
    hop_core::record_visit(config, &mut session, &path, now())?;
    Ok(true)
}

fn cmd_remove(config: &Config, json: bool) -> hop_core::Result<bool> {
    use colored::Colorize;

    let cwd = std::env::current_dir()?;
    let mut session = Session::load(config);
    hop_core::remove_path(config, &mut session, &cwd)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "removed": cwd.to_string_lossy() })
        );
    } else {
        println!("{} {}", "Removed".green(), cwd.display());
    }
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
fn cmd_query(
    config: &Config,
    tokens: Vec<String>,
    mode: &str,
    subtree: bool,
    list: bool,
    complete: bool,
    best_only: bool,
    json: bool,
) -> hop_core::Result<bool> {
    let mode = RankMode::from_str(mode).unwrap_or_default();
    let query = tokens.join(" ");
    let cwd = if subtree {
        Some(std::env::current_dir()?)
    } else {
        None
    };

    let outcome = run_query(config, &query, mode, cwd.as_deref(), now())?;
    let Some(outcome) = outcome else {
        // Distinct no-match outcome: empty output, exit status 1, so the
        // shell adapter can fall back to treating the query literally.
        if json {
            println!("null");
        }
        return Ok(false);
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).map_err(|e| {
                hop_core::HopError::Io(std::io::Error::other(e))
            })?
        );
    } else if complete {
        for path in reduce::completion_paths(&outcome) {
            println!("{}", path);
        }
    } else if list {
        for line in reduce::list_lines(&outcome) {
            println!("{}", line);
        }
    } else {
        println!("{}", reduce::single(&outcome, best_only));
    }
    Ok(true)
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
