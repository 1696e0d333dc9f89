//! Vibeforge command line
//!
//! Generate single-file web apps from a prompt, host them, and keep every
//! deployed version.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forge_client::SortBy;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

#[derive(Parser, Debug)]
#[clap(name = "vibeforge", version, about = "Generate, host and version web apps from a prompt")]
struct Cli {
    /// Enable debug logging
    #[clap(short, long, global = true)]
    verbose: bool,

    /// PostgreSQL connection string for the record store
    #[clap(long, env = "DATABASE_URL", global = true, value_parser)]
    database_url: Option<String>,

    /// Directory holding local records, files and hosting tables
    #[clap(long, env = "VIBEFORGE_DATA_DIR", global = true, default_value = ".vibeforge", value_parser)]
    data_dir: PathBuf,

    /// OpenAI-compatible chat completions endpoint
    #[clap(long, env = "VIBEFORGE_CHAT_URL", global = true, value_parser)]
    chat_url: Option<String>,

    #[clap(long, env = "VIBEFORGE_API_KEY", global = true, hide_env_values = true, value_parser)]
    api_key: Option<String>,

    /// Model used when a command does not name one
    #[clap(long, env = "VIBEFORGE_MODEL", global = true, value_parser)]
    model: Option<String>,

    /// Domain hosted sites are published under
    #[clap(long, env = "VIBEFORGE_HOSTING_DOMAIN", global = true, value_parser)]
    hosting_domain: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in to the platform
    Login,

    /// Generate and deploy a new app
    Deploy {
        /// What to build; asked for interactively when omitted
        #[clap(value_parser)]
        prompt: Option<String>,

        /// Start from a built-in template (see `templates`)
        #[clap(long, value_parser)]
        template: Option<String>,

        /// App name, also used for the subdomain
        #[clap(short, long, default_value = "", value_parser)]
        name: String,

        #[clap(short, long, default_value = "", value_parser)]
        title: String,

        #[clap(long = "tag", value_parser)]
        tags: Vec<String>,
    },

    /// Publish edited code as the next version of an app
    Redeploy {
        #[clap(long, value_parser)]
        id: Uuid,

        /// File holding the new document
        #[clap(short, long, value_parser)]
        file: PathBuf,

        /// Replace the app's tags (kept when omitted)
        #[clap(long = "tag", value_parser)]
        tags: Vec<String>,
    },

    /// List apps
    List {
        #[clap(short, long, default_value = "", value_parser)]
        search: String,

        /// date, name or views
        #[clap(long, default_value = "date", value_parser)]
        sort: SortBy,

        #[clap(long)]
        favorites: bool,

        /// Show apps carrying any of these tags
        #[clap(long = "tag", value_parser)]
        tags: Vec<String>,

        /// Print library statistics
        #[clap(long)]
        stats: bool,
    },

    /// Show the version history of an app
    Versions {
        #[clap(long, value_parser)]
        id: Uuid,
    },

    /// Write an earlier version's code out for editing and redeploy
    Restore {
        #[clap(long, value_parser)]
        id: Uuid,

        #[clap(long, value_parser)]
        version: u32,

        /// Defaults to stdout
        #[clap(short, long, value_parser)]
        out: Option<PathBuf>,
    },

    /// Delete apps with their hosting, registry entry and history
    Delete {
        #[clap(long = "id", required = true, value_parser)]
        ids: Vec<Uuid>,

        /// Skip the confirmation prompt
        #[clap(short, long)]
        yes: bool,
    },

    /// Toggle the favorite flag
    Favorite {
        #[clap(long, value_parser)]
        id: Uuid,
    },

    /// Open an app
    Launch {
        #[clap(long, value_parser)]
        id: Uuid,
    },

    /// Export one app, or all of them, as JSON
    Export {
        #[clap(long, value_parser)]
        id: Option<Uuid>,

        /// Defaults to a generated file name in the current directory
        #[clap(short, long, value_parser)]
        out: Option<PathBuf>,
    },

    /// Import apps from an export file
    Import {
        #[clap(short, long, value_parser)]
        file: PathBuf,
    },

    /// Print a share link for an app
    Share {
        #[clap(long, value_parser)]
        id: Uuid,

        #[clap(long, default_value = "https://vibeforge.app", value_parser)]
        origin: String,
    },

    /// List built-in prompt templates
    Templates {
        #[clap(long, default_value = "All", value_parser)]
        category: String,
    },

    /// List models offered by the chat endpoint
    Models {
        /// Only show one provider (OpenAI, Anthropic, Google, ...)
        #[clap(long, value_parser)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    commands::run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_delete_accepts_several_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (a_arg, b_arg) = (a.to_string(), b.to_string());
        let cli = Cli::parse_from([
            "vibeforge",
            "delete",
            "--id",
            a_arg.as_str(),
            "--id",
            b_arg.as_str(),
            "--yes",
        ]);
        match cli.command {
            Commands::Delete { ids, yes } => {
                assert_eq!(ids, vec![a, b]);
                assert!(yes);
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_list_sort_order_is_parsed() {
        let cli = Cli::parse_from(["vibeforge", "list", "--sort", "views", "--tag", "work"]);
        match cli.command {
            Commands::List { sort, tags, .. } => {
                assert_eq!(sort, SortBy::Views);
                assert_eq!(tags, vec!["work"]);
            }
            other => panic!("parsed as {:?}", other),
        }
    }
}
