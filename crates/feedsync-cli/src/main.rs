mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use feedsync_core::backend::RestBackend;
use feedsync_core::channel::TracingChannel;
use feedsync_core::tracing_setup::init_tracing;
use feedsync_core::{AuthContext, FeedError, FeedSession};
use tracing::debug;

use commands::FeedCommand;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Command-line client for the social feed")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (feed settings, credentials)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Auth token, overrides the one in the config file
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the first page of the feed
    Feed,

    /// Load the next page of a user's posts
    More {
        user_id: String,
    },

    Like {
        post_id: String,
    },

    Unlike {
        post_id: String,
    },

    /// Comment on a post
    Comment {
        post_id: String,
        /// Comment text
        content: String,
    },

    DeletePost {
        post_id: String,
    },

    /// List notifications with the unread badge
    Notifications,

    /// Mark a notification read
    Read {
        notification_id: String,
    },

    /// Delete every notification
    ClearNotifications,
}

impl From<Commands> for FeedCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Feed => FeedCommand::Feed,
            Commands::More { user_id } => FeedCommand::More { user_id },
            Commands::Like { post_id } => FeedCommand::Like { post_id },
            Commands::Unlike { post_id } => FeedCommand::Unlike { post_id },
            Commands::Comment { post_id, content } => FeedCommand::Comment { post_id, content },
            Commands::DeletePost { post_id } => FeedCommand::DeletePost { post_id },
            Commands::Notifications => FeedCommand::Notifications,
            Commands::Read { notification_id } => FeedCommand::Read { notification_id },
            Commands::ClearNotifications => FeedCommand::ClearNotifications,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", error_text(&e));
        std::process::exit(1);
    }
}

/// Backend failures get their user-facing text; everything else (config,
/// argument problems) prints the full context chain.
fn error_text(error: &anyhow::Error) -> String {
    match error.downcast_ref::<FeedError>() {
        Some(feed_error) => {
            debug!(error = %feed_error, "command failed");
            feed_error.user_message()
        }
        None => format!("{:#}", error),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::resolve(cli.config.as_deref())?;
    let credentials = config
        .credentials
        .ok_or_else(|| anyhow!("No credentials configured in the config file"))?;

    let auth = AuthContext {
        token: cli.token.unwrap_or_else(|| credentials.token.clone()),
        profile: credentials.profile(),
    };
    let backend = Arc::new(RestBackend::new(config.feed.api_base.clone()));
    // No socket transport here: broadcasts are logged and dropped
    let session = FeedSession::new(config.feed, auth, backend, Arc::new(TracingChannel));

    let output = commands::execute(&session, cli.command.into()).await?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comment_command() {
        let args = ["feedsync", "--token", "t1", "comment", "P1", "nice post"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.token.as_deref(), Some("t1"));
        let command: FeedCommand = cli.command.into();
        assert_eq!(
            command,
            FeedCommand::Comment {
                post_id: "P1".into(),
                content: "nice post".into()
            }
        );
    }

    #[test]
    fn test_parse_kebab_case_subcommands() {
        let cli = Cli::try_parse_from(["feedsync", "clear-notifications"]).unwrap();
        assert_eq!(FeedCommand::from(cli.command), FeedCommand::ClearNotifications);
        let args = ["feedsync", "-c", "/tmp/x.json", "delete-post", "P2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.json")));
    }

    #[test]
    fn test_backend_errors_print_user_message() {
        let rejected = anyhow::Error::from(FeedError::rejected("Post does not exist."));
        assert_eq!(error_text(&rejected), "Post does not exist.");

        let offline = anyhow::Error::from(FeedError::Disconnected("refused".into()));
        assert_eq!(error_text(&offline), "Connection to the server was lost");

        let config = anyhow!("inner").context("Failed to read config file");
        assert_eq!(error_text(&config), "Failed to read config file: inner");
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["feedsync"]).is_err());
    }
}
