use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use relay_dispatch::RelayCliFlags;
use relay_mentions::Post;

pub mod config;
pub mod dispatch;
pub mod scan;

pub use config::ConfigCommands;

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Print the mentions found in a post
    Scan {
        /// Post as JSON
        #[arg(long)]
        post: PathBuf,
        /// Directory snapshot as JSON. Without one only broadcasts and
        /// unresolved @-words are reported
        #[arg(long)]
        directory: Option<PathBuf>,
        /// Print the results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the message-posted handler and print every delivery it makes
    Dispatch {
        /// Post as JSON
        #[arg(long)]
        post: PathBuf,
        /// Directory snapshot as JSON
        #[arg(long)]
        directory: PathBuf,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, PartialEq, Debug, Default)]
pub struct OverrideArgs {
    /// Channels with this many members or more ignore @channel, @all and @here
    #[arg(long)]
    pub max_notifications_per_channel: Option<usize>,
    /// Treat @channel, @all and @here as plain text
    #[arg(long, default_value_t = false)]
    pub no_channel_mentions: bool,
    /// Also notify the author when they mention themselves
    #[arg(long, default_value_t = false)]
    pub notify_author: bool,
}

impl From<&OverrideArgs> for RelayCliFlags {
    fn from(args: &OverrideArgs) -> Self {
        RelayCliFlags {
            max_notifications_per_channel: args.max_notifications_per_channel,
            allow_channel_mentions: args.no_channel_mentions.then_some(false),
            preview_limit: None,
            notify_author: args.notify_author.then_some(true),
        }
    }
}

impl Commands {
    pub async fn run(self, config_path: Option<&Path>) -> Result<String> {
        match self {
            Commands::Scan {
                post,
                directory,
                json,
            } => scan::run(&post, directory.as_deref(), json, config_path).await,
            Commands::Dispatch {
                post,
                directory,
                overrides,
            } => dispatch::run(&post, &directory, config_path, &(&overrides).into()).await,
            Commands::Config(command) => command.run(config_path),
        }
    }
}

pub(crate) fn load_post(path: &Path) -> Result<Post> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read post {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| anyhow!("invalid post {}: {}", path.display(), e))
}


#[cfg(test)]
mod tests {
    use relay_dispatch::RelayCliFlags;

    use super::{OverrideArgs, load_post};

    #[test]
    fn override_flags_only_set_what_was_passed() {
        let flags: RelayCliFlags = (&OverrideArgs::default()).into();
        assert_eq!(flags.allow_channel_mentions, None);
        assert_eq!(flags.notify_author, None);

        let flags: RelayCliFlags = (&OverrideArgs {
            max_notifications_per_channel: Some(10),
            no_channel_mentions: true,
            notify_author: true,
        })
            .into();
        assert_eq!(flags.max_notifications_per_channel, Some(10));
        assert_eq!(flags.allow_channel_mentions, Some(false));
        assert_eq!(flags.notify_author, Some(true));
    }

    #[test]
    fn missing_post_file_is_reported() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let result = load_post(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(e) if e.to_string().contains("failed to read post")));
    }
}
