use std::{path::Path, sync::Arc};

use anyhow::{Result, anyhow};
use relay_dispatch::{
    InMemoryDirectory, LogRouter, MentionHandler, NotificationService, RelayCliFlags, RelayConfig,
};
use relay_mentions::{KeywordIndex, MentionResults, detect_mentions};
use tracing::debug;

use super::load_post;

pub async fn run(
    post_path: &Path,
    directory_path: Option<&Path>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<String> {
    let post = load_post(post_path)?;

    let results = match directory_path {
        Some(path) => {
            let config = RelayConfig::load(config_path, &RelayCliFlags::default())?;
            let directory = Arc::new(InMemoryDirectory::load(path)?);
            let notifications =
                NotificationService::new(Arc::new(LogRouter), directory.clone(), &config.notifications);
            MentionHandler::new(directory, notifications, config)
                .mentions_for(&post)
                .await?
        }
        None => {
            debug!(post_id = %post.id, "no directory given, scanning with an empty keyword index");
            detect_mentions(&post, &KeywordIndex::default())
        }
    };

    render(&results, json)
}

fn render(results: &MentionResults, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(results)
            .map_err(|e| anyhow!("failed to serialize results: {}", e))
    } else {
        Ok(results.to_string())
    }
}

#[cfg(test)]
mod tests {
    use relay_mentions::{MentionResults, MentionType};

    use super::run;
    use crate::commands::fixtures::{SNAPSHOT, post_json, write};

    #[tokio::test]
    async fn scan_with_directory_resolves_users() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let post = write(dir.path(), "post.json", &post_json("thanks @bob and Carol!"));
        let directory = write(dir.path(), "directory.json", SNAPSHOT);
        let config = dir.path().join("relay.toml");

        let output = match run(&post, Some(&directory), false, Some(&config)).await {
            Ok(output) => output,
            Err(error) => panic!("scan failed: {error}"),
        };

        assert!(
            output.starts_with("user_mentions=[u2:keyword, u3:keyword]"),
            "got {output}"
        );
    }

    #[tokio::test]
    async fn scan_without_directory_reports_potential_mentions() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let post = write(dir.path(), "post.json", &post_json("@here ping @dave."));

        let output = match run(&post, None, true, None).await {
            Ok(output) => output,
            Err(error) => panic!("scan failed: {error}"),
        };

        let results: MentionResults = match serde_json::from_str(&output) {
            Ok(results) => results,
            Err(error) => panic!("output is not json: {error}"),
        };
        assert!(results.here_mentioned);
        assert!(results.mentions.is_empty());
        assert_eq!(results.other_potential_mentions, vec!["dave"]);
        assert_eq!(results.mention_type("u1"), None::<MentionType>);
    }

    #[tokio::test]
    async fn malformed_post_is_rejected() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let post = write(dir.path(), "post.json", "{\"message\": 1}");

        assert!(run(&post, None, false, None).await.is_err());
    }
}
