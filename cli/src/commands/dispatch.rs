use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use relay_dispatch::{
    InMemoryDirectory, MentionHandler, NotificationService, RelayCliFlags, RelayConfig,
    ServiceRouter,
};
use tracing::info;

use super::load_post;

/// Collects deliveries for printing. URLs starting with `broken://` fail, so
/// snapshots can exercise error reporting without a real transport.
#[derive(Default)]
struct DryRunRouter {
    deliveries: Mutex<Vec<String>>,
}

impl DryRunRouter {
    fn take(&self) -> Vec<String> {
        match self.deliveries.lock() {
            Ok(mut deliveries) => std::mem::take(&mut *deliveries),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ServiceRouter for DryRunRouter {
    async fn send(&self, message: &str, service_url: &str) -> Result<()> {
        if service_url.starts_with("broken://") {
            return Err(anyhow!("service unreachable"));
        }

        info!(service = %service_url, "dry-run delivery");
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(format!("-> {service_url}: {message}"));
        }
        Ok(())
    }
}

pub async fn run(
    post_path: &Path,
    directory_path: &Path,
    config_path: Option<&Path>,
    flags: &RelayCliFlags,
) -> Result<String> {
    let config = RelayConfig::load(config_path, flags)?;
    let post = load_post(post_path)?;
    let directory = Arc::new(InMemoryDirectory::load(directory_path)?);

    let router = Arc::new(DryRunRouter::default());
    let notifications =
        NotificationService::new(router.clone(), directory.clone(), &config.notifications);
    let handler = MentionHandler::new(directory, notifications, config);

    let report = handler.message_posted(&post).await?;

    let mut lines = vec![report.results.to_string()];
    lines.extend(router.take());
    for (user_id, error) in &report.failures {
        lines.push(format!("!! {user_id}: {error}"));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use relay_dispatch::RelayCliFlags;

    use super::run;
    use crate::commands::fixtures::{SNAPSHOT, post_json, write};

    #[tokio::test]
    async fn prints_deliveries_and_failures() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let post = write(dir.path(), "post.json", &post_json("@bob @carol review please"));
        let directory = write(dir.path(), "directory.json", SNAPSHOT);
        let config = dir.path().join("relay.toml");

        let output = match run(&post, &directory, Some(&config), &RelayCliFlags::default()).await
        {
            Ok(output) => output,
            Err(error) => panic!("dispatch failed: {error}"),
        };

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4, "got {output}");
        assert_eq!(
            lines[1],
            "-> ntfy://bob: You were mentioned by @alice in Town Square: @bob @carol review please"
        );
        assert!(lines[2].starts_with("-> slack://bob: "));
        assert_eq!(
            lines[3],
            "!! u3: failed to send notifications: broken://carol: service unreachable"
        );
    }

    #[tokio::test]
    async fn channel_mentions_can_be_switched_off() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let post = write(dir.path(), "post.json", &post_json("@channel deploy done"));
        let directory = write(dir.path(), "directory.json", SNAPSHOT);
        let config = dir.path().join("relay.toml");
        let flags = RelayCliFlags {
            allow_channel_mentions: Some(false),
            ..RelayCliFlags::default()
        };

        let output = match run(&post, &directory, Some(&config), &flags).await {
            Ok(output) => output,
            Err(error) => panic!("dispatch failed: {error}"),
        };

        assert!(output.starts_with("user_mentions=none"), "got {output}");
        assert_eq!(output.lines().count(), 1);
    }
}
