use std::{collections::HashMap, sync::Arc};

use relay_mentions::{
    BroadcastPolicy, Channel, ChannelType, MemberState, MentionContext, MentionResults, Post,
    UserProfile, apply_context, build_keyword_index, detect_mentions, format_mentions,
};
use tracing::{error, info};

use crate::{
    config::RelayConfig,
    directory::Directory,
    error::DispatchError,
    service::{NotificationService, preview_message},
};

/// What happened to one posted message.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub results: MentionResults,
    /// Users a notification was attempted for, in id order.
    pub notified: Vec<String>,
    /// User id and error for every notification that did not go out.
    pub failures: Vec<(String, String)>,
}

pub struct MentionHandler {
    directory: Arc<dyn Directory>,
    notifications: NotificationService,
    config: RelayConfig,
}

impl MentionHandler {
    pub fn new(
        directory: Arc<dyn Directory>,
        notifications: NotificationService,
        config: RelayConfig,
    ) -> Self {
        Self {
            directory,
            notifications,
            config,
        }
    }

    /// Works out who `post` mentions, with channel and thread rules applied.
    pub async fn mentions_for(&self, post: &Post) -> Result<MentionResults, DispatchError> {
        let channel = self.directory.channel(&post.channel_id).await?;
        self.detect(post, &channel).await
    }

    async fn detect(
        &self,
        post: &Post,
        channel: &Channel,
    ) -> Result<MentionResults, DispatchError> {
        let profiles = self.directory.members(&post.channel_id).await?;

        // Direct messages always reach the other member, so the text is not scanned.
        let mut results = if channel.channel_type == ChannelType::Direct {
            MentionResults::new()
        } else {
            self.explicit_mentions(post, &profiles).await?
        };

        let thread = match post.root_id() {
            Some(root_id) => self.directory.thread(root_id).await?,
            None => None,
        };
        let profile_map: HashMap<String, UserProfile> = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        apply_context(
            &mut results,
            &MentionContext {
                post,
                channel,
                members: &profile_map,
                thread: thread.as_ref(),
            },
        );

        Ok(results)
    }

    async fn explicit_mentions(
        &self,
        post: &Post,
        profiles: &[UserProfile],
    ) -> Result<MentionResults, DispatchError> {
        let groups = self.directory.groups(&post.channel_id).await?;
        let policy = self.broadcast_policy(post, profiles.len()).await?;

        let mut members = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let state = MemberState {
                channel_props: self
                    .directory
                    .channel_notify_props(&post.channel_id, &profile.id)
                    .await?,
                status: self.directory.status(&profile.id).await?,
            };
            members.insert(profile.id.clone(), state);
        }

        let keywords = build_keyword_index(profiles, &groups, &members, policy);
        Ok(detect_mentions(post, &keywords))
    }

    /// Detects mentions in a freshly posted message and notifies everyone
    /// mentioned. A failed delivery is logged and does not stop the others.
    pub async fn message_posted(&self, post: &Post) -> Result<DispatchReport, DispatchError> {
        let channel = self.directory.channel(&post.channel_id).await?;
        let results = self.detect(post, &channel).await?;

        info!(
            post_id = %post.id,
            user_mentions = %format_mentions(&results.mentions),
            here_mentioned = results.here_mentioned,
            channel_mentioned = results.channel_mentioned,
            all_mentioned = results.all_mentioned,
            group_mentions = %format_mentions(&results.group_mentions),
            other_potential_mentions = ?results.other_potential_mentions,
            "message mentions detected"
        );

        let sender = self.directory.user(&post.user_id).await?;
        let channel_name = if channel.display_name.is_empty() {
            channel.name.as_str()
        } else {
            channel.display_name.as_str()
        };
        let preview = preview_message(&post.message, self.config.notifications.preview_limit);

        let mut report = DispatchReport {
            results,
            ..DispatchReport::default()
        };

        for user_id in report.results.mentions.keys() {
            if *user_id == post.user_id && !self.config.notifications.notify_author {
                continue;
            }

            report.notified.push(user_id.clone());
            if let Err(e) = self
                .notifications
                .send_mention_notification(user_id, channel_name, &sender.username, &preview)
                .await
            {
                error!(user_id = %user_id, error = %e, "failed to send mention notification");
                report.failures.push((user_id.clone(), e.to_string()));
            }
        }

        Ok(report)
    }

    async fn broadcast_policy(
        &self,
        post: &Post,
        member_count: usize,
    ) -> Result<BroadcastPolicy, DispatchError> {
        let settings = &self.config.broadcast;
        if !settings.allow_channel_mentions {
            return Ok(BroadcastPolicy::DENY);
        }

        let has_permission = self
            .directory
            .can_use_channel_mentions(&post.user_id, &post.channel_id)
            .await?;

        Ok(BroadcastPolicy::evaluate(
            post.mention_highlight_disabled(),
            has_permission,
            member_count,
            settings.max_notifications_per_channel,
        ))
    }
}
