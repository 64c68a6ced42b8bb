use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use poise::serenity_prelude::{
    Builder, ChannelId, CreateEmbed, CreateMessage, Http, Mentionable, RoleId,
};

use super::{Announcer, MutationError, NotifyError, RoleStore, Target};

const AUDIT_REASON: &str = "Wine Carrier role toggled by command";

/// Role membership read straight from the API, never from the cache.
pub struct DiscordRoles {
    http: Arc<Http>,
}

impl DiscordRoles {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RoleStore for DiscordRoles {
    async fn has_role(&self, target: &Target, role: RoleId) -> Result<bool, MutationError> {
        let member = self.http.get_member(target.guild_id, target.user_id).await?;
        Ok(member.roles.contains(&role))
    }

    async fn add_role(&self, target: &Target, role: RoleId) -> Result<(), MutationError> {
        self.http
            .add_member_role(target.guild_id, target.user_id, role, Some(AUDIT_REASON))
            .await?;
        Ok(())
    }

    async fn remove_role(&self, target: &Target, role: RoleId) -> Result<(), MutationError> {
        self.http
            .remove_member_role(target.guild_id, target.user_id, role, Some(AUDIT_REASON))
            .await?;
        Ok(())
    }
}

pub struct DiscordAnnouncer {
    pub http: Arc<Http>,
    pub wine_channel: ChannelId,
    pub audit_channel: ChannelId,
    pub welcome_path: PathBuf,
    pub thumbnail_url: String,
}

impl DiscordAnnouncer {
    async fn send(&self, channel: ChannelId, msg: CreateMessage) -> Result<(), NotifyError> {
        msg.execute(self.http.as_ref(), (channel, None)).await?;
        Ok(())
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn welcome(&self, target: &Target) -> Result<(), NotifyError> {
        // Re-read on every grant so the text can be edited without a restart.
        let text = tokio::fs::read_to_string(&self.welcome_path).await?;

        let embed = CreateEmbed::new()
            .description(text)
            .thumbnail(self.thumbnail_url.clone());

        let msg = CreateMessage::new()
            .content(target.user_id.mention().to_string())
            .embed(embed);

        self.send(self.wine_channel, msg).await
    }

    async fn audit(&self, line: &str) -> Result<(), NotifyError> {
        self.send(self.audit_channel, CreateMessage::new().content(line))
            .await
    }
}
