use std::future::Future;

use poise::{serenity_prelude::RoleId, CreateReply};

use crate::{
    carrier::{GrantOutcome, RevokeOutcome, Target, ToggleError, WineRole},
    gate::{self, CommandPolicy},
    BotError, Context, State,
};

pub mod wine_carrier;

pub fn all() -> Vec<poise::Command<State, BotError>> {
    vec![
        wine_carrier::make_wine_carrier_menu(),
        wine_carrier::make_wine_carrier(),
        wine_carrier::remove_wine_carrier(),
    ]
}

async fn actor_roles(ctx: Context<'_>) -> Vec<RoleId> {
    match ctx.author_member().await {
        Some(member) => member.roles.clone(),
        None => Vec::new(),
    }
}

/// Runs a command's gates, then `action`; a failed gate is answered privately.
pub async fn dispatch<F, Fut>(
    ctx: Context<'_>,
    policy: &CommandPolicy,
    action: F,
) -> Result<(), BotError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), BotError>>,
{
    let held = actor_roles(ctx).await;

    match gate::gated(policy, &held, ctx.channel_id(), action).await {
        Ok(done) => done,
        Err(rejection) => {
            tracing::info!(
                "Rejected /{} from {}: {rejection:?}",
                ctx.command().name,
                ctx.author().name
            );
            ctx.send(
                CreateReply::default()
                    .content(rejection.to_string())
                    .ephemeral(true),
            )
            .await?;
            Ok(())
        }
    }
}

/// What the actor is told once a toggle has finished.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    fn public(content: String) -> Self {
        Self {
            content,
            ephemeral: false,
        }
    }

    fn private(content: String) -> Self {
        Self {
            content,
            ephemeral: true,
        }
    }

    /// The line everyone in the invoking channel should see, if any.
    pub fn channel_post(&self) -> Option<&str> {
        (!self.ephemeral).then_some(self.content.as_str())
    }

    /// Completes a deferred ephemeral response. Public lines are posted to the channel
    /// separately, since the deferred response itself stays private.
    pub async fn send(self, ctx: Context<'_>) -> Result<(), BotError> {
        if let Some(line) = self.channel_post() {
            ctx.channel_id().say(ctx, line).await?;
        }

        ctx.send(
            CreateReply::default()
                .content(self.content)
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }
}

const BUSY: &str = "Another Wine Carrier change is still in progress, please try again shortly.";

pub fn grant_reply(
    outcome: Result<GrantOutcome, ToggleError>,
    target: &Target,
    role: &WineRole,
) -> Reply {
    match outcome {
        Ok(GrantOutcome::Granted { .. }) => {
            Reply::public(crate::carrier::grant_line(target, role))
        }
        Ok(GrantOutcome::AlreadyHasRole) => {
            Reply::private(format!("User is already a {}", role.name))
        }
        Err(ToggleError::Busy) => Reply::private(BUSY.into()),
        Err(ToggleError::Lookup(e) | ToggleError::MutationFailed(e)) => Reply::private(format!(
            "Failed adding role {} to {}: {e}",
            role.name, target.display_name
        )),
    }
}

pub fn revoke_reply(
    outcome: Result<RevokeOutcome, ToggleError>,
    target: &Target,
    role: &WineRole,
) -> Reply {
    match outcome {
        Ok(RevokeOutcome::Revoked) => {
            Reply::public(crate::carrier::revoke_line(target, role))
        }
        Ok(RevokeOutcome::DoesNotHaveRole) => {
            Reply::private(format!("User is not a {}", role.name))
        }
        Err(ToggleError::Busy) => Reply::private(BUSY.into()),
        Err(ToggleError::Lookup(e) | ToggleError::MutationFailed(e)) => Reply::private(format!(
            "Failed removing role {} from {}: {e}",
            role.name, target.display_name
        )),
    }
}
