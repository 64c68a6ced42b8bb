use poise::serenity_prelude as serenity;

use crate::{
    carrier::Target,
    commands::{dispatch, grant_reply, revoke_reply},
    BotError, Context,
};

#[poise::command(context_menu_command = "Make Wine Carrier", guild_only)]
pub async fn make_wine_carrier_menu(
    ctx: Context<'_>,
    user: serenity::User,
) -> Result<(), BotError> {
    let guild_id = ctx.guild_id().ok_or(BotError::NotInGuild)?;

    tracing::info!(
        "Make Wine Carrier called by {} for {}",
        ctx.author().name,
        user.name
    );

    dispatch(ctx, &ctx.data().policies.grant_menu, || async move {
        let display_name = match guild_id.member(ctx, user.id).await {
            Ok(member) => member.display_name().to_owned(),
            Err(e) => {
                tracing::warn!("Could not fetch member {}: {e}", user.id);
                user.name.clone()
            }
        };

        grant(
            ctx,
            Target {
                guild_id,
                user_id: user.id,
                display_name,
            },
        )
        .await
    })
    .await
}

/// Give user the Wine Carrier role. Admin/Sommelier/Connoisseur role required.
#[poise::command(slash_command, guild_only)]
pub async fn make_wine_carrier(
    ctx: Context<'_>,
    #[description = "An @ mention of the Discord user to receive the role."] user: serenity::Member,
) -> Result<(), BotError> {
    tracing::info!(
        "make_wine_carrier called by {} in {} for {} to set the Wine Carrier role",
        ctx.author().name,
        ctx.channel_id(),
        user.user.name
    );

    dispatch(ctx, &ctx.data().policies.grant_slash, || grant(ctx, target_of(&user))).await
}

/// Removes the Wine Carrier role from a user. Admin/Sommelier role required.
#[poise::command(slash_command, guild_only)]
pub async fn remove_wine_carrier(
    ctx: Context<'_>,
    #[description = "An @ mention of the Discord user to lose the role."] user: serenity::Member,
) -> Result<(), BotError> {
    tracing::info!(
        "remove_wine_carrier called by {} in {} for {} to remove the Wine Carrier role",
        ctx.author().name,
        ctx.channel_id(),
        user.user.name
    );

    dispatch(ctx, &ctx.data().policies.revoke, || async {
        // The lock wait can outlast the interaction's initial response window.
        ctx.defer_ephemeral().await?;

        let target = target_of(&user);
        let toggle = &ctx.data().toggle;

        let outcome = toggle.revoke(&target).await;
        revoke_reply(outcome, &target, toggle.role())
            .send(ctx)
            .await
    })
    .await
}

/// Shared by the context menu and the slash command.
async fn grant(ctx: Context<'_>, target: Target) -> Result<(), BotError> {
    // The lock wait can outlast the interaction's initial response window.
    ctx.defer_ephemeral().await?;

    let toggle = &ctx.data().toggle;

    // The lock is already released here; only the acknowledgement remains.
    let outcome = toggle.grant(&target).await;
    grant_reply(outcome, &target, toggle.role())
        .send(ctx)
        .await
}

fn target_of(member: &serenity::Member) -> Target {
    Target {
        guild_id: member.guild_id,
        user_id: member.user.id,
        display_name: member.display_name().to_owned(),
    }
}
