use std::sync::Arc;

use carrier::{
    discord::{DiscordAnnouncer, DiscordRoles},
    WineCarrierToggle, WineRole,
};
use config::{Config, ConfigError};
use gate::Policies;
use poise::serenity_prelude;
use thiserror::Error;

use poise::serenity_prelude as serenity;

pub mod carrier;
pub mod commands;
pub mod config;
pub mod gate;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("An error has occurred with the bot.")]
    SerenityError(#[from] serenity_prelude::Error),

    #[error("An error has occurred loading the config.")]
    ConfigError(#[from] ConfigError),

    #[error("This command can only be used in a server.")]
    NotInGuild,
}

pub type Toggle = WineCarrierToggle<DiscordRoles, DiscordAnnouncer>;
pub type Context<'a> = poise::Context<'a, State, BotError>;

pub struct State {
    pub policies: Policies,
    pub toggle: Toggle,
}

async fn on_error(error: poise::FrameworkError<'_, State, BotError>) {
    if let poise::FrameworkError::Command { error, ctx, .. } = &error {
        tracing::error!(
            "An error has occurred while running /{}: {error:?}",
            ctx.command().name
        );
    }

    if let Err(e) = poise::builtins::on_error(error).await {
        tracing::error!("An error has occurred while handling an error: {e}");
    }
}

/// Resolves the role's display name from the guild, falling back to the configured one.
async fn wine_role(http: &serenity::Http, config: &Config) -> WineRole {
    let id = config.roles.wine_carrier;

    let name = match config.guild_id.roles(http).await {
        Ok(roles) => roles.get(&id).map(|role| role.name.clone()),
        Err(e) => {
            tracing::warn!("Could not fetch guild roles: {e}");
            None
        }
    };

    WineRole {
        id,
        name: name.unwrap_or_else(|| config.welcome.role_name.clone()),
    }
}

pub async fn start(token: &str, config: Config) -> Result<(), BotError> {
    let config = Arc::new(config);
    let setup_config = config.clone();

    let framework: poise::Framework<State, BotError> = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let config = setup_config;
                let role = wine_role(&ctx.http, &config).await;
                tracing::info!("Wine Carrier role name is {}", role.name);

                let announcer = DiscordAnnouncer {
                    http: ctx.http.clone(),
                    wine_channel: config.channels.wine_carrier,
                    audit_channel: config.channels.steve_says,
                    welcome_path: config.welcome.message_path.clone(),
                    thumbnail_url: config.welcome.thumbnail_url.clone(),
                };

                let toggle =
                    WineCarrierToggle::new(DiscordRoles::new(ctx.http.clone()), announcer, role)
                        .with_timeouts(
                            config.toggle.lock_timeout(),
                            config.toggle.notify_timeout(),
                        );

                Ok(State {
                    policies: Policies::from_config(&config),
                    toggle,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    tracing::info!("Starting boozebot for guild {}", config.guild_id);
    client.start().await?;

    Ok(())
}
