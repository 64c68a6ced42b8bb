//! Permission and channel gates evaluated before any command touches a member's roles.

use std::future::Future;

use poise::serenity_prelude::{ChannelId, Mentionable, RoleId};
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("You do not have permission to use this command.")]
    PermissionDenied,
    #[error("This command can only be used in {}.", .0.mention())]
    WrongChannel(ChannelId),
}

/// Succeeds when the actor holds at least one of the required roles.
pub fn check_roles(held: &[RoleId], required: &[RoleId]) -> Result<(), GateError> {
    if held.iter().any(|role| required.contains(role)) {
        Ok(())
    } else {
        Err(GateError::PermissionDenied)
    }
}

pub fn check_channel(invoked_in: ChannelId, allowed: ChannelId) -> Result<(), GateError> {
    if invoked_in == allowed {
        Ok(())
    } else {
        Err(GateError::WrongChannel(allowed))
    }
}

#[derive(Debug, Clone)]
pub struct CommandPolicy {
    pub required_roles: Vec<RoleId>,
    pub channel: Option<ChannelId>,
}

impl CommandPolicy {
    /// Roles are checked first so an unauthorised actor never learns where the command lives.
    pub fn authorize(&self, held: &[RoleId], invoked_in: ChannelId) -> Result<(), GateError> {
        check_roles(held, &self.required_roles)?;

        if let Some(allowed) = self.channel {
            check_channel(invoked_in, allowed)?;
        }

        Ok(())
    }
}

/// Runs `action` only once the policy has passed; a rejection never starts it.
pub async fn gated<F, Fut, T>(
    policy: &CommandPolicy,
    held: &[RoleId],
    invoked_in: ChannelId,
    action: F,
) -> Result<T, GateError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    policy.authorize(held, invoked_in)?;
    Ok(action().await)
}

#[derive(Debug, Clone)]
pub struct Policies {
    pub grant_menu: CommandPolicy,
    pub grant_slash: CommandPolicy,
    pub revoke: CommandPolicy,
}

impl Policies {
    pub fn from_config(config: &Config) -> Self {
        let roles = &config.roles;
        let granters = vec![
            roles.admin,
            roles.moderator,
            roles.sommelier,
            roles.connoisseur,
        ];

        Self {
            grant_menu: CommandPolicy {
                required_roles: granters.clone(),
                channel: Some(config.channels.booze_discussions),
            },
            grant_slash: CommandPolicy {
                required_roles: granters,
                channel: config.channels.make_wine_carrier,
            },
            revoke: CommandPolicy {
                required_roles: vec![roles.admin, roles.moderator, roles.sommelier],
                channel: Some(config.channels.steve_says),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::carrier::testing::{target, toggle, FakeChannels, FakeGuild};

    const ADMIN: RoleId = RoleId::new(1);
    const MODERATOR: RoleId = RoleId::new(2);
    const SOMMELIER: RoleId = RoleId::new(3);
    const CONNOISSEUR: RoleId = RoleId::new(4);
    const PLEB: RoleId = RoleId::new(99);

    const DISCUSSIONS: ChannelId = ChannelId::new(10);
    const STEVE_SAYS: ChannelId = ChannelId::new(12);

    fn policies() -> Policies {
        let config = Config::from_toml(
            r#"
guild_id = 1000
[roles]
admin = 1
moderator = 2
sommelier = 3
connoisseur = 4
wine_carrier = 5
[channels]
booze_discussions = 10
wine_carrier = 11
steve_says = 12
[welcome]
message_path = "welcome.txt"
thumbnail_url = "https://example.com/icon.webp"
"#,
        )
        .unwrap();

        Policies::from_config(&config)
    }

    #[test]
    fn role_gate_needs_any_overlap() {
        assert_eq!(check_roles(&[PLEB, SOMMELIER], &[ADMIN, SOMMELIER]), Ok(()));
        assert_eq!(
            check_roles(&[PLEB], &[ADMIN, SOMMELIER]),
            Err(GateError::PermissionDenied)
        );
        assert_eq!(check_roles(&[], &[ADMIN]), Err(GateError::PermissionDenied));
    }

    #[test]
    fn channel_gate_names_the_allowed_channel() {
        assert_eq!(check_channel(STEVE_SAYS, STEVE_SAYS), Ok(()));

        let err = check_channel(DISCUSSIONS, STEVE_SAYS).unwrap_err();
        assert_eq!(err, GateError::WrongChannel(STEVE_SAYS));
        assert_eq!(err.to_string(), "This command can only be used in <#12>.");
    }

    #[test]
    fn connoisseur_can_grant_from_menu_only_in_discussions() {
        let policies = policies();

        assert_eq!(policies.grant_menu.authorize(&[CONNOISSEUR], DISCUSSIONS), Ok(()));
        assert_eq!(
            policies.grant_menu.authorize(&[CONNOISSEUR], STEVE_SAYS),
            Err(GateError::WrongChannel(DISCUSSIONS))
        );
    }

    #[test]
    fn actor_without_roles_is_denied_before_channel_check() {
        let policies = policies();

        assert_eq!(
            policies.grant_menu.authorize(&[PLEB], STEVE_SAYS),
            Err(GateError::PermissionDenied)
        );
    }

    #[test]
    fn slash_grant_is_ungated_by_channel_by_default() {
        let policies = policies();

        assert_eq!(policies.grant_slash.authorize(&[MODERATOR], STEVE_SAYS), Ok(()));
        assert_eq!(policies.grant_slash.authorize(&[MODERATOR], DISCUSSIONS), Ok(()));
    }

    #[test]
    fn connoisseur_cannot_revoke() {
        let policies = policies();

        assert_eq!(
            policies.revoke.authorize(&[CONNOISSEUR], STEVE_SAYS),
            Err(GateError::PermissionDenied)
        );
        assert_eq!(policies.revoke.authorize(&[SOMMELIER], STEVE_SAYS), Ok(()));
        assert_eq!(
            policies.revoke.authorize(&[ADMIN], DISCUSSIONS),
            Err(GateError::WrongChannel(STEVE_SAYS))
        );
    }

    #[tokio::test]
    async fn rejected_actor_never_reaches_the_toggle() {
        let policies = policies();
        let guild = Arc::new(FakeGuild::default());
        let channels = Arc::new(FakeChannels::default());
        let toggle = toggle(&guild, &channels);
        let hauler = target(1, "Hauler");

        let denied = gated(&policies.grant_menu, &[PLEB], DISCUSSIONS, || {
            toggle.grant(&hauler)
        })
        .await;
        assert_eq!(denied.err(), Some(GateError::PermissionDenied));

        let misplaced = gated(&policies.revoke, &[SOMMELIER], DISCUSSIONS, || {
            toggle.revoke(&hauler)
        })
        .await;
        assert_eq!(misplaced.err(), Some(GateError::WrongChannel(STEVE_SAYS)));

        assert_eq!(guild.reads(), 0);
        assert_eq!(guild.writes(), 0);
        assert!(!guild.holds(hauler.user_id));
        assert!(toggle.is_idle());
    }

    #[tokio::test]
    async fn authorised_actor_runs_the_toggle() {
        let policies = policies();
        let guild = Arc::new(FakeGuild::default());
        let channels = Arc::new(FakeChannels::default());
        let toggle = toggle(&guild, &channels);
        let hauler = target(1, "Hauler");

        let granted = gated(&policies.grant_slash, &[CONNOISSEUR], STEVE_SAYS, || {
            toggle.grant(&hauler)
        })
        .await;

        assert!(matches!(granted, Ok(Ok(_))));
        assert_eq!(guild.reads(), 1);
        assert!(guild.holds(hauler.user_id));
    }
}
