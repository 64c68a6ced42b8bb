//! Wine Carrier role toggling.
//!
//! Every grant and revoke runs under a single lock, regardless of the member it
//! concerns. The check, the mutation and (for grants) the welcome notices all
//! happen while the lock is held; the caller acknowledges the actor afterwards.

use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude::{self, GuildId, RoleId, UserId};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

pub mod discord;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("{0}")]
    Discord(#[from] serenity_prelude::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to read the welcome message: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to send message: {0}")]
    Discord(#[from] serenity_prelude::Error),
    #[error("Timed out sending message")]
    TimedOut,
}

#[derive(Error, Debug)]
pub enum ToggleError {
    #[error("Another role change is still in progress")]
    Busy,
    #[error("{0}")]
    Lookup(MutationError),
    #[error("{0}")]
    MutationFailed(MutationError),
}

/// The member a grant or revoke is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WineRole {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted { notified: bool },
    AlreadyHasRole,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    DoesNotHaveRole,
}

/// Read and write access to a guild member's roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn has_role(&self, target: &Target, role: RoleId) -> Result<bool, MutationError>;

    async fn add_role(&self, target: &Target, role: RoleId) -> Result<(), MutationError>;

    async fn remove_role(&self, target: &Target, role: RoleId) -> Result<(), MutationError>;
}

#[async_trait]
pub trait Announcer: Send + Sync {
    /// Posts the welcome embed for a freshly granted member.
    async fn welcome(&self, target: &Target) -> Result<(), NotifyError>;

    /// Posts a plain status line to the admin channel.
    async fn audit(&self, line: &str) -> Result<(), NotifyError>;
}

pub struct WineCarrierToggle<S, A> {
    store: S,
    announcer: A,
    role: WineRole,
    lock: Mutex<()>,
    lock_timeout: Duration,
    notify_timeout: Duration,
}

impl<S, A> WineCarrierToggle<S, A>
where
    S: RoleStore,
    A: Announcer,
{
    pub fn new(store: S, announcer: A, role: WineRole) -> Self {
        Self {
            store,
            announcer,
            role,
            lock: Mutex::new(()),
            lock_timeout: Duration::from_secs(30),
            notify_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeouts(mut self, lock_timeout: Duration, notify_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self.notify_timeout = notify_timeout;
        self
    }

    pub fn role(&self) -> &WineRole {
        &self.role
    }

    #[instrument(skip_all, fields(user = %target.user_id))]
    pub async fn grant(&self, target: &Target) -> Result<GrantOutcome, ToggleError> {
        let _guard = tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| {
                tracing::warn!("Gave up waiting for the wine carrier lock");
                ToggleError::Busy
            })?;

        let has_role = self
            .store
            .has_role(target, self.role.id)
            .await
            .map_err(ToggleError::Lookup)?;

        if has_role {
            tracing::info!(
                "{} is already a {}, doing nothing",
                target.display_name,
                self.role.name
            );
            return Ok(GrantOutcome::AlreadyHasRole);
        }

        tracing::info!(
            "{} is not a {}, adding the role",
            target.display_name,
            self.role.name
        );
        if let Err(e) = self.store.add_role(target, self.role.id).await {
            tracing::error!(
                "Failed adding {} to {}: {e}",
                self.role.name,
                target.display_name
            );
            return Err(ToggleError::MutationFailed(e));
        }

        let welcomed = self.notify("welcome", self.announcer.welcome(target)).await;
        let line = grant_line(target, &self.role);
        let audited = self.notify("audit", self.announcer.audit(&line)).await;

        Ok(GrantOutcome::Granted {
            notified: welcomed && audited,
        })
    }

    #[instrument(skip_all, fields(user = %target.user_id))]
    pub async fn revoke(&self, target: &Target) -> Result<RevokeOutcome, ToggleError> {
        let _guard = tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| {
                tracing::warn!("Gave up waiting for the wine carrier lock");
                ToggleError::Busy
            })?;

        let has_role = self
            .store
            .has_role(target, self.role.id)
            .await
            .map_err(ToggleError::Lookup)?;

        if !has_role {
            tracing::info!(
                "{} is not a {}, doing nothing",
                target.display_name,
                self.role.name
            );
            return Ok(RevokeOutcome::DoesNotHaveRole);
        }

        tracing::info!(
            "{} is a {}, removing the role",
            target.display_name,
            self.role.name
        );
        self.store
            .remove_role(target, self.role.id)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed removing {} from {}: {e}",
                    self.role.name,
                    target.display_name
                );
                ToggleError::MutationFailed(e)
            })?;

        Ok(RevokeOutcome::Revoked)
    }

    /// Notice failures are logged and never undo the committed role change.
    async fn notify<F>(&self, kind: &str, send: F) -> bool
    where
        F: std::future::Future<Output = Result<(), NotifyError>>,
    {
        let result = match tokio::time::timeout(self.notify_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::TimedOut),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send {kind} notice: {e}");
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.lock.try_lock().is_ok()
    }
}

pub fn grant_line(target: &Target, role: &WineRole) -> String {
    format!("{} now has the {} role.", target.display_name, role.name)
}

pub fn revoke_line(target: &Target, role: &WineRole) -> String {
    format!("{} no longer has the {} role.", target.display_name, role.name)
}
