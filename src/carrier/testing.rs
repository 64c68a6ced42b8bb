//! In-memory role store and announcer for exercising the toggle engine.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use tokio::sync::Notify;

use super::{
    Announcer, MutationError, NotifyError, RoleStore, Target, WineCarrierToggle, WineRole,
};

pub const WINE: RoleId = RoleId::new(839149899596955708);

/// Ordered record of every side effect, shared between the fakes.
#[derive(Default, Clone)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeGuild {
    pub holders: Mutex<HashSet<UserId>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub reject_writes: Option<String>,
    pub journal: Journal,
}

impl FakeGuild {
    pub fn holding(user: UserId) -> Self {
        let guild = Self::default();
        guild.holders.lock().unwrap().insert(user);
        guild
    }

    pub fn holds(&self, user: UserId) -> bool {
        self.holders.lock().unwrap().contains(&user)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for Arc<FakeGuild> {
    async fn has_role(&self, target: &Target, role: RoleId) -> Result<bool, MutationError> {
        assert_eq!(role, WINE);
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("read {}", target.user_id));
        tokio::task::yield_now().await;
        Ok(self.holds(target.user_id))
    }

    async fn add_role(&self, target: &Target, _role: RoleId) -> Result<(), MutationError> {
        tokio::task::yield_now().await;
        if let Some(reason) = &self.reject_writes {
            return Err(MutationError::Rejected(reason.clone()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("add {}", target.user_id));
        self.holders.lock().unwrap().insert(target.user_id);
        Ok(())
    }

    async fn remove_role(&self, target: &Target, _role: RoleId) -> Result<(), MutationError> {
        tokio::task::yield_now().await;
        if let Some(reason) = &self.reject_writes {
            return Err(MutationError::Rejected(reason.clone()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("remove {}", target.user_id));
        self.holders.lock().unwrap().remove(&target.user_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeChannels {
    pub welcomes: Mutex<Vec<UserId>>,
    pub audits: Mutex<Vec<String>>,
    pub fail_welcome: bool,
    pub stall: Option<Arc<Notify>>,
    pub journal: Journal,
}

#[async_trait]
impl Announcer for Arc<FakeChannels> {
    async fn welcome(&self, target: &Target) -> Result<(), NotifyError> {
        if let Some(stall) = &self.stall {
            stall.notified().await;
        }
        if self.fail_welcome {
            return Err(NotifyError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "welcome.txt",
            )));
        }
        self.journal.record(format!("welcome {}", target.user_id));
        self.welcomes.lock().unwrap().push(target.user_id);
        Ok(())
    }

    async fn audit(&self, line: &str) -> Result<(), NotifyError> {
        self.journal.record("audit");
        self.audits.lock().unwrap().push(line.to_owned());
        Ok(())
    }
}

pub type FakeToggle = WineCarrierToggle<Arc<FakeGuild>, Arc<FakeChannels>>;

pub fn target(id: u64, name: &str) -> Target {
    Target {
        guild_id: GuildId::new(800080948716503040),
        user_id: UserId::new(id),
        display_name: name.to_owned(),
    }
}

pub fn toggle(guild: &Arc<FakeGuild>, channels: &Arc<FakeChannels>) -> FakeToggle {
    WineCarrierToggle::new(
        guild.clone(),
        channels.clone(),
        WineRole {
            id: WINE,
            name: "Wine Carrier".into(),
        },
    )
}
