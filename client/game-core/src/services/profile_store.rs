use crate::error::StorageError;
use crate::models::{BadgeId, EducationLevel, UserProfile};
use crate::services::storage::{KeyValueStore, USER_KEY};
use tokio::sync::watch;

/// Cached profile of the signed-in player.
///
/// Every write is a single `watch` update, so a subscriber always sees a whole
/// record. Only the commit protocol and the auth flow write; the coin, XP and
/// badge mutators are crate-private for that reason.
#[derive(Clone)]
pub struct ProfileStore {
    tx: watch::Sender<Option<UserProfile>>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<UserProfile> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.tx.subscribe()
    }

    pub fn set_user(&self, profile: UserProfile) {
        tracing::info!("Profile loaded for {}", profile.username);
        self.tx.send_replace(Some(profile));
    }

    /// Logout
    pub fn clear(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Profile cleared");
        }
    }

    pub(crate) fn set_coins(&self, total: u64) {
        self.modify(|profile| {
            if profile.coins == total {
                return false;
            }
            profile.coins = total;
            true
        });
    }

    /// XP grants also move the coin balance when a level-up bonus was paid.
    pub(crate) fn apply_xp_grant(&self, xp: u64, level: u32, coins: u64) {
        self.modify(|profile| {
            let changed = profile.xp != xp || profile.level != level || profile.coins != coins;
            profile.xp = xp;
            profile.level = level.max(1);
            profile.coins = coins;
            changed
        });
    }

    pub(crate) fn add_badge(&self, badge: BadgeId) {
        self.modify(move |profile| profile.badges.insert(badge));
    }

    pub(crate) fn set_selected_level(&self, level: EducationLevel) {
        self.modify(|profile| {
            let changed = profile.selected_level != level;
            profile.selected_level = level;
            changed
        });
    }

    pub fn has_badge(&self, badge: &BadgeId) -> bool {
        self.tx
            .borrow()
            .as_ref()
            .is_some_and(|profile| profile.badges.contains(badge))
    }

    /// Writes are dropped while nobody is signed in; subscribers are only
    /// woken when the record actually changed.
    fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut UserProfile) -> bool,
    {
        self.tx.send_if_modified(|slot| match slot.as_mut() {
            Some(profile) => f(profile),
            None => {
                tracing::debug!("Profile update ignored: no user signed in");
                false
            }
        });
    }

    pub async fn persist(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        match self.current() {
            Some(profile) => {
                let raw = serde_json::to_string(&profile)?;
                store.set(USER_KEY, &raw).await
            }
            None => store.remove(USER_KEY).await,
        }
    }

    /// Loads a previously persisted profile. A corrupt entry is discarded.
    pub async fn restore(&self, store: &dyn KeyValueStore) -> Result<Option<UserProfile>, StorageError> {
        let Some(raw) = store.get(USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => {
                self.set_user(profile.clone());
                Ok(Some(profile))
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable stored profile: {}", e);
                store.remove(USER_KEY).await?;
                Ok(None)
            }
        }
    }
}
