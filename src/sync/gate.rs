use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::backend::Scope;
use crate::config::SyncConfig;

/// Decides whether reconciliation runs at all.
///
/// Sync happens only while it is switched on and a user is signed in.
#[derive(Debug, Default)]
pub struct SyncGate {
    enabled: AtomicBool,
    user_id: RwLock<Option<String>>,
}

impl SyncGate {
    pub fn new(enabled: bool, user_id: Option<String>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            user_id: RwLock::new(user_id.filter(|id| !id.trim().is_empty())),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.enabled, config.user_id.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut slot = self.user_id.write().unwrap_or_else(PoisonError::into_inner);
        *slot = (!user_id.trim().is_empty()).then_some(user_id);
    }

    pub fn sign_out(&self) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn should_sync(&self) -> bool {
        self.scope().is_some()
    }

    /// Scope to sync under, or `None` when sync is off.
    pub fn scope(&self) -> Option<Scope> {
        if !self.is_enabled() {
            return None;
        }
        self.user_id().map(|id| Scope::for_user(&id))
    }
}
