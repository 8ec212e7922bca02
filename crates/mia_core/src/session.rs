//! The single live session: active companion, its stats, and a busy flag.
//!
//! Reads are lock-free snapshots (`ArcSwap`); every mutation replaces the
//! whole `Session` value, so readers never observe a half-applied update.

use crate::error::SessionError;
use crate::identity::IdentityStore;
use crate::model::{Companion, Session, Stats};
use arc_swap::ArcSwap;
use std::sync::Arc;

pub struct SessionStore {
    state: ArcSwap<Session>,
    identity: Arc<dyn IdentityStore>,
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityStore>) -> Self {
        Self {
            state: ArcSwap::from_pointee(Session::default()),
            identity,
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<Session> {
        self.state.load_full()
    }

    pub fn active_companion_id(&self) -> Option<String> {
        self.state.load().companion.as_ref().map(|c| c.id.clone())
    }

    /// The persisted identifier from a previous run, if any.
    pub fn persisted_id(&self) -> anyhow::Result<Option<String>> {
        self.identity.load()
    }

    /// Replace the companion and persist its id.
    ///
    /// Stats of a different companion are dropped. Persistence failures are
    /// logged and do not undo the in-memory update.
    pub fn set_companion(&self, companion: Companion) {
        let id = companion.id.clone();
        self.state.rcu(|current| {
            let mut next = Session::clone(current);
            let same = next.companion.as_ref().map(|c| c.id == id).unwrap_or(false);
            if !same {
                next.stats = None;
            }
            next.companion = Some(companion.clone());
            next
        });
        tracing::debug!("Active companion set to {}", id);

        if let Err(e) = self.identity.save(&id) {
            tracing::warn!("Failed to persist companion id {}: {:#}", id, e);
        }
    }

    /// Replace the stats snapshot. Refused unless the stats belong to the
    /// active companion; on refusal the store is left unchanged.
    pub fn set_stats(&self, stats: Stats) -> Result<(), SessionError> {
        let mut outcome = Ok(());
        self.state.rcu(|current| {
            let mut next = Session::clone(current);
            outcome = match &current.companion {
                None => Err(SessionError::NoCompanion),
                Some(c) if c.id != stats.pet_id => Err(SessionError::StatsMismatch {
                    active_id: c.id.clone(),
                    stats_pet_id: stats.pet_id.clone(),
                }),
                Some(_) => {
                    next.stats = Some(stats.clone());
                    Ok(())
                }
            };
            next
        });
        outcome
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.rcu(|current| Session {
            is_loading: loading,
            ..Session::clone(current)
        });
    }

    /// Drop companion and stats and forget the persisted id.
    pub fn clear(&self) {
        self.state.rcu(|current| Session {
            companion: None,
            stats: None,
            is_loading: current.is_loading,
        });
        tracing::info!("Session cleared");

        if let Err(e) = self.identity.clear() {
            tracing::warn!("Failed to remove persisted companion id: {:#}", e);
        }
    }
}
