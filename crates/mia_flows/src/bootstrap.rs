use mia_client::Backend;
use mia_core::{Companion, SessionStore};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// The saved companion and its stats are in the session.
    Resumed(Companion),
    /// Nothing to resume; the caller should offer creation.
    NoCompanion,
}

/// Resolves the companion saved on this device at start-up.
///
/// Every failure degrades to `NoCompanion`: a stale id, an unreachable
/// backend and a fresh install all look the same to the caller.
pub struct Bootstrap {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
}

impl Bootstrap {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionStore>) -> Self {
        Self { backend, session }
    }

    pub async fn run(&self) -> BootstrapOutcome {
        self.session.set_loading(true);
        let outcome = self.resolve().await;
        self.session.set_loading(false);
        outcome
    }

    async fn resolve(&self) -> BootstrapOutcome {
        let pet_id = match self.session.persisted_id() {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::info!("No saved companion on this device");
                return BootstrapOutcome::NoCompanion;
            }
            Err(e) => {
                tracing::warn!("Could not read saved companion id: {:#}", e);
                return BootstrapOutcome::NoCompanion;
            }
        };

        let bundle = match self.backend.fetch_companion(&pet_id).await {
            Ok(bundle) => bundle,
            Err(e) if e.is_not_found() => {
                tracing::info!("Saved companion {} no longer exists", pet_id);
                return BootstrapOutcome::NoCompanion;
            }
            Err(e) => {
                tracing::warn!("Failed to load companion {}: {}", pet_id, e);
                return BootstrapOutcome::NoCompanion;
            }
        };

        let stats = match bundle.stats {
            Some(stats) => stats,
            None => match self.backend.fetch_stats(&pet_id).await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::warn!("Companion {} has no stats: {}", pet_id, e);
                    return BootstrapOutcome::NoCompanion;
                }
            },
        };

        let companion = bundle.pet;
        if stats.pet_id != companion.id {
            tracing::warn!(
                "Backend returned stats for {} with companion {}",
                stats.pet_id,
                companion.id
            );
            return BootstrapOutcome::NoCompanion;
        }

        self.session.set_companion(companion.clone());
        if let Err(e) = self.session.set_stats(stats) {
            // Only possible if another flow swapped the companion meanwhile
            tracing::warn!("Rejected stats during bootstrap: {}", e);
            return BootstrapOutcome::NoCompanion;
        }

        tracing::info!("Resumed companion {} ({})", companion.name, companion.id);
        BootstrapOutcome::Resumed(companion)
    }
}
