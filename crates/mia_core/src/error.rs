use thiserror::Error;

/// Mutations the session store refuses because they would break the
/// companion/stats pairing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot store stats without an active companion")]
    NoCompanion,

    #[error("Stats for '{stats_pet_id}' do not belong to active companion '{active_id}'")]
    StatsMismatch {
        active_id: String,
        stats_pet_id: String,
    },
}
