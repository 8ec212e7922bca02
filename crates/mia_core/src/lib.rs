pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod presentation;
pub mod session;

pub use config::MiaConfig;
pub use error::SessionError;
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use model::{
    ChatTurn, Companion, Mood, PersonalityMode, PersonalityOption, Role, Session, Stats,
};
pub use session::SessionStore;
