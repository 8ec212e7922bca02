//! Client-side flows around a companion session.
//!
//! - [`bootstrap`]: resume the companion saved on this device, if any
//! - [`creation`]: validate and submit a new companion
//! - [`chat`]: the transcript and the one-request-one-reply exchange cycle

pub mod bootstrap;
pub mod chat;
pub mod creation;

pub use bootstrap::{Bootstrap, BootstrapOutcome};
pub use chat::{
    ChatFlow, ExchangeOutcome, ExchangeState, FeedError, APOLOGY, MESSAGE_MAX_CHARS,
};
pub use creation::{
    CreationError, CreationFlow, CreationForm, PersonalityChoice, ValidationError, DEFAULT_COLOR,
    PALETTE,
};
