//! Business logic services.
//!
//! Leaves first: credentials and the message log own state; routing,
//! visibility, and roster are pure functions over that state; identity and
//! chat compose them into the operations the HTTP layer calls.

pub mod auth;
pub mod chat;
pub mod credentials;
pub mod identity;
pub mod message_log;
pub mod roster;
pub mod routing;
pub mod uploads;
pub mod visibility;

pub use auth::AuthError;
pub use chat::{ChatError, ChatService, ConversationView};
pub use credentials::{AvatarChoice, CredentialStore};
pub use identity::IdentityService;
pub use message_log::MessageLog;
pub use roster::RosterEntry;
