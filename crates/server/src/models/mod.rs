//! Domain models for the messaging server.
//!
//! These types are separate from database row types; repositories convert
//! rows into them and reject rows that fail validation.

pub mod action;
pub mod message;
pub mod session;
pub mod user;

pub use action::ActionResponse;
pub use message::{Message, NewMessage};
pub use session::{ClientSession, session_keys};
pub use user::{UserProfile, UserRecord};
