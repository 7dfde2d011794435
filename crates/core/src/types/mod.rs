//! Core types for Switchboard.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod avatar;
pub mod email;
pub mod id;
pub mod notification;
pub mod role;

pub use avatar::{AvatarRef, AvatarRefError, DEFAULT_AVATARS};
pub use email::{Email, EmailError};
pub use id::*;
pub use notification::{Notification, Redirect, Severity};
pub use role::Role;
