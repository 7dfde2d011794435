//! Switchboard Core - Shared domain types.
//!
//! This crate provides the types shared by every Switchboard component:
//! - `server` - The direct-messaging web application
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no locking, no HTTP.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Normalized emails, message IDs, avatars, roles and notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
