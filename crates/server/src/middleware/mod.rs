//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with in-memory store)

pub mod auth;
pub mod session;

pub use auth::{ChatSession, RequireAuth};
pub use session::{create_session_layer, load_client};
