//! Conversation routing.
//!
//! Decides who receives a message from the sender's session alone. Regular
//! users always write to the admin; the admin writes to whichever user is
//! selected. The result is computed per send and never cached.

use switchboard_core::Email;

use crate::models::ClientSession;
use crate::services::chat::ChatError;

/// Resolve the receiver of a message sent from `session`.
///
/// # Errors
///
/// - `ChatError::NotAuthenticated` for an anonymous session
/// - `ChatError::NoRecipientSelected` for the admin with no open conversation
pub fn resolve_receiver(session: &ClientSession, admin_email: &Email) -> Result<Email, ChatError> {
    let sender = session
        .active_email
        .as_ref()
        .ok_or(ChatError::NotAuthenticated)?;

    if sender == admin_email {
        session
            .selected_counterpart
            .clone()
            .ok_or(ChatError::NoRecipientSelected)
    } else {
        Ok(admin_email.clone())
    }
}
