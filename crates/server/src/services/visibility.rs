//! Visibility filter.
//!
//! Derives the messages a session may see from the full log:
//!
//! | Viewer | Visible |
//! |---|---|
//! | anonymous | nothing |
//! | admin, nothing selected | nothing |
//! | admin, user `C` selected | messages between admin and `C` |
//! | user `U` | messages between `U` and admin |
//!
//! Results keep log order and are recomputed on every call.

use switchboard_core::Email;

use crate::models::{ClientSession, Message};
use crate::services::message_log::MessageLog;

/// Whether `session` may see `message`.
#[must_use]
pub fn is_visible_to(message: &Message, session: &ClientSession, admin_email: &Email) -> bool {
    let Some(viewer) = session.active_email.as_ref() else {
        return false;
    };

    if viewer == admin_email {
        session
            .selected_counterpart
            .as_ref()
            .is_some_and(|counterpart| message.is_between(admin_email, counterpart))
    } else {
        message.is_between(viewer, admin_email)
    }
}

/// Every message in `log` visible to `session`, in log order.
#[must_use]
pub fn visible_messages(
    log: &MessageLog,
    session: &ClientSession,
    admin_email: &Email,
) -> Vec<Message> {
    if !session.is_authenticated() {
        return Vec::new();
    }
    log.filtered(|message| is_visible_to(message, session, admin_email))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::NewMessage;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn send(log: &MessageLog, from: &str, to: &str, content: &str) {
        log.append(NewMessage {
            sender: email(from),
            receiver: email(to),
            content: content.to_owned(),
            attachment: None,
        });
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    /// A, B and the admin talking, interleaved.
    fn interleaved_log() -> MessageLog {
        let log = MessageLog::new();
        send(&log, "a@x.com", "admin@x.com", "a1");
        send(&log, "b@x.com", "admin@x.com", "b1");
        send(&log, "admin@x.com", "a@x.com", "a2");
        send(&log, "admin@x.com", "b@x.com", "b2");
        send(&log, "a@x.com", "admin@x.com", "a3");
        log
    }

    #[test]
    fn test_interleaved_threads_are_separated() {
        let admin = email("admin@x.com");
        let log = interleaved_log();

        let a = ClientSession::authenticated(email("a@x.com"));
        assert_eq!(contents(&visible_messages(&log, &a, &admin)), ["a1", "a2", "a3"]);

        let b = ClientSession::authenticated(email("b@x.com"));
        assert_eq!(contents(&visible_messages(&log, &b, &admin)), ["b1", "b2"]);

        let mut admin_session = ClientSession::authenticated(admin.clone());
        assert!(visible_messages(&log, &admin_session, &admin).is_empty());

        admin_session.selected_counterpart = Some(email("a@x.com"));
        assert_eq!(
            contents(&visible_messages(&log, &admin_session, &admin)),
            ["a1", "a2", "a3"]
        );

        admin_session.selected_counterpart = Some(email("b@x.com"));
        assert_eq!(
            contents(&visible_messages(&log, &admin_session, &admin)),
            ["b1", "b2"]
        );
    }

    #[test]
    fn test_anonymous_sees_nothing() {
        let admin = email("admin@x.com");
        let log = interleaved_log();
        assert!(visible_messages(&log, &ClientSession::default(), &admin).is_empty());
    }

    #[test]
    fn test_reads_are_idempotent() {
        let admin = email("admin@x.com");
        let log = interleaved_log();
        let a = ClientSession::authenticated(email("a@x.com"));

        let first = visible_messages(&log, &a, &admin);
        let second = visible_messages(&log, &a, &admin);
        assert_eq!(first, second);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_user_never_sees_other_users() {
        let admin = email("admin@x.com");
        let log = interleaved_log();
        let a = ClientSession::authenticated(email("a@x.com"));
        let b_email = email("b@x.com");

        for message in visible_messages(&log, &a, &admin) {
            assert!(!message.involves(&b_email));
            assert!(message.involves(&admin));
        }
    }
}
