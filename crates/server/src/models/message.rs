//! Message domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use switchboard_core::{Email, MessageId};

/// An entry in the global message log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 1-based position in the log.
    pub id: MessageId,
    pub sender: Email,
    pub receiver: Email,
    /// Trimmed, never empty.
    pub content: String,
    pub sent_at: DateTime<Utc>,
    /// Stored but never interpreted.
    pub read: bool,
    pub attachment: Option<String>,
}

impl Message {
    /// Whether this message was exchanged between `a` and `b`, in either direction.
    #[must_use]
    pub fn is_between(&self, a: &Email, b: &Email) -> bool {
        (&self.sender == a && &self.receiver == b) || (&self.sender == b && &self.receiver == a)
    }

    /// Whether `email` sent or received this message.
    #[must_use]
    pub fn involves(&self, email: &Email) -> bool {
        &self.sender == email || &self.receiver == email
    }
}

/// A message about to be appended. The log assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: Email,
    pub receiver: Email,
    pub content: String,
    pub attachment: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(sender: &str, receiver: &str) -> Message {
        Message {
            id: MessageId::new(1),
            sender: Email::parse(sender).unwrap(),
            receiver: Email::parse(receiver).unwrap(),
            content: "hi".to_owned(),
            sent_at: Utc::now(),
            read: false,
            attachment: None,
        }
    }

    #[test]
    fn test_is_between_ignores_direction() {
        let admin = Email::parse("admin@x.com").unwrap();
        let alice = Email::parse("alice@x.com").unwrap();
        let bob = Email::parse("bob@x.com").unwrap();

        let m = message("alice@x.com", "admin@x.com");
        assert!(m.is_between(&admin, &alice));
        assert!(m.is_between(&alice, &admin));
        assert!(!m.is_between(&admin, &bob));
        assert!(m.involves(&alice));
        assert!(!m.involves(&bob));
    }

    #[test]
    fn test_sent_at_serializes_as_rfc3339() {
        let m = message("alice@x.com", "admin@x.com");
        let json = serde_json::to_value(&m).unwrap();
        let sent_at = json["sent_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(sent_at).is_ok());
        assert_eq!(json["id"], 1);
    }
}
