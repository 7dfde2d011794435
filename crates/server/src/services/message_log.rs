//! Append-only global message log.
//!
//! Every conversation lives in one log ordered by insertion. Appends assign
//! the next 1-based [`MessageId`] and the timestamp under the write lock, so
//! ids are gap-free and match log order. Readers get cloned snapshots.
//!
//! Live subscribers are notified through a broadcast channel after the lock
//! is released. They only learn that something was appended; views are
//! always recomputed from the log itself.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;

use switchboard_core::MessageId;

use crate::models::{Message, NewMessage};

/// Buffered notifications per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Shared handle to the message log.
#[derive(Clone)]
pub struct MessageLog {
    messages: Arc<RwLock<Vec<Message>>>,
    events: broadcast::Sender<Message>,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// Append a message and return it with its id and timestamp.
    pub fn append(&self, new: NewMessage) -> Message {
        self.append_with(new, |_| {})
    }

    /// Append a message, running `on_append` while the write lock is still
    /// held.
    ///
    /// Hooks therefore observe messages in id order, even under concurrent
    /// appends. `on_append` must not block or touch this log.
    pub fn append_with(&self, new: NewMessage, on_append: impl FnOnce(&Message)) -> Message {
        let message = {
            let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
            let message = Message {
                id: next_id(messages.len()),
                sender: new.sender,
                receiver: new.receiver,
                content: new.content,
                sent_at: Utc::now(),
                read: false,
                attachment: new.attachment,
            };
            on_append(&message);
            messages.push(message.clone());
            message
        };

        // No receivers is fine.
        let _ = self.events.send(message.clone());
        message
    }

    /// Insert a previously persisted message during startup.
    ///
    /// The message keeps its content and timestamp but is renumbered to its
    /// position in this log. Subscribers are not notified.
    pub fn restore(&self, message: Message) -> Message {
        let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        let message = Message {
            id: next_id(messages.len()),
            ..message
        };
        messages.push(message.clone());
        message
    }

    /// Snapshot of every message in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<Message> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the messages matching `predicate`, in insertion order.
    #[must_use]
    pub fn filtered(&self, predicate: impl Fn(&Message) -> bool) -> Vec<Message> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    /// Number of messages in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to messages appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLog")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Id for the message stored after `len` existing ones.
fn next_id(len: usize) -> MessageId {
    // A Vec cannot hold more than isize::MAX elements.
    MessageId::new(i64::try_from(len).unwrap_or(i64::MAX).saturating_add(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use switchboard_core::Email;

    use super::*;

    fn new_message(sender: &str, receiver: &str, content: &str) -> NewMessage {
        NewMessage {
            sender: Email::parse(sender).unwrap(),
            receiver: Email::parse(receiver).unwrap(),
            content: content.to_owned(),
            attachment: None,
        }
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let log = MessageLog::new();
        assert!(log.is_empty());

        let first = log.append(new_message("alice@x.com", "admin@x.com", "one"));
        let second = log.append(new_message("admin@x.com", "alice@x.com", "two"));

        assert_eq!(first.id, MessageId::new(1));
        assert_eq!(second.id, MessageId::new(2));
        assert!(!first.read);
        assert!(first.sent_at <= second.sent_at);

        let all = log.all();
        assert_eq!(all, vec![first, second]);
    }

    #[test]
    fn test_restore_renumbers_without_notifying() {
        let log = MessageLog::new();
        let mut rx = log.subscribe();

        let stored = Message {
            id: MessageId::new(41),
            sender: Email::parse("alice@x.com").unwrap(),
            receiver: Email::parse("admin@x.com").unwrap(),
            content: "from last week".to_owned(),
            sent_at: Utc::now(),
            read: true,
            attachment: None,
        };
        let restored = log.restore(stored.clone());

        assert_eq!(restored.id, MessageId::new(1));
        assert_eq!(restored.content, stored.content);
        assert_eq!(restored.sent_at, stored.sent_at);
        assert!(restored.read);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_filtered_keeps_order() {
        let log = MessageLog::new();
        log.append(new_message("alice@x.com", "admin@x.com", "a1"));
        log.append(new_message("bob@x.com", "admin@x.com", "b1"));
        log.append(new_message("admin@x.com", "alice@x.com", "a2"));

        let alice = Email::parse("alice@x.com").unwrap();
        let contents: Vec<String> = log
            .filtered(|m| m.involves(&alice))
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_appends() {
        let log = MessageLog::new();
        let mut rx = log.subscribe();

        let appended = log.append(new_message("alice@x.com", "admin@x.com", "hello"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received, appended);
    }

    #[test]
    fn test_append_hooks_run_in_id_order_under_contention() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let log = MessageLog::new();
        let seen = std::sync::Mutex::new(Vec::new());
        thread::scope(|scope| {
            for t in 0..THREADS {
                let (log, seen) = (&log, &seen);
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        log.append_with(
                            new_message("alice@x.com", "admin@x.com", &format!("{t}-{i}")),
                            |m| seen.lock().unwrap().push(m.id),
                        );
                    }
                });
            }
        });

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), THREADS * PER_THREAD);
        for (position, id) in seen.iter().enumerate() {
            assert_eq!(*id, next_id(position));
        }
    }

    #[test]
    fn test_concurrent_appends_keep_ids_unique_and_ordered() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let log = MessageLog::new();
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let log = log.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        log.append(new_message(
                            "alice@x.com",
                            "admin@x.com",
                            &format!("{t}-{i}"),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let all = log.all();
        assert_eq!(all.len(), THREADS * PER_THREAD);
        for (position, message) in all.iter().enumerate() {
            assert_eq!(message.id, next_id(position));
        }
    }
}
