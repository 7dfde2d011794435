//! Chat service.
//!
//! Composes the credential store, message log, router, and derived views
//! into the operations the chat surface calls: send, select, and read the
//! conversation.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use switchboard_core::{AvatarRef, Email, Notification};

use crate::db::persistence::WriteBehind;
use crate::error::ErrorKind;
use crate::models::{ClientSession, Message, NewMessage, UserProfile};
use crate::services::credentials::CredentialStore;
use crate::services::identity::{self, ViewerProfile};
use crate::services::message_log::MessageLog;
use crate::services::roster::{RosterEntry, build_roster};
use crate::services::routing::resolve_receiver;
use crate::services::visibility::visible_messages;

/// Partner header shown to the admin before a conversation is opened.
const NO_SELECTION_TITLE: &str = "Select a User to Chat";

/// Partner header for a selection with no matching record.
const UNKNOWN_USER: &str = "Unknown User";

/// Errors that can occur during chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The session has no signed-in identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Message content was blank after trimming.
    #[error("message content is empty")]
    EmptyContent,

    /// A non-admin attempted an admin-only action.
    #[error("admin only")]
    AdminOnly,

    /// The admin tried to send with no conversation open.
    #[error("no recipient selected")]
    NoRecipientSelected,

    /// The admin tried to open a conversation with someone who is not a
    /// registered user.
    #[error("unknown counterpart: {0}")]
    UnknownCounterpart(String),
}

impl ChatError {
    /// Taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyContent | Self::UnknownCounterpart(_) => ErrorKind::Validation,
            Self::NotAuthenticated => ErrorKind::Auth,
            Self::AdminOnly => ErrorKind::Authorization,
            Self::NoRecipientSelected => ErrorKind::State,
        }
    }

    /// Message shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "You must be logged in to send messages.".to_owned(),
            Self::EmptyContent => "Message content cannot be empty.".to_owned(),
            Self::AdminOnly => "This action is available for admins only.".to_owned(),
            Self::NoRecipientSelected => {
                "Admin: Please select a user to send a message to.".to_owned()
            }
            Self::UnknownCounterpart(email) => format!("No registered user with email {email}."),
        }
    }

    /// The error as a user-facing notification. Empty content is only a
    /// warning; everything else is an error.
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            Self::EmptyContent => Notification::warning(self.user_message()),
            _ => Notification::error(self.user_message()),
        }
    }
}

/// Header describing who the viewer is talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerHeader {
    /// `None` when the admin has nothing selected.
    pub email: Option<Email>,
    pub display_name: String,
    pub avatar: String,
}

/// Everything the chat surface shows, derived from current state.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub viewer: ViewerProfile,
    pub partner: PartnerHeader,
    pub roster: Vec<RosterEntry>,
    pub messages: Vec<Message>,
}

/// Chat service.
pub struct ChatService<'a> {
    credentials: &'a CredentialStore,
    log: &'a MessageLog,
    writer: &'a WriteBehind,
}

impl<'a> ChatService<'a> {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(
        credentials: &'a CredentialStore,
        log: &'a MessageLog,
        writer: &'a WriteBehind,
    ) -> Self {
        Self {
            credentials,
            log,
            writer,
        }
    }

    /// Send a message from the session's identity.
    ///
    /// Users always write to the admin; the admin writes to the selected user.
    /// Nothing is appended on error.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotAuthenticated` for an anonymous session
    /// - `ChatError::EmptyContent` if `content` is blank
    /// - `ChatError::NoRecipientSelected` for the admin with nothing selected
    #[instrument(skip(self, session, content), fields(sender = tracing::field::Empty))]
    pub fn send_message(
        &self,
        session: &ClientSession,
        content: &str,
    ) -> Result<Message, ChatError> {
        let sender = session
            .active_email
            .clone()
            .ok_or(ChatError::NotAuthenticated)?;
        tracing::Span::current().record("sender", sender.as_str());

        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }

        let receiver = resolve_receiver(session, self.credentials.admin_email())?;
        debug_assert_ne!(sender, receiver, "router produced a self-addressed message");

        // Enqueue under the log lock so the database sees log order.
        let message = self.log.append_with(
            NewMessage {
                sender,
                receiver,
                content: content.to_owned(),
                attachment: None,
            },
            |message| self.writer.message(message),
        );

        tracing::info!(id = %message.id, receiver = %message.receiver, "Message sent");
        Ok(message)
    }

    /// Open the admin's conversation with `email`.
    ///
    /// The selection stays until the admin picks someone else or signs out.
    ///
    /// # Errors
    ///
    /// - `ChatError::AdminOnly` unless the session belongs to the admin
    /// - `ChatError::UnknownCounterpart` unless `email` names a registered
    ///   non-admin user
    #[instrument(skip(self, session))]
    pub fn select_counterpart(
        &self,
        session: &mut ClientSession,
        email: &str,
    ) -> Result<Notification, ChatError> {
        let admin_email = self.credentials.admin_email();
        if !session.is_admin(admin_email) {
            return Err(ChatError::AdminOnly);
        }

        let unknown = || ChatError::UnknownCounterpart(email.trim().to_owned());
        let counterpart = Email::parse(email).map_err(|_| unknown())?;
        if &counterpart == admin_email {
            return Err(unknown());
        }
        let record = self.credentials.lookup(&counterpart).ok_or_else(unknown)?;

        session.selected_counterpart = Some(counterpart);
        Ok(Notification::info(format!(
            "Opened chat with {}",
            record.display_name
        )))
    }

    /// Messages visible to `session`, in log order.
    #[must_use]
    pub fn visible_messages(&self, session: &ClientSession) -> Vec<Message> {
        visible_messages(self.log, session, self.credentials.admin_email())
    }

    /// Roster for `session`. Empty unless the session belongs to the admin.
    #[must_use]
    pub fn roster(&self, session: &ClientSession) -> Vec<RosterEntry> {
        build_roster(self.credentials, session, self.credentials.admin_email())
    }

    /// Who `session` is talking to.
    #[must_use]
    pub fn partner(&self, session: &ClientSession) -> PartnerHeader {
        let admin_email = self.credentials.admin_email();

        if session.is_admin(admin_email) {
            return match &session.selected_counterpart {
                None => PartnerHeader {
                    email: None,
                    display_name: NO_SELECTION_TITLE.to_owned(),
                    avatar: AvatarRef::fallback().src(),
                },
                Some(selected) => self.credentials.lookup(selected).map_or_else(
                    || PartnerHeader {
                        email: Some(selected.clone()),
                        display_name: UNKNOWN_USER.to_owned(),
                        avatar: AvatarRef::fallback().src(),
                    },
                    |record| header(&UserProfile::from(&record)),
                ),
            };
        }

        self.credentials.lookup(admin_email).map_or_else(
            || PartnerHeader {
                email: Some(admin_email.clone()),
                display_name: UNKNOWN_USER.to_owned(),
                avatar: AvatarRef::fallback().src(),
            },
            |record| header(&UserProfile::from(&record)),
        )
    }

    /// The full chat surface for `session`.
    #[must_use]
    pub fn conversation(&self, session: &ClientSession) -> ConversationView {
        ConversationView {
            viewer: identity::viewer(self.credentials, session),
            partner: self.partner(session),
            roster: self.roster(session),
            messages: self.visible_messages(session),
        }
    }
}

fn header(profile: &UserProfile) -> PartnerHeader {
    PartnerHeader {
        email: Some(profile.email.clone()),
        display_name: profile.display_name.clone(),
        avatar: profile.avatar.clone(),
    }
}
