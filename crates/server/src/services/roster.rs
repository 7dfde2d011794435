//! Roster builder.
//!
//! The admin's list of people to talk to: every registered non-admin user,
//! whether or not they have written yet, sorted by email. Everyone else gets
//! an empty roster.

use serde::Serialize;

use switchboard_core::Email;

use crate::models::{ClientSession, UserProfile};
use crate::services::credentials::CredentialStore;

/// One row in the admin's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Whether this user's conversation is the one currently open.
    pub selected: bool,
}

/// Build the roster for `session`.
#[must_use]
pub fn build_roster(
    credentials: &CredentialStore,
    session: &ClientSession,
    admin_email: &Email,
) -> Vec<RosterEntry> {
    if !session.is_admin(admin_email) {
        return Vec::new();
    }

    let mut roster: Vec<RosterEntry> = credentials
        .registered_users()
        .iter()
        .filter(|record| &record.email != admin_email)
        .map(|record| RosterEntry {
            profile: UserProfile::from(record),
            selected: session.selected_counterpart.as_ref() == Some(&record.email),
        })
        .collect();

    roster.sort_by(|a, b| a.profile.email.cmp(&b.profile.email));
    roster
}
