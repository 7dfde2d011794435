//! Credential store.
//!
//! Owns every [`UserRecord`], keyed by normalized email. The admin record is
//! seeded at construction and its email can never be claimed by registration.
//!
//! # Concurrency
//!
//! Handles are cheap to clone and share one table. Registration hashes the
//! password before taking the lock, then performs an insert-if-absent under a
//! single write lock, so two concurrent registrations of the same normalized
//! email produce exactly one record.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use rand::seq::IndexedRandom;

use switchboard_core::{AvatarRef, DEFAULT_AVATARS, Email};

use crate::models::UserRecord;
use crate::services::auth::{AuthError, hash_password, verify_password};

/// Fields the sign-up form requires, as shown to the user.
const SIGN_UP_FIELDS: &str = "Name, email, and password";

/// Hash checked when no record matches, so unknown emails cost the same
/// Argon2 work as known ones.
static UNMATCHED_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("switchboard-unmatched-login").ok());

/// Avatar to assign on registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarChoice {
    /// Pick one of [`DEFAULT_AVATARS`] at random.
    #[default]
    RandomDefault,
    /// Use a photo previously written to the upload directory.
    Uploaded(AvatarRef),
}

impl From<Option<AvatarRef>> for AvatarChoice {
    fn from(pending: Option<AvatarRef>) -> Self {
        pending.map_or(Self::RandomDefault, Self::Uploaded)
    }
}

/// Shared table of registered identities.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<RwLock<HashMap<Email, UserRecord>>>,
    admin_email: Email,
}

impl CredentialStore {
    /// Create a store seeded with the admin identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if the admin password cannot be hashed.
    pub fn with_admin(
        admin_email: Email,
        admin_name: &str,
        admin_password: &str,
    ) -> Result<Self, AuthError> {
        let admin = UserRecord {
            email: admin_email.clone(),
            password_hash: hash_password(admin_password)?,
            display_name: admin_name.to_owned(),
            avatar: AvatarRef::fallback(),
        };

        let mut users = HashMap::new();
        users.insert(admin_email.clone(), admin);

        Ok(Self {
            users: Arc::new(RwLock::new(users)),
            admin_email,
        })
    }

    /// The reserved admin identity.
    #[must_use]
    pub const fn admin_email(&self) -> &Email {
        &self.admin_email
    }

    /// Register a new identity.
    ///
    /// Validation runs in this order and nothing is written until it passes:
    /// email present, email well-formed, email not reserved, password and
    /// name present, email not taken.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingField` if email or name is blank or password is empty
    /// - `AuthError::InvalidEmail` if the email is malformed
    /// - `AuthError::EmailReserved` for the admin email
    /// - `AuthError::EmailTaken` if a record already exists
    /// - `AuthError::PasswordHash` if hashing fails
    pub fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        avatar: AvatarChoice,
    ) -> Result<UserRecord, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingField(SIGN_UP_FIELDS));
        }
        let email = Email::parse(email)?;

        if email == self.admin_email {
            return Err(AuthError::EmailReserved);
        }

        let display_name = display_name.trim();
        if password.is_empty() || display_name.is_empty() {
            return Err(AuthError::MissingField(SIGN_UP_FIELDS));
        }

        // Skip the expensive hash when the answer is already known. The
        // authoritative check is the insert below.
        if self.contains(&email) {
            return Err(AuthError::EmailTaken);
        }

        let record = UserRecord {
            password_hash: hash_password(password)?,
            display_name: display_name.to_owned(),
            avatar: match avatar {
                AvatarChoice::RandomDefault => random_default_avatar(),
                AvatarChoice::Uploaded(avatar) => avatar,
            },
            email,
        };

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.entry(record.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::EmailTaken),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Check a password against the stored hash.
    ///
    /// Unknown or malformed emails verify as `false` after running the same
    /// hash verification a known email would.
    #[must_use]
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let stored = Email::parse(email)
            .ok()
            .and_then(|email| self.read().get(&email).map(|r| r.password_hash.clone()));

        match stored {
            Some(hash) => verify_password(password, &hash).is_ok(),
            None => {
                if let Some(hash) = UNMATCHED_HASH.as_deref() {
                    let _ = verify_password(password, hash);
                }
                false
            }
        }
    }

    /// Look up a record by normalized email.
    #[must_use]
    pub fn lookup(&self, email: &Email) -> Option<UserRecord> {
        self.read().get(email).cloned()
    }

    /// Whether a record exists for `email`.
    #[must_use]
    pub fn contains(&self, email: &Email) -> bool {
        self.read().contains_key(email)
    }

    /// Snapshot of every registered record, admin included, in no
    /// particular order.
    #[must_use]
    pub fn registered_users(&self) -> Vec<UserRecord> {
        self.read().values().cloned().collect()
    }

    /// Number of records, admin included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty. Never true once seeded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Insert a previously persisted record during startup.
    ///
    /// Existing records (including the seeded admin) are never overwritten.
    /// Returns whether the record was inserted.
    pub fn restore(&self, record: UserRecord) -> bool {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.entry(record.email.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Email, UserRecord>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("admin_email", &self.admin_email)
            .field("users", &self.len())
            .finish_non_exhaustive()
    }
}

/// Pick one of the built-in avatars uniformly at random.
#[must_use]
pub fn random_default_avatar() -> AvatarRef {
    DEFAULT_AVATARS
        .choose(&mut rand::rng())
        .map_or_else(AvatarRef::fallback, |name| {
            AvatarRef::Default((*name).to_owned())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::with_admin(
            Email::parse("admin@x.com").unwrap(),
            "Admin",
            "admin-password",
        )
        .unwrap()
    }

    #[test]
    fn test_admin_is_seeded() {
        let store = store();
        assert_eq!(store.len(), 1);
        assert!(store.verify("admin@x.com", "admin-password"));
        assert!(store.verify(" ADMIN@x.com ", "admin-password"));
        assert_eq!(
            store.lookup(store.admin_email()).unwrap().display_name,
            "Admin"
        );
    }

    #[test]
    fn test_register_normalizes_and_stores() {
        let store = store();
        let record = store
            .register(" Alice@X.com ", "pw1234", " Alice ", AvatarChoice::RandomDefault)
            .unwrap();

        assert_eq!(record.email.as_str(), "alice@x.com");
        assert_eq!(record.display_name, "Alice");
        assert_ne!(record.password_hash, "pw1234");
        assert!(matches!(&record.avatar, AvatarRef::Default(name) if DEFAULT_AVATARS.contains(&name.as_str())));
        assert_eq!(store.len(), 2);
        assert!(store.verify("alice@x.com", "pw1234"));
        assert!(!store.verify("alice@x.com", "wrong"));
    }

    #[test]
    fn test_register_reserved_email_is_conflict() {
        let store = store();
        for variant in ["admin@x.com", "ADMIN@X.COM", "  Admin@x.com "] {
            let err = store
                .register(variant, "pw", "Mallory", AvatarChoice::RandomDefault)
                .unwrap_err();
            assert!(matches!(err, AuthError::EmailReserved));
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reserved_check_precedes_missing_fields() {
        let store = store();
        let err = store
            .register("admin@x.com", "", "", AvatarChoice::RandomDefault)
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailReserved));
    }

    #[test]
    fn test_register_duplicate_is_conflict() {
        let store = store();
        store
            .register("bob@x.com", "pw", "Bob", AvatarChoice::RandomDefault)
            .unwrap();
        let err = store
            .register("BOB@x.com", "other", "Robert", AvatarChoice::RandomDefault)
            .unwrap_err();

        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(store.len(), 2);
        assert_eq!(
            store
                .lookup(&Email::parse("bob@x.com").unwrap())
                .unwrap()
                .display_name,
            "Bob"
        );
    }

    #[test]
    fn test_register_missing_fields() {
        let store = store();
        for (email, password, name) in [
            ("", "pw", "Alice"),
            ("   ", "pw", "Alice"),
            ("alice@x.com", "", "Alice"),
            ("alice@x.com", "pw", "  "),
        ] {
            let err = store
                .register(email, password, name, AvatarChoice::RandomDefault)
                .unwrap_err();
            assert!(matches!(err, AuthError::MissingField(_)), "{email:?} {password:?} {name:?}");
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_whitespace_password_is_accepted_verbatim() {
        let store = store();
        store
            .register("erin@x.com", "   ", "Erin", AvatarChoice::RandomDefault)
            .unwrap();

        assert!(store.verify("erin@x.com", "   "));
        assert!(!store.verify("erin@x.com", ""));
        assert!(!store.verify("erin@x.com", " "));
    }

    #[test]
    fn test_register_invalid_email() {
        let store = store();
        let err = store
            .register("not-an-email", "pw", "Alice", AvatarChoice::RandomDefault)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
    }

    #[test]
    fn test_register_with_uploaded_avatar() {
        let store = store();
        let avatar = AvatarRef::uploaded("abc_me.png").unwrap();
        let record = store
            .register("carol@x.com", "pw", "Carol", AvatarChoice::Uploaded(avatar.clone()))
            .unwrap();
        assert_eq!(record.avatar, avatar);
    }

    #[test]
    fn test_verify_unknown_or_malformed() {
        let store = store();
        assert!(!store.verify("ghost@x.com", "pw"));
        assert!(!store.verify("not-an-email", "pw"));
        assert!(!store.verify("", ""));
        assert!(!store.verify("ghost@x.com", "switchboard-unmatched-login"));
    }

    #[test]
    fn test_unmatched_hash_is_a_real_argon2_hash() {
        let hash = UNMATCHED_HASH.as_deref().unwrap();
        assert!(argon2::PasswordHash::new(hash).is_ok());
        assert!(verify_password("switchboard-unmatched-login", hash).is_ok());
    }

    #[test]
    fn test_unknown_email_costs_a_hash_verification() {
        use std::time::{Duration, Instant};

        fn fastest(mut attempt: impl FnMut()) -> Duration {
            (0..3)
                .map(|_| {
                    let started = Instant::now();
                    attempt();
                    started.elapsed()
                })
                .min()
                .unwrap()
        }

        let store = store();
        // Build the fallback hash outside the timed section.
        LazyLock::force(&UNMATCHED_HASH);

        let known = fastest(|| assert!(!store.verify("admin@x.com", "wrong")));
        let unknown = fastest(|| assert!(!store.verify("ghost@x.com", "wrong")));
        let malformed = fastest(|| assert!(!store.verify("not-an-email", "wrong")));

        // Same order of magnitude, not a cheap early return.
        assert!(unknown * 10 > known, "known {known:?} unknown {unknown:?}");
        assert!(malformed * 10 > known, "known {known:?} malformed {malformed:?}");
    }

    #[test]
    fn test_restore_never_overwrites() {
        let store = store();
        let admin_hash = store.lookup(store.admin_email()).unwrap().password_hash;

        let imposter = UserRecord {
            email: Email::parse("admin@x.com").unwrap(),
            password_hash: "stolen".to_owned(),
            display_name: "Imposter".to_owned(),
            avatar: AvatarRef::fallback(),
        };
        assert!(!store.restore(imposter));
        assert_eq!(
            store.lookup(store.admin_email()).unwrap().password_hash,
            admin_hash
        );

        let dave = UserRecord {
            email: Email::parse("dave@x.com").unwrap(),
            password_hash: hash_password("pw").unwrap(),
            display_name: "Dave".to_owned(),
            avatar: AvatarRef::fallback(),
        };
        assert!(store.restore(dave));
        assert!(store.verify("dave@x.com", "pw"));
    }

    #[test]
    fn test_concurrent_registration_of_same_email() {
        const THREADS: usize = 8;

        let store = store();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    // Same identity in different spellings.
                    let email = if i % 2 == 0 { "race@x.com" } else { " RACE@x.com" };
                    barrier.wait();
                    store.register(email, "pw", &format!("Racer {i}"), AvatarChoice::RandomDefault)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::EmailTaken)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, THREADS - 1);
        assert_eq!(store.len(), 2);
    }
}
