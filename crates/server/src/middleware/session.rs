//! Session middleware configuration.
//!
//! Sessions live in process memory; they are not persisted across restarts.

use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer, SessionStore, session::Id,
    session_store::Error as StoreError,
};

use crate::config::ServerConfig;
use crate::models::{ClientSession, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sb_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over the shared in-memory `store`.
#[must_use]
pub fn create_session_layer(
    store: MemoryStore,
    config: &ServerConfig,
) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Read a client's current state straight from `store`.
///
/// Unlike a request's `Session`, which caches what it loaded, this sees
/// changes made by later requests. Returns `None` once the session has been
/// deleted or expired, or when its state is unreadable.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn load_client(store: &MemoryStore, id: Id) -> Result<Option<ClientSession>, StoreError> {
    let Some(record) = store.load(&id).await? else {
        return Ok(None);
    };

    Ok(record
        .data
        .get(session_keys::CLIENT_SESSION)
        .and_then(|value| serde_json::from_value(value.clone()).ok()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::session::Record;

    use switchboard_core::Email;

    use super::*;

    fn record(id: Id, client: Option<&ClientSession>) -> Record {
        let mut data = HashMap::new();
        if let Some(client) = client {
            data.insert(
                session_keys::CLIENT_SESSION.to_owned(),
                serde_json::to_value(client).unwrap(),
            );
        }
        Record {
            id,
            data,
            expiry_date: tower_sessions::cookie::time::OffsetDateTime::now_utc()
                + tower_sessions::cookie::time::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_load_client_sees_latest_state() {
        let store = MemoryStore::default();
        let id = Id::default();

        assert_eq!(load_client(&store, id).await.unwrap(), None);

        let alice = ClientSession::authenticated(Email::parse("alice@x.com").unwrap());
        store.save(&record(id, Some(&alice))).await.unwrap();
        assert_eq!(load_client(&store, id).await.unwrap(), Some(alice));

        store.save(&record(id, None)).await.unwrap();
        assert_eq!(load_client(&store, id).await.unwrap(), None);

        store.delete(&id).await.unwrap();
        assert_eq!(load_client(&store, id).await.unwrap(), None);
    }
}
