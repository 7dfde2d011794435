//! Live message stream.
//!
//! Pushes each newly appended message the viewer may currently see as an SSE
//! `message` event. The viewer's session is re-read for every message, so an
//! admin's stream follows their selection and the stream ends once the
//! client signs out or signs in as someone else. Clients that fall behind get
//! a `resync` event and should reload `/chat/messages`.
//!
//! Streams also end when graceful shutdown begins.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::middleware::{RequireAuth, load_client};
use crate::services::visibility::is_visible_to;
use crate::state::AppState;

/// GET /chat/events
pub async fn stream(
    State(state): State<AppState>,
    RequireAuth { email, session }: RequireAuth,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = session.id();
    let store = state.session_store().clone();
    let admin = state.admin_email().clone();
    let mut receiver = state.messages().subscribe();
    let mut shutdown = state.shutdown_signal();
    tracing::debug!(viewer = %email, "Event stream opened");

    let events = async_stream::stream! {
        // A session that was never stored cannot be followed.
        let Some(session_id) = session_id else {
            return;
        };

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let received = tokio::select! {
                received = receiver.recv() => received,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match received {
                Ok(message) => {
                    let client = match load_client(&store, session_id).await {
                        Ok(client) => client,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload session for event stream");
                            break;
                        }
                    };
                    let Some(client) = client.filter(|c| c.active_email.as_ref() == Some(&email))
                    else {
                        tracing::debug!(viewer = %email, "Viewer signed out, closing event stream");
                        break;
                    };

                    if !is_visible_to(&message, &client, &admin) {
                        continue;
                    }
                    match Event::default().event("message").json_data(&message) {
                        Ok(event) => yield Ok(event),
                        Err(e) => tracing::error!(error = %e, "Failed to encode message event"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(viewer = %email, skipped, "Event stream lagged");
                    yield Ok(Event::default().event("resync").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::debug!(viewer = %email, "Event stream closed");
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}
