//! Result of a state-changing action.

use serde::{Deserialize, Serialize};

use switchboard_core::{Notification, Redirect};

/// Answer to every state-changing call: a notification for the user and,
/// optionally, a surface to navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub notification: Notification,
    #[serde(with = "redirect_path", default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

impl ActionResponse {
    /// A notification with no navigation.
    #[must_use]
    pub const fn notify(notification: Notification) -> Self {
        Self {
            notification,
            redirect: None,
        }
    }

    /// A notification followed by navigation to `redirect`.
    #[must_use]
    pub const fn redirect(notification: Notification, redirect: Redirect) -> Self {
        Self {
            notification,
            redirect: Some(redirect),
        }
    }
}

/// Serializes redirects as their URL path (`"/chat"`), which is what the
/// browser side navigates to.
mod redirect_path {
    use serde::{Deserialize, Deserializer, Serializer};

    use switchboard_core::Redirect;

    #[allow(clippy::ref_option)] // signature required by `serde(with)`
    pub fn serialize<S: Serializer>(
        redirect: &Option<Redirect>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match redirect {
            Some(r) => serializer.serialize_some(r.path()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Redirect>, D::Error> {
        let path = Option::<String>::deserialize(deserializer)?;
        match path.as_deref() {
            None => Ok(None),
            Some("/chat") => Ok(Some(Redirect::Chat)),
            Some("/login") => Ok(Some(Redirect::Login)),
            Some(other) => Err(serde::de::Error::custom(format!(
                "unknown redirect target: {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_serialized_as_path() {
        let response =
            ActionResponse::redirect(Notification::success("Welcome back, Alice!"), Redirect::Chat);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["redirect"], "/chat");
        assert_eq!(json["notification"]["severity"], "success");

        let parsed: ActionResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_missing_redirect_is_omitted() {
        let response = ActionResponse::notify(Notification::info("Opened chat with Bob"));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("redirect").is_none());
    }
}
