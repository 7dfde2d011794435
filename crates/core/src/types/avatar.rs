//! Avatar references.
//!
//! A user's avatar is either one of the built-in default images or a photo
//! uploaded at registration time. Only the file name is stored; the public
//! path is derived by [`AvatarRef::src`].

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Built-in default avatar images, served from `/avatars/`.
pub const DEFAULT_AVATARS: &[&str] = &[
    "avatar-amber.png",
    "avatar-blue.png",
    "avatar-green.png",
    "avatar-rose.png",
    "avatar-slate.png",
];

/// Avatar used when no user record can be resolved.
const FALLBACK_AVATAR: &str = "avatar-slate.png";

/// Maximum length of an uploaded file name.
const MAX_FILE_NAME_LENGTH: usize = 200;

/// Errors that can occur when building an [`AvatarRef`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarRefError {
    /// The name is not one of [`DEFAULT_AVATARS`].
    #[error("unknown default avatar: {0}")]
    UnknownDefault(String),
    /// The uploaded file name is empty, too long, or contains path components.
    #[error("invalid upload file name: {0}")]
    InvalidFileName(String),
    /// The stored form has no recognized `default:`/`upload:` prefix.
    #[error("unrecognized avatar reference: {0}")]
    Unrecognized(String),
}

/// Reference to a user's avatar image.
///
/// The stored form is `default:<name>` or `upload:<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AvatarRef {
    /// One of the built-in images in [`DEFAULT_AVATARS`].
    Default(String),
    /// A file previously written to the upload directory.
    Uploaded(String),
}

impl AvatarRef {
    /// Reference a built-in default avatar.
    ///
    /// # Errors
    ///
    /// Returns `AvatarRefError::UnknownDefault` if `name` is not in [`DEFAULT_AVATARS`].
    pub fn default_avatar(name: &str) -> Result<Self, AvatarRefError> {
        if DEFAULT_AVATARS.contains(&name) {
            Ok(Self::Default(name.to_owned()))
        } else {
            Err(AvatarRefError::UnknownDefault(name.to_owned()))
        }
    }

    /// Reference an uploaded file by its stored name.
    ///
    /// # Errors
    ///
    /// Returns `AvatarRefError::InvalidFileName` if the name is empty, too long,
    /// or could escape the upload directory.
    pub fn uploaded(file_name: &str) -> Result<Self, AvatarRefError> {
        let valid = !file_name.is_empty()
            && file_name.len() <= MAX_FILE_NAME_LENGTH
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(Self::Uploaded(file_name.to_owned()))
        } else {
            Err(AvatarRefError::InvalidFileName(file_name.to_owned()))
        }
    }

    /// The avatar shown for anonymous viewers and unresolvable records.
    #[must_use]
    pub fn fallback() -> Self {
        Self::Default(FALLBACK_AVATAR.to_owned())
    }

    /// Public URL path of the image.
    #[must_use]
    pub fn src(&self) -> String {
        match self {
            Self::Default(name) => format!("/avatars/{name}"),
            Self::Uploaded(file) => format!("/uploads/{file}"),
        }
    }

    /// Whether this is an uploaded photo.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }
}

impl Default for AvatarRef {
    fn default() -> Self {
        Self::fallback()
    }
}

impl fmt::Display for AvatarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(name) => write!(f, "default:{name}"),
            Self::Uploaded(file) => write!(f, "upload:{file}"),
        }
    }
}

impl FromStr for AvatarRef {
    type Err = AvatarRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("default:") {
            Self::default_avatar(name)
        } else if let Some(file) = s.strip_prefix("upload:") {
            Self::uploaded(file)
        } else {
            Err(AvatarRefError::Unrecognized(s.to_owned()))
        }
    }
}

impl Serialize for AvatarRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AvatarRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
