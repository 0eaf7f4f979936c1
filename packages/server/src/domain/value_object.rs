//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity. Each constructor enforces
//! the length bounds accepted on the wire, so anything that reaches the
//! coordinator is already valid.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Maximum length of a room key (characters)
pub const ROOM_KEY_MAX_LEN: usize = 128;
/// Maximum length of a client id (characters)
pub const CLIENT_ID_MAX_LEN: usize = 128;
/// Maximum length of a display name (characters)
pub const DISPLAY_NAME_MAX_LEN: usize = 64;
/// Maximum length of a chat message (characters)
pub const CHAT_TEXT_MAX_LEN: usize = 2000;
/// Maximum length of a pinned memory entry (characters)
pub const MEMORY_TEXT_MAX_LEN: usize = 500;

/// Validate that `value` holds between 1 and `max` characters.
fn check_len(
    value: &str,
    max: usize,
    field: &'static str,
) -> Result<(), ValueObjectError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValueObjectError::Empty { field });
    }
    if len > max {
        return Err(ValueObjectError::TooLong {
            field,
            max,
            actual: len,
        });
    }
    Ok(())
}

macro_rules! bounded_string {
    ($(#[$meta:meta])* $name:ident, $max:expr, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new value, validating its length.
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                check_len(&value, $max, $field)?;
                Ok(Self(value))
            }

            /// Get the inner string value.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to owned String.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

bounded_string!(
    /// Room key value object.
    ///
    /// Opaque and case-sensitive; used directly as the persistence partition key.
    RoomKey,
    ROOM_KEY_MAX_LEN,
    "room key"
);

bounded_string!(
    /// Client identifier value object.
    ///
    /// Supplied by the client in the `hello` handshake. Not authenticated.
    ClientId,
    CLIENT_ID_MAX_LEN,
    "client id"
);

bounded_string!(
    /// Display name of a chat author.
    DisplayName,
    DISPLAY_NAME_MAX_LEN,
    "user"
);

bounded_string!(
    /// Chat message text.
    ChatText,
    CHAT_TEXT_MAX_LEN,
    "text"
);

bounded_string!(
    /// Text of a pinned memory note or todo.
    MemoryText,
    MEMORY_TEXT_MAX_LEN,
    "memory text"
);

impl DisplayName {
    /// Author name used for AI replies.
    pub fn ai() -> Self {
        Self("AI".to_string())
    }

    /// Author name used for system notices.
    pub fn system() -> Self {
        Self("System".to_string())
    }
}

/// Connection identifier value object.
///
/// Locally unique per socket; never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Generate a fresh random connection id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object (Unix milliseconds, UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `self` until `later` (negative if `later` is earlier).
    pub fn millis_until(&self, later: Timestamp) -> i64 {
        later.0 - self.0
    }

    /// Timestamp `millis` after `self`.
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}
