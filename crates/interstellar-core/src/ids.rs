use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Player identifier. Players are identified by their display name.
    PlayerId
);

string_id!(
    /// Star system identifier (`system1`, `system2`, ...). Immutable once generated.
    SystemId
);

string_id!(
    /// Game identifier, the repository key of a game document.
    GameId
);

impl GameId {
    /// Fresh random game id.
    pub fn generate() -> Self {
        Self(format!("game-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl SystemId {
    /// Id of the `index`-th generated system (ids are 1-based).
    pub fn numbered(index: usize) -> Self {
        Self(format!("system{}", index + 1))
    }
}
