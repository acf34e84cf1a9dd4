// Strong Types - newtype identifiers for users, content, comments and follow requests
// Every id is a 64-bit value minted by the IdGenerator, so ids sort in creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a transparent `i64` newtype id with the usual conversions.
macro_rules! strong_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw id value
            pub fn value(self) -> i64 {
                self.0
            }

            /// Generated ids are always positive
            pub fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

strong_id!(
    /// Identifier of a user account
    UserId
);
strong_id!(
    /// Identifier of a post, event or project
    ContentId
);
strong_id!(
    /// Identifier of a comment embedded in a content item
    CommentId
);
strong_id!(
    /// Identifier of a follow request embedded in the target user's document
    RequestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_operations() {
        let id = UserId::new(123);
        assert_eq!(id.value(), 123);
        assert!(id.is_valid());
        assert!(!ContentId::new(-1).is_valid());
        assert_eq!("42".parse::<RequestId>().unwrap(), RequestId(42));
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&CommentId(9)).unwrap();
        assert_eq!(json, "9");
        let back: CommentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CommentId(9));
    }
}
