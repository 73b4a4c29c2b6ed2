//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PointId` where a `CurrencyId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(ActorId, "Unique identifier for an authenticated actor.");
typed_id!(PointId, "Unique identifier for a point of attention.");
typed_id!(CurrencyId, "Unique identifier for a currency in the catalog.");
typed_id!(MovementId, "Unique identifier for a movement ledger entry.");
typed_id!(CashCloseId, "Unique identifier for a cash-close session.");
typed_id!(ReferenceId, "Identifier of the business operation a movement supports.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_ids_use_v7() {
        let id = MovementId::new();
        assert_eq!(id.into_inner().get_version_num(), 7);
        assert_ne!(id, MovementId::new());
    }

    #[test]
    fn test_round_trip_through_string() {
        let id = PointId::new();
        let parsed = PointId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(CurrencyId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_serializes_transparently() {
        let uuid = Uuid::nil();
        let json = serde_json::to_string(&CashCloseId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
