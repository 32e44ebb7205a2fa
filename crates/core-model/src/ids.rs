use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking identifiers synthesized locally for optimistic creates.
///
/// The store never hands out ids with this prefix, so `is_temporary` is a
/// reliable test for "not yet confirmed by the remote store".
pub const TEMP_ID_PREFIX: &str = "tmp-";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh locally-unique identifier for an optimistic create.
            pub fn temporary() -> Self {
                Self(format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4()))
            }

            pub fn is_temporary(&self) -> bool {
                self.0.starts_with(TEMP_ID_PREFIX)
            }

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
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Opaque event identifier. Ordering is lexicographic on the raw string and
    /// is what the layout uses for stable stacking.
    EventId
);

opaque_id!(
    /// Opaque category identifier.
    CategoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_unique_and_flagged() {
        let a = EventId::temporary();
        let b = EventId::temporary();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(!EventId::from("9f1c").is_temporary());
        assert!(CategoryId::temporary().as_str().starts_with(TEMP_ID_PREFIX));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut ids = vec![EventId::from("b"), EventId::from("a10"), EventId::from("a2")];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(EventId::as_str).collect();
        assert_eq!(raw, ["a10", "a2", "b"]);
    }
}
