//! Identifier newtypes

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backends hand out either string or integer primary keys
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }

        impl $name {
            /// Wrap an existing identifier
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string value
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
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique, immutable identifier of a lead
    LeadId
);

string_id!(
    /// Reference to a user who owns a lead
    UserId
);

impl LeadId {
    /// Mint a fresh ULID-based identifier for a locally created lead
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lead_ids_are_unique_ulids() {
        let a = LeadId::new();
        let b = LeadId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn test_transparent_serialization() {
        let id = LeadId::from("lead-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lead-42\"");
        let owner: UserId = serde_json::from_str("\"u-7\"").unwrap();
        assert_eq!(owner.to_string(), "u-7");
    }

    #[test]
    fn test_integer_keys_accepted() {
        let id: LeadId = serde_json::from_str("1042").unwrap();
        assert_eq!(id.as_str(), "1042");
    }
}
