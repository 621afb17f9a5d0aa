use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TEMP_PREFIX: &str = "temp-";

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Server-assigned task identifier, or a local `temp-*` placeholder
    /// while a create is in flight.
    TaskId
);
entity_id!(
    /// Section identifier. Shares the `temp-*` placeholder convention
    /// with [`TaskId`].
    SectionId
);
entity_id!(ProjectId);
entity_id!(UserId);

impl TaskId {
    /// Mint a local placeholder id for an optimistically created task.
    pub fn temp() -> Self {
        Self(format!("{TEMP_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }
}

impl SectionId {
    pub fn temp() -> Self {
        Self(format!("{TEMP_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_unique_and_recognizable() {
        let a = TaskId::temp();
        let b = TaskId::temp();

        assert_ne!(a, b);
        assert!(a.is_temp());
        assert!(b.is_temp());
        assert!(!TaskId::from("srv-42").is_temp());
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = TaskId::from("srv-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""srv-42""#);

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
