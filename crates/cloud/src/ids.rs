use std::fmt;

// Document ids are minted by the hosted store and treated as opaque strings.
// The macro keeps all wrappers structurally identical, so new collections stay predictable.
macro_rules! define_document_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_document_id!(UserId);
define_document_id!(SessionId);
define_document_id!(MessageId);
define_document_id!(GlobalMessageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_round_trip_through_serde_as_plain_strings() {
        let id = SessionId::new("abc-123");
        let serialized = serde_json::to_string(&id).expect("serialize session id");
        assert_eq!(serialized, "\"abc-123\"");

        let deserialized: SessionId =
            serde_json::from_str(&serialized).expect("deserialize session id");
        assert_eq!(deserialized, id);
        assert_eq!(deserialized.as_str(), "abc-123");
    }
}
