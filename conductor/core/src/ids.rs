//! Identifier Types
//!
//! String newtypes for every kind of key the output core reasons about.
//! They are opaque: the core never parses them, it only compares, hashes
//! and orders them.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from a string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Key of a configured output
    OutputId
);
string_id!(
    /// Key of an overlay in the overlay store
    OverlayId
);
string_id!(
    /// Key of a show
    ShowId
);
string_id!(
    /// Key of a layout inside a show
    LayoutId
);
string_id!(
    /// Key of a slide inside a show
    SlideId
);
string_id!(
    /// Key of a template
    TemplateId
);
string_id!(
    /// Key of an output style
    StyleId
);
string_id!(
    /// Key of an automation action
    ActionId
);
string_id!(
    /// Key of a show category
    CategoryId
);

/// Generate a short random key (11 hex characters)
#[must_use]
pub fn short_uid() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(11);
    id
}

impl OutputId {
    /// Generate a new unique output ID
    #[must_use]
    pub fn generate() -> Self {
        Self(short_uid())
    }
}

impl ShowId {
    /// Sentinel id for ad-hoc content that is not backed by a stored show
    pub const TEMP: &'static str = "temp";

    /// The ad-hoc content sentinel
    #[must_use]
    pub fn temp() -> Self {
        Self(Self::TEMP.to_string())
    }

    /// Whether this id is the ad-hoc content sentinel
    #[must_use]
    pub fn is_temp(&self) -> bool {
        self.0 == Self::TEMP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_id_generate_unique() {
        let a = OutputId::generate();
        let b = OutputId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 11);
    }

    #[test]
    fn test_temp_show_id() {
        assert!(ShowId::temp().is_temp());
        assert!(!ShowId::new("song").is_temp());
    }

    #[test]
    fn test_ids_serialize_transparent() {
        let id = OverlayId::new("logo");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"logo\"");
    }
}
