//! Strongly Typed Identifiers
//!
//! Newtype wrappers around [`Uuid`] so a provider id can never be passed
//! where a login-session id is expected.
//!
//! # Example
//!
//! ```
//! use keygate_core::{LoginSessionId, ProviderId};
//!
//! let provider = ProviderId::new();
//! let session = LoginSessionId::new();
//!
//! fn requires_provider(id: ProviderId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_provider(provider);
//! // requires_provider(session); // This would not compile!
//! # let _ = (result, session);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Identifier of a stored SSO provider configuration.
    ///
    /// Generated once on creation and never changed afterwards.
    ProviderId
);

define_id!(
    /// Identifier of a pending browser login attempt.
    ///
    /// Travels in a short-lived cookie between the login redirect and the
    /// IdP callback.
    ///
    /// # Example
    ///
    /// ```
    /// use keygate_core::LoginSessionId;
    ///
    /// let id = LoginSessionId::new();
    /// let parsed: LoginSessionId = id.to_string().parse().unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    LoginSessionId
);
