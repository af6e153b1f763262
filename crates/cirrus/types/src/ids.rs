//! Strongly-typed identifiers for remote control-plane entities
//!
//! The remote system owns every identifier; Cirrus never mints them. The
//! newtypes only keep a scope id from being passed where a plan id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
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
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

remote_id!(
    /// Identifier of a deployment scope (an `org > space` placement)
    ScopeId
);

remote_id!(
    /// Identifier of a service instance
    ServiceInstanceId
);

remote_id!(
    /// Identifier of a service plan
    PlanId
);

remote_id!(
    /// Identifier of a service catalog offering
    ServiceId
);
