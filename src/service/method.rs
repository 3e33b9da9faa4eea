//! The fixed CRUD verb set every service exposes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six default service methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

impl Method {
    /// All verbs in registration order.
    pub const ALL: [Method; 6] = [
        Method::Find,
        Method::Get,
        Method::Create,
        Method::Update,
        Method::Patch,
        Method::Remove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Find => "find",
            Method::Get => "get",
            Method::Create => "create",
            Method::Update => "update",
            Method::Patch => "patch",
            Method::Remove => "remove",
        }
    }

    /// Verbs whose first argument is an identifier.
    pub fn takes_id(&self) -> bool {
        matches!(self, Method::Get | Method::Update | Method::Patch | Method::Remove)
    }

    /// Verbs that may target every record when the caller passes an explicit null id.
    pub fn allows_multi(&self) -> bool {
        matches!(self, Method::Update | Method::Patch | Method::Remove)
    }
}

/// Returns true if `name` is one of the six CRUD verb names.
pub fn is_crud_name(name: &str) -> bool {
    Method::ALL.iter().any(|m| m.as_str() == name)
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown verb name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}
