//! Access modes checked at the access-mode level of the scope hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access mode, ordered `NoAccess < ReadAccess < ReadWriteAccess`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Access {
    #[default]
    NoAccess,
    ReadAccess,
    ReadWriteAccess,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::NoAccess => "NO_ACCESS",
            Access::ReadAccess => "READ_ACCESS",
            Access::ReadWriteAccess => "READ_WRITE_ACCESS",
        }
    }

    /// Whether a grant of `self` satisfies a request for `requested`
    pub fn satisfies(&self, requested: Access) -> bool {
        *self >= requested
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NO_ACCESS" => Ok(Access::NoAccess),
            "READ" | "READ_ACCESS" => Ok(Access::ReadAccess),
            "READ_WRITE" | "READ_WRITE_ACCESS" => Ok(Access::ReadWriteAccess),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}
