use serde::{Deserialize, Serialize};

pub const DEFAULT_OWNER: &str = "local";

/// The account on whose behalf an operation runs. Every stored record is
/// scoped to an owner; the session is passed explicitly to each call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    owner: String,
}

impl Session {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_OWNER)
    }
}
