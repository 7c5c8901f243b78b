//! ChannelId - identifier of one downstream viewer connection

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an output channel.
///
/// Generated when a viewer connects; never reused.
///
/// # Examples
/// ```
/// use contracts::ChannelId;
///
/// let a = ChannelId::generate();
/// let b = ChannelId::generate();
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Generate a fresh random id (UUID v4)
    #[inline]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ChannelId {
    #[inline]
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}
