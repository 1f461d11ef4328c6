//! Identity attached to an identified connection.

use chrono::{DateTime, Utc};
use duet_proto::PresenceEntry;

use super::ConnectionId;

/// Display name and activity time of one identified connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPresence {
    pub id: ConnectionId,
    pub username: String,
    pub last_active: DateTime<Utc>,
}

impl UserPresence {
    pub fn new(id: ConnectionId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            last_active: Utc::now(),
        }
    }

    /// Wire form sent inside `presence` events.
    pub fn to_entry(&self) -> PresenceEntry {
        PresenceEntry {
            username: self.username.clone(),
            last_active: self.last_active.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_uses_epoch_millis() {
        let presence = UserPresence {
            id: ConnectionId::from_raw(1),
            username: "alice".into(),
            last_active: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        };
        let entry = presence.to_entry();
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.last_active, 1_700_000_000_123);
    }
}
