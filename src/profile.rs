//! User identity: the gate predicate and the persisted profile record.

use crate::logging;
use crate::models::UserProfile;
use crate::storage::{PROFILE_RECORD, Storage};

/// Whether a visitor may send chat messages.
///
/// Pure predicate: true iff a profile exists and its display name is
/// non-empty after trimming. Anonymous visitors are routed to the profile
/// entry UI instead.
#[must_use]
pub fn can_send(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| !p.display_name.trim().is_empty())
}

/// Loads and saves the identity record.
pub struct ProfileStore {
    storage: Box<dyn Storage>,
}

impl ProfileStore {
    #[must_use]
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Load the persisted profile. Absent or unreadable records both yield
    /// `None`; a corrupt record is logged and treated as anonymous.
    #[must_use]
    pub fn load(&self) -> Option<UserProfile> {
        let bytes = match self.storage.read(PROFILE_RECORD) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                logging::warn(format!("Failed to read profile record: {e}"));
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(profile) => Some(profile),
            Err(e) => {
                logging::warn(format!("Discarding unreadable profile record: {e}"));
                None
            }
        }
    }

    /// Replace the persisted profile wholesale. Best-effort, like every
    /// other persistence write in the engine.
    pub fn save(&self, profile: &UserProfile) {
        let bytes = match serde_json::to_vec(profile) {
            Ok(bytes) => bytes,
            Err(e) => {
                logging::warn(format!("Failed to serialize profile: {e}"));
                return;
            }
        };
        if let Err(e) = self.storage.write(PROFILE_RECORD, &bytes) {
            logging::warn(format!("Failed to persist profile: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn gate_requires_a_non_blank_display_name() {
        assert!(!can_send(None));
        assert!(!can_send(Some(&UserProfile::new(""))));
        assert!(!can_send(Some(&UserProfile::new("   "))));
        assert!(can_send(Some(&UserProfile::new("Lan"))));
    }

    #[test]
    fn profile_round_trips_through_storage() {
        let storage = MemoryStorage::new();
        let store = ProfileStore::new(Box::new(storage));
        assert!(store.load().is_none());

        let profile = UserProfile::new("Lan").with_avatar_bytes(b"img");
        store.save(&profile);
        assert_eq!(store.load(), Some(profile));
    }

    #[test]
    fn corrupt_profile_record_reads_as_anonymous() {
        let storage = MemoryStorage::new();
        storage.write(PROFILE_RECORD, b"not json").unwrap();
        let store = ProfileStore::new(Box::new(storage));
        assert!(store.load().is_none());
    }
}
