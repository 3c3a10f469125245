use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

/// Length of the opaque hash segment of a share URL
const SHARE_HASH_LENGTH: usize = 10;

/// Grants read-only access to a user's full content list
///
/// At most one per user: enabling sharing twice returns the existing link.
#[derive(Debug, Clone)]
pub struct ShareLink {
    pub hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn create(user_id: Uuid) -> Self {
        Self {
            hash: generate_share_hash(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// An opaque URL-safe hash, not derived from the user id so links cannot be guessed
fn generate_share_hash() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_HASH_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_url_safe_and_fixed_length() {
        let link = ShareLink::create(Uuid::new_v4());

        assert_eq!(link.hash.len(), SHARE_HASH_LENGTH);
        assert!(link.hash.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn two_links_get_distinct_hashes() {
        let user_id = Uuid::new_v4();

        assert_ne!(
            ShareLink::create(user_id).hash,
            ShareLink::create(user_id).hash
        );
    }
}
