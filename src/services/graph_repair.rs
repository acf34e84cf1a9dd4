// Graph Repair - reconciles the two halves of every follow edge
//
// `followers` is authoritative: it is the side written first, so an
// interrupted write leaves at most a follower entry without its `following`
// counterpart. The job runs over a snapshot of all users in one transaction
// and is idempotent.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

use crate::core::UserId;
use crate::error::AppResult;
use crate::infrastructure::entity_store::EntityStore;
use crate::models::user::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub users_scanned: usize,
    pub users_updated: usize,
    /// Follower entries dropped because they were duplicates, self references
    /// or pointed at missing users
    pub followers_dropped: usize,
    pub following_added: usize,
    pub following_removed: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.users_updated == 0
    }
}

/// Keep the first occurrence of each valid id, in order
fn clean_ids(ids: &[UserId], owner: UserId, existing: &HashSet<UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| *id != owner && existing.contains(id) && seen.insert(*id))
        .collect()
}

#[derive(Clone)]
pub struct GraphRepair {
    store: EntityStore,
}

impl GraphRepair {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> AppResult<RepairReport> {
        let mut tx = self.store.begin().await?;
        let mut users: Vec<User> = tx.list().await?;
        // Oldest accounts first so appended entries follow a stable order
        users.reverse();

        let mut report = RepairReport {
            users_scanned: users.len(),
            ..Default::default()
        };
        let existing: HashSet<UserId> = users.iter().map(|u| u.id).collect();

        // Pass 1: clean the authoritative side and derive who should follow whom
        let mut followers_changed: HashSet<UserId> = HashSet::new();
        let mut expected_following: HashMap<UserId, Vec<UserId>> = HashMap::new();
        for user in users.iter_mut() {
            let cleaned = clean_ids(&user.followers, user.id, &existing);
            if cleaned.len() != user.followers.len() {
                warn!(
                    "Dropping {} invalid follower entries of {}",
                    user.followers.len() - cleaned.len(),
                    user.id
                );
                report.followers_dropped += user.followers.len() - cleaned.len();
                user.followers = cleaned;
                followers_changed.insert(user.id);
            }
            for follower in &user.followers {
                expected_following.entry(*follower).or_default().push(user.id);
            }
        }

        // Pass 2: make every `following` list match
        for user in users.iter_mut() {
            let expected = expected_following.remove(&user.id).unwrap_or_default();
            let expected_set: HashSet<UserId> = expected.iter().copied().collect();

            let mut following: Vec<UserId> = clean_ids(&user.following, user.id, &existing)
                .into_iter()
                .filter(|id| expected_set.contains(id))
                .collect();
            let removed = user.following.len() - following.len();

            let mut added = 0;
            for target in expected {
                if !following.contains(&target) {
                    warn!("Restoring missing edge {} -> {}", user.id, target);
                    following.push(target);
                    added += 1;
                }
            }
            if removed > 0 {
                warn!("Removing {} orphan following entries of {}", removed, user.id);
            }

            report.following_added += added;
            report.following_removed += removed;

            let following_changed = following != user.following;
            user.following = following;

            if following_changed || followers_changed.contains(&user.id) {
                tx.save(&*user).await?;
                report.users_updated += 1;
            }
        }

        tx.commit().await?;

        if report.is_clean() {
            info!("Follow graph is consistent ({} users)", report.users_scanned);
        } else {
            warn!("Follow graph repaired: {:?}", report);
        }
        Ok(report)
    }
}
