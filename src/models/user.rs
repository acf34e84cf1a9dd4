// User model - identity, profile fields and both sides of the follow graph
// A follow edge lives on two documents: `followers` of the followee and
// `following` of the follower. Both lists keep insertion order and never
// hold duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{RequestId, UserId};
use crate::infrastructure::database::Collection;
use crate::infrastructure::entity_store::Entity;
use crate::infrastructure::media::MediaDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Follow attempt toward a private account. Terminal once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowRequest {
    pub id: RequestId,
    pub from: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FollowRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub profile_image: Option<MediaDescriptor>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub followers: Vec<UserId>,
    #[serde(default)]
    pub following: Vec<UserId>,
    #[serde(default)]
    pub follow_requests: Vec<FollowRequest>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, username: String, password_hash: String) -> Self {
        Self {
            id,
            username,
            password_hash,
            display_name: None,
            bio: None,
            contact: None,
            profile_image: None,
            is_private: false,
            followers: Vec::new(),
            following: Vec::new(),
            follow_requests: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_follower(&self, user_id: UserId) -> bool {
        self.followers.contains(&user_id)
    }

    pub fn is_following(&self, user_id: UserId) -> bool {
        self.following.contains(&user_id)
    }

    /// Returns false if the id was already present
    pub fn add_follower(&mut self, user_id: UserId) -> bool {
        push_unique(&mut self.followers, user_id)
    }

    pub fn add_following(&mut self, user_id: UserId) -> bool {
        push_unique(&mut self.following, user_id)
    }

    /// Returns false if the id was not present
    pub fn remove_follower(&mut self, user_id: UserId) -> bool {
        remove_id(&mut self.followers, user_id)
    }

    pub fn remove_following(&mut self, user_id: UserId) -> bool {
        remove_id(&mut self.following, user_id)
    }

    pub fn pending_request_from(&self, from: UserId) -> Option<&FollowRequest> {
        self.follow_requests
            .iter()
            .find(|r| r.from == from && r.is_pending())
    }

    pub fn request_mut(&mut self, request_id: RequestId) -> Option<&mut FollowRequest> {
        self.follow_requests.iter_mut().find(|r| r.id == request_id)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

fn push_unique(ids: &mut Vec<UserId>, user_id: UserId) -> bool {
    if ids.contains(&user_id) {
        return false;
    }
    ids.push(user_id);
    true
}

fn remove_id(ids: &mut Vec<UserId>, user_id: UserId) -> bool {
    let before = ids.len();
    ids.retain(|id| *id != user_id);
    ids.len() != before
}

/// Usernames are unique regardless of case
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;

    fn entity_id(&self) -> i64 {
        self.id.value()
    }

    fn created_time(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    fn lookup_key(&self) -> Option<String> {
        Some(username_key(&self.username))
    }
}

/// Public projection used in lists, comment authors and feed items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub profile_image: Option<MediaDescriptor>,
}

/// Relationship of the viewer to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    #[serde(rename = "self")]
    Self_,
    Following,
    Pending,
    NotFollowing,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullProfile {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    pub profile_image: Option<MediaDescriptor>,
    pub is_private: bool,
    pub follower_count: usize,
    pub following_count: usize,
    pub follow_status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

impl FullProfile {
    pub fn from_user(user: &User, follow_status: FollowStatus) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            contact: user.contact.clone(),
            profile_image: user.profile_image.clone(),
            is_private: user.is_private,
            follower_count: user.followers.len(),
            following_count: user.following.len(),
            follow_status,
            created_at: user.created_at,
        }
    }
}

/// What a viewer gets back for a profile fetch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum ProfileView {
    Full(FullProfile),
    Restricted(UserSummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_lists_reject_duplicates() {
        let mut user = User::new(UserId(1), "alice".into(), "hash".into());
        assert!(user.add_follower(UserId(2)));
        assert!(!user.add_follower(UserId(2)));
        assert!(user.add_follower(UserId(3)));
        assert_eq!(user.followers, vec![UserId(2), UserId(3)]);

        assert!(user.remove_follower(UserId(2)));
        assert!(!user.remove_follower(UserId(2)));
        assert_eq!(user.followers, vec![UserId(3)]);
    }

    #[test]
    fn test_restricted_profile_serialization_hides_details() {
        let mut user = User::new(UserId(1), "alice".into(), "hash".into());
        user.bio = Some("secret bio".into());

        let json = serde_json::to_value(ProfileView::Restricted(user.summary())).unwrap();
        assert_eq!(json["visibility"], "restricted");
        assert_eq!(json["username"], "alice");
        assert!(json.get("bio").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_follow_status_names() {
        assert_eq!(serde_json::to_value(FollowStatus::Self_).unwrap(), "self");
        assert_eq!(
            serde_json::to_value(FollowStatus::NotFollowing).unwrap(),
            "not_following"
        );
    }
}
