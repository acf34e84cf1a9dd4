// Content models - posts, events and projects
// Each item embeds its own comments and engagement; the feed and profile tabs
// work on the `ContentItem` union.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{CommentId, ContentId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::Collection;
use crate::infrastructure::entity_store::Entity;
use crate::infrastructure::media::MediaDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[serde(alias = "posts")]
    Post,
    #[serde(alias = "events")]
    Event,
    #[serde(alias = "projects")]
    Project,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Event => "event",
            ContentKind::Project => "project",
        }
    }

    pub fn collection(self) -> Collection {
        match self {
            ContentKind::Post => Collection::Posts,
            ContentKind::Event => Collection::Events,
            ContentKind::Project => Collection::Projects,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Like set plus its denormalized count. `count` always equals the set size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    liker_ids: Vec<UserId>,
    count: u64,
}

impl Engagement {
    pub fn like(&mut self, user_id: UserId) -> AppResult<()> {
        if self.is_liked_by(user_id) {
            return Err(AppError::AlreadyLiked);
        }
        self.liker_ids.push(user_id);
        self.count = self.liker_ids.len() as u64;
        Ok(())
    }

    pub fn unlike(&mut self, user_id: UserId) -> AppResult<()> {
        let before = self.liker_ids.len();
        self.liker_ids.retain(|id| *id != user_id);
        if self.liker_ids.len() == before {
            return Err(AppError::NotLiked);
        }
        self.count = self.liker_ids.len() as u64;
        Ok(())
    }

    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.liker_ids.contains(&user_id)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn liker_ids(&self) -> &[UserId] {
        &self.liker_ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: ContentId,
    pub author_id: UserId,
    pub caption: String,
    #[serde(default)]
    pub images: Vec<MediaDescriptor>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Going,
    Interested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: UserId,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: ContentId,
    pub author_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Overrides the author's account privacy when set
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub cover_image: Option<MediaDescriptor>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn attendance_of(&self, user_id: UserId) -> Option<AttendanceStatus> {
        self.attendees
            .iter()
            .find(|a| a.user_id == user_id)
            .map(|a| a.status)
    }

    pub fn set_attendance(&mut self, user_id: UserId, status: AttendanceStatus) {
        match self.attendees.iter_mut().find(|a| a.user_id == user_id) {
            Some(attendee) => attendee.status = status,
            None => self.attendees.push(Attendee { user_id, status }),
        }
    }

    /// Returns false if the user had no attendance entry
    pub fn clear_attendance(&mut self, user_id: UserId) -> bool {
        let before = self.attendees.len();
        self.attendees.retain(|a| a.user_id != user_id);
        self.attendees.len() != before
    }

    pub fn going_count(&self) -> usize {
        self.attendees
            .iter()
            .filter(|a| a.status == AttendanceStatus::Going)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ContentId,
    pub author_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<MediaDescriptor>,
    /// Likes on projects are shown as upvotes
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

/// Tagged union of every content type
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentItem {
    Post(Post),
    Event(Event),
    Project(Project),
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Post(_) => ContentKind::Post,
            ContentItem::Event(_) => ContentKind::Event,
            ContentItem::Project(_) => ContentKind::Project,
        }
    }

    pub fn id(&self) -> ContentId {
        match self {
            ContentItem::Post(p) => p.id,
            ContentItem::Event(e) => e.id,
            ContentItem::Project(p) => p.id,
        }
    }

    pub fn author_id(&self) -> UserId {
        match self {
            ContentItem::Post(p) => p.author_id,
            ContentItem::Event(e) => e.author_id,
            ContentItem::Project(p) => p.author_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ContentItem::Post(p) => p.created_at,
            ContentItem::Event(e) => e.created_at,
            ContentItem::Project(p) => p.created_at,
        }
    }

    pub fn privacy_flag(&self) -> Option<bool> {
        match self {
            ContentItem::Event(e) => e.is_private,
            _ => None,
        }
    }
}

/// Shared behaviour of the three content collections
pub trait ContentEntity: Entity {
    const KIND: ContentKind;

    fn author_id(&self) -> UserId;

    /// Item-level privacy; `None` defers to the author's account setting
    fn privacy_flag(&self) -> Option<bool> {
        None
    }

    fn engagement_mut(&mut self) -> &mut Engagement;
    fn comments_mut(&mut self) -> &mut Vec<Comment>;
    fn into_item(self) -> ContentItem;
}

macro_rules! content_entity {
    ($ty:ident, $kind:ident, $collection:ident $(, private: $flag:ident)?) => {
        impl Entity for $ty {
            const COLLECTION: Collection = Collection::$collection;

            fn entity_id(&self) -> i64 {
                self.id.value()
            }

            fn created_time(&self) -> i64 {
                self.created_at.timestamp_millis()
            }

            fn owner_id(&self) -> Option<i64> {
                Some(self.author_id.value())
            }
        }

        impl ContentEntity for $ty {
            const KIND: ContentKind = ContentKind::$kind;

            fn author_id(&self) -> UserId {
                self.author_id
            }

            $(
                fn privacy_flag(&self) -> Option<bool> {
                    self.$flag
                }
            )?

            fn engagement_mut(&mut self) -> &mut Engagement {
                &mut self.engagement
            }

            fn comments_mut(&mut self) -> &mut Vec<Comment> {
                &mut self.comments
            }

            fn into_item(self) -> ContentItem {
                ContentItem::$ty(self)
            }
        }
    };
}

content_entity!(Post, Post, Posts);
content_entity!(Event, Event, Events, private: is_private);
content_entity!(Project, Project, Projects);
