// Feed items - a type-tagged projection of posts and events with the
// viewer's engagement state attached.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{ContentId, UserId};
use crate::models::content::{AttendanceStatus, ContentKind, Event, Post};
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct PostFeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub like_count: u64,
    pub liked_by_viewer: bool,
    pub comment_count: usize,
}

impl PostFeedItem {
    pub fn new(post: Post, author: UserSummary, viewer: UserId) -> Self {
        Self {
            like_count: post.engagement.count(),
            liked_by_viewer: post.engagement.is_liked_by(viewer),
            comment_count: post.comments.len(),
            post,
            author,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventFeedItem {
    #[serde(flatten)]
    pub event: Event,
    pub author: UserSummary,
    pub like_count: u64,
    pub liked_by_viewer: bool,
    pub comment_count: usize,
    pub viewer_attendance: Option<AttendanceStatus>,
    pub going_count: usize,
}

impl EventFeedItem {
    pub fn new(event: Event, author: UserSummary, viewer: UserId) -> Self {
        Self {
            like_count: event.engagement.count(),
            liked_by_viewer: event.engagement.is_liked_by(viewer),
            comment_count: event.comments.len(),
            viewer_attendance: event.attendance_of(viewer),
            going_count: event.going_count(),
            event,
            author,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedItem {
    Post(PostFeedItem),
    Event(EventFeedItem),
}

impl FeedItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            FeedItem::Post(_) => ContentKind::Post,
            FeedItem::Event(_) => ContentKind::Event,
        }
    }

    pub fn id(&self) -> ContentId {
        match self {
            FeedItem::Post(item) => item.post.id,
            FeedItem::Event(item) => item.event.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            FeedItem::Post(item) => item.post.created_at,
            FeedItem::Event(item) => item.event.created_at,
        }
    }
}
