// Domain models persisted in the document store and the views built from them

pub mod content;
pub mod feed;
pub mod user;

pub use content::{
    AttendanceStatus, Attendee, Comment, ContentEntity, ContentItem, ContentKind, Engagement,
    Event, Post, Project,
};
pub use feed::{EventFeedItem, FeedItem, PostFeedItem};
pub use user::{
    FollowRequest, FollowStatus, FullProfile, ProfileView, RequestStatus, User, UserSummary,
};
