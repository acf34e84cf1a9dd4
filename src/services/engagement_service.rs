// Engagement Tracker - likes and comments on posts, events and projects
//
// Every mutation is a read-modify-write of the item document in one
// transaction, so the like set and its count are always written together.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::{CommentId, ContentId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::content::{Comment, ContentEntity, ContentItem, ContentKind, Event, Post, Project};
use crate::models::user::User;
use crate::services::visibility_resolver::{resolve, Visibility};

const MAX_COMMENT_LEN: usize = 1000;

/// Like state of an item as seen by the viewer who just changed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub like_count: u64,
    pub liked_by_viewer: bool,
}

enum EngagementOp {
    Like,
    Unlike,
    AddComment(Comment),
    DeleteComment(CommentId),
}

impl EngagementOp {
    /// Liking and commenting need a fully visible item; undoing your own
    /// engagement does not
    fn requires_visibility(&self) -> bool {
        matches!(self, EngagementOp::Like | EngagementOp::AddComment(_))
    }
}

fn apply<T: ContentEntity>(item: &mut T, actor: UserId, op: EngagementOp) -> AppResult<()> {
    match op {
        EngagementOp::Like => item.engagement_mut().like(actor),
        EngagementOp::Unlike => item.engagement_mut().unlike(actor),
        EngagementOp::AddComment(comment) => {
            item.comments_mut().push(comment);
            Ok(())
        }
        EngagementOp::DeleteComment(comment_id) => {
            let comments = item.comments_mut();
            let index = comments
                .iter()
                .position(|c| c.id == comment_id)
                .ok_or(AppError::CommentNotFound(comment_id))?;

            // Only the comment's author may delete it, not the item's author
            if comments[index].author_id != actor {
                return Err(AppError::NotAuthorized(
                    "Only the comment author can delete this comment".to_string(),
                ));
            }
            comments.remove(index);
            Ok(())
        }
    }
}

fn validate_comment(text: &str) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyComment);
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(text.to_string())
}

#[derive(Clone)]
pub struct EngagementService {
    store: EntityStore,
    ids: Arc<IdGenerator>,
}

impl EngagementService {
    pub fn new(store: EntityStore, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Fails with `AlreadyLiked` rather than silently succeeding
    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn like(&self, viewer: &ViewerContext, kind: ContentKind, id: ContentId) -> AppResult<LikeState> {
        let item = self.mutate(viewer, kind, id, EngagementOp::Like).await?;
        info!("{} liked {} {}", viewer.user_id, kind, id);
        Ok(like_state(&item, viewer.user_id))
    }

    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn unlike(&self, viewer: &ViewerContext, kind: ContentKind, id: ContentId) -> AppResult<LikeState> {
        let item = self.mutate(viewer, kind, id, EngagementOp::Unlike).await?;
        info!("{} unliked {} {}", viewer.user_id, kind, id);
        Ok(like_state(&item, viewer.user_id))
    }

    /// Append a comment with a server-assigned timestamp; returns the updated item
    #[instrument(skip(self, text), fields(viewer = %viewer.user_id))]
    pub async fn add_comment(
        &self,
        viewer: &ViewerContext,
        kind: ContentKind,
        id: ContentId,
        text: &str,
    ) -> AppResult<ContentItem> {
        let comment = Comment {
            id: CommentId::new(self.ids.next_id()),
            author_id: viewer.user_id,
            text: validate_comment(text)?,
            created_at: Utc::now(),
        };
        let comment_id = comment.id;

        let item = self
            .mutate(viewer, kind, id, EngagementOp::AddComment(comment))
            .await?;
        debug!("Comment {} added to {} {}", comment_id, kind, id);
        Ok(item)
    }

    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn delete_comment(
        &self,
        viewer: &ViewerContext,
        kind: ContentKind,
        id: ContentId,
        comment_id: CommentId,
    ) -> AppResult<ContentItem> {
        let item = self
            .mutate(viewer, kind, id, EngagementOp::DeleteComment(comment_id))
            .await?;
        debug!("Comment {} removed from {} {}", comment_id, kind, id);
        Ok(item)
    }

    async fn mutate(
        &self,
        viewer: &ViewerContext,
        kind: ContentKind,
        id: ContentId,
        op: EngagementOp,
    ) -> AppResult<ContentItem> {
        match kind {
            ContentKind::Post => self.mutate_typed::<Post>(viewer, id, op).await,
            ContentKind::Event => self.mutate_typed::<Event>(viewer, id, op).await,
            ContentKind::Project => self.mutate_typed::<Project>(viewer, id, op).await,
        }
    }

    async fn mutate_typed<T: ContentEntity>(
        &self,
        viewer: &ViewerContext,
        id: ContentId,
        op: EngagementOp,
    ) -> AppResult<ContentItem> {
        let mut tx = self.store.begin().await?;
        let mut item: T = tx.require(id.value()).await?;

        if op.requires_visibility() {
            let author: Option<User> = tx.get(item.author_id().value()).await?;
            if resolve(viewer.user_id, author.as_ref(), item.privacy_flag()) != Visibility::Full {
                return Err(AppError::NotAuthorized(format!(
                    "{} {} is not visible to you",
                    T::KIND,
                    id
                )));
            }
        }

        apply(&mut item, viewer.user_id, op)?;
        tx.save(&item).await?;
        tx.commit().await?;

        Ok(item.into_item())
    }
}

fn like_state(item: &ContentItem, viewer: UserId) -> LikeState {
    let engagement = match item {
        ContentItem::Post(p) => &p.engagement,
        ContentItem::Event(e) => &e.engagement,
        ContentItem::Project(p) => &p.engagement,
    };
    LikeState {
        like_count: engagement.count(),
        liked_by_viewer: engagement.is_liked_by(viewer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::content_service::tests::fixture;

    fn engagement(service: &crate::services::content_service::tests::Fixture) -> EngagementService {
        EngagementService::new(service.identity.store().clone(), Arc::new(IdGenerator::new(4)))
    }

    fn comments_of(item: &ContentItem) -> &[Comment] {
        match item {
            ContentItem::Post(p) => &p.comments,
            ContentItem::Event(e) => &e.comments,
            ContentItem::Project(p) => &p.comments,
        }
    }

    #[tokio::test]
    async fn test_like_twice_fails_and_count_tracks_set() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let alice = f.user("alice", false).await;
        let bob = f.user("bob", false).await;
        let post = f.post(&alice, "hello").await;

        let state = engagement.like(&bob, ContentKind::Post, post.id).await.unwrap();
        assert_eq!(state, LikeState { like_count: 1, liked_by_viewer: true });

        let err = engagement.like(&bob, ContentKind::Post, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyLiked));

        engagement.like(&alice, ContentKind::Post, post.id).await.unwrap();
        let state = engagement.unlike(&bob, ContentKind::Post, post.id).await.unwrap();
        assert_eq!(state, LikeState { like_count: 1, liked_by_viewer: false });

        let err = engagement.unlike(&bob, ContentKind::Post, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotLiked));

        let stored: Post = f.identity.store().require(post.id.value()).await.unwrap();
        assert_eq!(
            stored.engagement.count(),
            stored.engagement.liker_ids().len() as u64
        );
    }

    #[tokio::test]
    async fn test_projects_can_be_upvoted() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let alice = f.user("alice", false).await;
        let project = f
            .content
            .create_project(
                &alice,
                crate::services::content_service::CreateProjectRequest {
                    title: "Timetable".to_string(),
                    description: String::new(),
                    tech_stack: Vec::new(),
                    links: Vec::new(),
                    cover_image: None,
                },
            )
            .await
            .unwrap();

        let state = engagement
            .like(&alice, ContentKind::Project, project.id)
            .await
            .unwrap();
        assert_eq!(state.like_count, 1);
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let alice = f.user("alice", false).await;
        let post = f.post(&alice, "hello").await;

        let err = engagement
            .add_comment(&alice, ContentKind::Post, post.id, "   \n ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyComment));
    }

    #[tokio::test]
    async fn test_comments_append_in_order() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let alice = f.user("alice", false).await;
        let bob = f.user("bob", false).await;
        let post = f.post(&alice, "hello").await;

        engagement
            .add_comment(&bob, ContentKind::Post, post.id, " first ")
            .await
            .unwrap();
        let item = engagement
            .add_comment(&alice, ContentKind::Post, post.id, "second")
            .await
            .unwrap();

        let texts: Vec<&str> = comments_of(&item).iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_item_author_cannot_delete_others_comment() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let bob = f.user("bob", false).await;
        let carol = f.user("carol", false).await;
        let post = f.post(&bob, "my post").await;

        let item = engagement
            .add_comment(&carol, ContentKind::Post, post.id, "nice")
            .await
            .unwrap();
        let comment_id = comments_of(&item)[0].id;

        let err = engagement
            .delete_comment(&bob, ContentKind::Post, post.id, comment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));

        let item = engagement
            .delete_comment(&carol, ContentKind::Post, post.id, comment_id)
            .await
            .unwrap();
        assert!(comments_of(&item).is_empty());

        let err = engagement
            .delete_comment(&carol, ContentKind::Post, post.id, comment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CommentNotFound(_)));
    }

    #[tokio::test]
    async fn test_hidden_items_cannot_be_engaged() {
        let f = fixture().await;
        let engagement = engagement(&f);
        let alice = f.user("alice", true).await;
        let bob = f.user("bob", false).await;
        let post = f.post(&alice, "followers only").await;

        let err = engagement.like(&bob, ContentKind::Post, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));
        let err = engagement
            .add_comment(&bob, ContentKind::Post, post.id, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthorized(_)));

        let err = engagement.like(&bob, ContentKind::Event, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
