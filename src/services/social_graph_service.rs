// Social Graph Manager - follow edges and the follow request state machine
//
// An edge is written on two user documents inside one store transaction,
// always target (`followers`) first, then source (`following`). GraphRepair
// treats the target side as authoritative if the pair ever drifts.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::{RequestId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::user::{FollowRequest, FollowStatus, RequestStatus, User, UserSummary};
use crate::services::identity_service::IdentityService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FollowOutcome {
    Followed,
    Pending { request_id: RequestId },
}

/// A follow request together with who sent it
#[derive(Debug, Clone, Serialize)]
pub struct FollowRequestView {
    #[serde(flatten)]
    pub request: FollowRequest,
    pub requester: Option<UserSummary>,
}

/// Relationship of `viewer` to `target`
pub fn follow_status(viewer: UserId, target: &User) -> FollowStatus {
    if viewer == target.id {
        FollowStatus::Self_
    } else if target.has_follower(viewer) {
        FollowStatus::Following
    } else if target.pending_request_from(viewer).is_some() {
        FollowStatus::Pending
    } else {
        FollowStatus::NotFollowing
    }
}

#[derive(Clone)]
pub struct SocialGraphService {
    store: EntityStore,
    identity: IdentityService,
    ids: Arc<IdGenerator>,
}

impl SocialGraphService {
    pub fn new(store: EntityStore, identity: IdentityService, ids: Arc<IdGenerator>) -> Self {
        Self { store, identity, ids }
    }

    /// Follow `target_id`, or file a pending request if the account is private
    #[instrument(skip(self), fields(sender = %viewer.user_id))]
    pub async fn follow(&self, viewer: &ViewerContext, target_id: UserId) -> AppResult<FollowOutcome> {
        let sender_id = viewer.user_id;
        if sender_id == target_id {
            return Err(AppError::SelfFollow);
        }

        let mut tx = self.store.begin().await?;
        let mut target: User = tx.require(target_id.value()).await?;
        let mut sender: User = tx.require(sender_id.value()).await?;

        if target.has_follower(sender_id) {
            return Err(AppError::AlreadyFollowing);
        }
        let pending = target.pending_request_from(sender_id).map(|r| r.id);
        if target.is_private && pending.is_some() {
            return Err(AppError::RequestAlreadyPending);
        }

        if target.is_private {
            let request_id = RequestId::new(self.ids.next_id());
            target.follow_requests.push(FollowRequest {
                id: request_id,
                from: sender_id,
                status: RequestStatus::Pending,
                created_at: Utc::now(),
                resolved_at: None,
            });
            tx.save(&target).await?;
            tx.commit().await?;

            info!("Follow request {} from {} to {} is pending", request_id, sender_id, target_id);
            return Ok(FollowOutcome::Pending { request_id });
        }

        // Left over from before the account went public
        if let Some(request_id) = pending {
            resolve_request(&mut target, request_id, RequestStatus::Accepted)?;
            info!("Accepting stale follow request {} from {}", request_id, sender_id);
        }

        target.add_follower(sender_id);
        tx.save(&target).await?;
        sender.add_following(target_id);
        tx.save(&sender).await?;
        tx.commit().await?;

        info!("{} now follows {}", sender_id, target_id);
        Ok(FollowOutcome::Followed)
    }

    /// Remove the edge from the viewer to `target_id`. A half edge left by an
    /// interrupted write is removed as well.
    #[instrument(skip(self), fields(sender = %viewer.user_id))]
    pub async fn unfollow(&self, viewer: &ViewerContext, target_id: UserId) -> AppResult<()> {
        let sender_id = viewer.user_id;
        if sender_id == target_id {
            return Err(AppError::NotFollowing);
        }

        let mut tx = self.store.begin().await?;
        let mut target: User = tx.require(target_id.value()).await?;
        let mut sender: User = tx.require(sender_id.value()).await?;

        let removed_follower = target.remove_follower(sender_id);
        let removed_following = sender.remove_following(target_id);
        if !removed_follower && !removed_following {
            return Err(AppError::NotFollowing);
        }

        if removed_follower {
            tx.save(&target).await?;
        }
        if removed_following {
            tx.save(&sender).await?;
        }
        tx.commit().await?;

        info!("{} unfollowed {}", sender_id, target_id);
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %viewer.user_id))]
    pub async fn accept_request(
        &self,
        viewer: &ViewerContext,
        request_id: RequestId,
    ) -> AppResult<FollowRequest> {
        let mut tx = self.store.begin().await?;
        let mut owner: User = tx.require(viewer.user_id.value()).await?;
        let request = resolve_request(&mut owner, request_id, RequestStatus::Accepted)?;

        let mut requester: User = tx.require(request.from.value()).await?;
        owner.add_follower(requester.id);
        tx.save(&owner).await?;
        requester.add_following(owner.id);
        tx.save(&requester).await?;
        tx.commit().await?;

        info!("{} accepted follow request {} from {}", owner.id, request_id, requester.id);
        Ok(request)
    }

    #[instrument(skip(self), fields(owner = %viewer.user_id))]
    pub async fn reject_request(
        &self,
        viewer: &ViewerContext,
        request_id: RequestId,
    ) -> AppResult<FollowRequest> {
        let mut tx = self.store.begin().await?;
        let mut owner: User = tx.require(viewer.user_id.value()).await?;
        let request = resolve_request(&mut owner, request_id, RequestStatus::Rejected)?;

        tx.save(&owner).await?;
        tx.commit().await?;

        info!("{} rejected follow request {} from {}", owner.id, request_id, request.from);
        Ok(request)
    }

    /// The viewer's request history, oldest first, optionally filtered by status
    pub async fn list_follow_requests(
        &self,
        viewer: &ViewerContext,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<FollowRequestView>> {
        let owner = self.identity.require_user(viewer.user_id).await?;
        let requests: Vec<FollowRequest> = owner
            .follow_requests
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();

        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let requester = self.identity.get_user(request.from).await?.map(|u| u.summary());
            views.push(FollowRequestView { request, requester });
        }
        Ok(views)
    }

    pub async fn list_followers(&self, user_id: UserId) -> AppResult<Vec<UserSummary>> {
        let user = self.identity.require_user(user_id).await?;
        debug!("Listing {} followers of {}", user.followers.len(), user_id);
        self.identity.summaries(&user.followers).await
    }

    pub async fn list_following(&self, user_id: UserId) -> AppResult<Vec<UserSummary>> {
        let user = self.identity.require_user(user_id).await?;
        debug!("Listing {} accounts followed by {}", user.following.len(), user_id);
        self.identity.summaries(&user.following).await
    }
}

/// Move a pending request to its terminal status and return the updated copy
fn resolve_request(
    owner: &mut User,
    request_id: RequestId,
    status: RequestStatus,
) -> AppResult<FollowRequest> {
    let request = owner
        .request_mut(request_id)
        .ok_or(AppError::RequestNotFound(request_id))?;

    if !request.is_pending() {
        return Err(AppError::RequestAlreadyResolved(request_id));
    }

    request.status = status;
    request.resolved_at = Some(Utc::now());
    Ok(request.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity_service::tests::{identity_service, signup_request};

    struct Fixture {
        graph: SocialGraphService,
        identity: IdentityService,
        _media_dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let (identity, media_dir) = identity_service().await;
        let graph = SocialGraphService::new(
            identity.store().clone(),
            identity.clone(),
            Arc::new(IdGenerator::new(2)),
        );
        Fixture {
            graph,
            identity,
            _media_dir: media_dir,
        }
    }

    impl Fixture {
        async fn user(&self, name: &str, is_private: bool) -> User {
            let mut request = signup_request(name);
            request.is_private = is_private;
            self.identity.signup(request).await.unwrap()
        }

        async fn reload(&self, user: &User) -> User {
            self.identity.require_user(user.id).await.unwrap()
        }
    }

    fn vc(user: &User) -> ViewerContext {
        ViewerContext::new(user.id)
    }

    #[tokio::test]
    async fn test_follow_public_creates_symmetric_edge() {
        let f = fixture().await;
        let alice = f.user("alice", false).await;
        let bob = f.user("bob", false).await;

        let outcome = f.graph.follow(&vc(&bob), alice.id).await.unwrap();
        assert_eq!(outcome, FollowOutcome::Followed);

        let alice = f.reload(&alice).await;
        let bob = f.reload(&bob).await;
        assert_eq!(alice.followers, vec![bob.id]);
        assert_eq!(bob.following, vec![alice.id]);
        assert_eq!(follow_status(bob.id, &alice), FollowStatus::Following);

        let err = f.graph.follow(&vc(&bob), alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyFollowing));
    }

    #[tokio::test]
    async fn test_self_follow_is_rejected() {
        let f = fixture().await;
        let alice = f.user("alice", false).await;

        let err = f.graph.follow(&vc(&alice), alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::SelfFollow));
    }

    #[tokio::test]
    async fn test_private_account_request_lifecycle() {
        let f = fixture().await;
        let alice = f.user("alice", true).await;
        let bob = f.user("bob", false).await;

        let request_id = match f.graph.follow(&vc(&bob), alice.id).await.unwrap() {
            FollowOutcome::Pending { request_id } => request_id,
            other => panic!("expected pending request, got {:?}", other),
        };

        let err = f.graph.follow(&vc(&bob), alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::RequestAlreadyPending));

        let pending = f.reload(&alice).await;
        assert!(pending.followers.is_empty());
        assert_eq!(follow_status(bob.id, &pending), FollowStatus::Pending);

        let accepted = f.graph.accept_request(&vc(&alice), request_id).await.unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert!(accepted.resolved_at.is_some());

        let alice = f.reload(&alice).await;
        let bob = f.reload(&bob).await;
        assert_eq!(alice.followers, vec![bob.id]);
        assert_eq!(bob.following, vec![alice.id]);
        // Resolved requests stay in the history
        assert_eq!(alice.follow_requests.len(), 1);

        let err = f.graph.accept_request(&vc(&alice), request_id).await.unwrap_err();
        assert!(matches!(err, AppError::RequestAlreadyResolved(_)));
    }

    #[tokio::test]
    async fn test_reject_creates_no_edge() {
        let f = fixture().await;
        let alice = f.user("alice", true).await;
        let bob = f.user("bob", false).await;

        let FollowOutcome::Pending { request_id } = f.graph.follow(&vc(&bob), alice.id).await.unwrap() else {
            panic!("expected pending request");
        };
        f.graph.reject_request(&vc(&alice), request_id).await.unwrap();

        let alice = f.reload(&alice).await;
        assert!(alice.followers.is_empty());
        assert_eq!(alice.follow_requests[0].status, RequestStatus::Rejected);

        // A rejected request does not block a new one
        let outcome = f.graph.follow(&vc(&bob), alice.id).await.unwrap();
        assert!(matches!(outcome, FollowOutcome::Pending { .. }));

        let pending = f
            .graph
            .list_follow_requests(&vc(&alice), Some(RequestStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].requester.as_ref().map(|r| r.id), Some(bob.id));
        let all = f.graph.list_follow_requests(&vc(&alice), None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let f = fixture().await;
        let alice = f.user("alice", true).await;

        let err = f.graph.reject_request(&vc(&alice), RequestId(99)).await.unwrap_err();
        assert!(matches!(err, AppError::RequestNotFound(RequestId(99))));
    }

    #[tokio::test]
    async fn test_unfollow_removes_both_sides() {
        let f = fixture().await;
        let alice = f.user("alice", false).await;
        let bob = f.user("bob", false).await;
        f.graph.follow(&vc(&bob), alice.id).await.unwrap();

        f.graph.unfollow(&vc(&bob), alice.id).await.unwrap();
        assert!(f.reload(&alice).await.followers.is_empty());
        assert!(f.reload(&bob).await.following.is_empty());

        let err = f.graph.unfollow(&vc(&bob), alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFollowing));
    }

    #[tokio::test]
    async fn test_stale_request_accepted_once_account_is_public() {
        let f = fixture().await;
        let alice = f.user("alice", true).await;
        let bob = f.user("bob", false).await;

        let request_id = match f.graph.follow(&vc(&bob), alice.id).await.unwrap() {
            FollowOutcome::Pending { request_id } => request_id,
            other => panic!("expected pending request, got {:?}", other),
        };

        f.identity
            .update_profile(
                &vc(&alice),
                crate::services::identity_service::ProfileUpdate {
                    is_private: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = f.graph.follow(&vc(&bob), alice.id).await.unwrap();
        assert_eq!(outcome, FollowOutcome::Followed);

        let alice = f.reload(&alice).await;
        assert!(alice.has_follower(bob.id));
        assert!(f.reload(&bob).await.is_following(alice.id));
        assert!(alice.pending_request_from(bob.id).is_none());
        let request = alice
            .follow_requests
            .iter()
            .find(|r| r.id == request_id)
            .unwrap();
        assert_eq!(request.status, RequestStatus::Accepted);
        assert!(request.resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_lists_keep_insertion_order() {
        let f = fixture().await;
        let alice = f.user("alice", false).await;
        let bob = f.user("bob", false).await;
        let carol = f.user("carol", false).await;

        f.graph.follow(&vc(&carol), alice.id).await.unwrap();
        f.graph.follow(&vc(&bob), alice.id).await.unwrap();
        f.graph.follow(&vc(&carol), bob.id).await.unwrap();

        let followers: Vec<UserId> = f
            .graph
            .list_followers(alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(followers, vec![carol.id, bob.id]);

        let following: Vec<UserId> = f
            .graph
            .list_following(carol.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(following, vec![alice.id, bob.id]);
    }
}
