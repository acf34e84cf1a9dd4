// Social Interface - single access layer over the social graph and feed core
// Holds every service, exposes the HTTP handlers and builds the router.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::core::{CommentId, ContentId, RequestId, UserId};
use crate::error::AppResult;
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::media::MediaStore;
use crate::infrastructure::middleware::{viewer_context_middleware, HasAuthProvider, Vc};
use crate::infrastructure::security::{AuthProvider, JwtAuthProvider};
use crate::models::content::{AttendanceStatus, ContentItem, ContentKind, Event, Post, Project};
use crate::models::feed::FeedItem;
use crate::models::user::{FollowRequest, FollowStatus, FullProfile, ProfileView, RequestStatus, UserSummary};
use crate::services::{
    visibility_resolver, ContentService, ContentView, CreateEventRequest, CreatePostRequest,
    CreateProjectRequest, EngagementService, FeedService, FollowOutcome, FollowRequestView,
    GraphRepair, IdentityService, LikeState, ProfileUpdate, SignupRequest, SocialGraphService,
};

#[derive(Clone)]
pub struct SocialInterface {
    store: EntityStore,
    auth: Arc<dyn AuthProvider>,
    pub identity: IdentityService,
    pub graph: SocialGraphService,
    pub content: ContentService,
    pub engagement: EngagementService,
    pub feed: FeedService,
    pub repair: GraphRepair,
}

impl HasAuthProvider for SocialInterface {
    fn auth_provider(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }
}

impl SocialInterface {
    pub fn new(config: &Config, store: EntityStore, media: Arc<dyn MediaStore>) -> Self {
        let ids = Arc::new(IdGenerator::new(config.node_id));
        let auth: Arc<dyn AuthProvider> = Arc::new(JwtAuthProvider::new(store.clone(), &config.auth));
        let identity = IdentityService::new(store.clone(), ids.clone(), media.clone());

        Self {
            auth,
            graph: SocialGraphService::new(store.clone(), identity.clone(), ids.clone()),
            content: ContentService::new(store.clone(), ids.clone(), media),
            engagement: EngagementService::new(store.clone(), ids),
            feed: FeedService::new(store.clone(), config.cache.capacity),
            repair: GraphRepair::new(store.clone()),
            identity,
            store,
        }
    }

    pub async fn health(&self) -> AppResult<Json<Value>> {
        self.store.database().health_check().await?;
        Ok(Json(json!({"status": "ok"})))
    }
}

// Request bodies

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct FollowBody {
    pub target_id: UserId,
}

#[derive(Deserialize)]
pub struct FollowRequestsQuery {
    pub status: Option<RequestStatus>,
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub text: String,
}

#[derive(Deserialize)]
pub struct AttendanceBody {
    pub status: AttendanceStatus,
}

// HTTP Handlers

pub async fn health_handler(State(social): State<SocialInterface>) -> AppResult<Json<Value>> {
    social.health().await
}

pub async fn signup_handler(
    State(social): State<SocialInterface>,
    Json(req): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = social.identity.signup(req).await?;
    let token = social.auth.issue_token(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"token": token, "user": user.summary()})),
    ))
}

pub async fn login_handler(
    State(social): State<SocialInterface>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let user_id = social.auth.verify_credentials(&req.username, &req.password).await?;
    let token = social.auth.issue_token(user_id)?;
    Ok(Json(json!({"token": token, "user_id": user_id})))
}

pub async fn get_profile_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ProfileView>> {
    let target = social.identity.require_user(user_id).await?;
    Ok(Json(visibility_resolver::resolve_profile(vc.user_id, &target)))
}

pub async fn update_profile_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<FullProfile>> {
    let user = social.identity.update_profile(&vc, update).await?;
    Ok(Json(FullProfile::from_user(&user, FollowStatus::Self_)))
}

pub async fn follow_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(body): Json<FollowBody>,
) -> AppResult<Json<FollowOutcome>> {
    Ok(Json(social.graph.follow(&vc, body.target_id).await?))
}

pub async fn unfollow_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(body): Json<FollowBody>,
) -> AppResult<Json<Value>> {
    social.graph.unfollow(&vc, body.target_id).await?;
    Ok(Json(json!({"status": "unfollowed"})))
}

pub async fn list_follow_requests_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Query(query): Query<FollowRequestsQuery>,
) -> AppResult<Json<Vec<FollowRequestView>>> {
    Ok(Json(social.graph.list_follow_requests(&vc, query.status).await?))
}

pub async fn accept_follow_request_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path(request_id): Path<RequestId>,
) -> AppResult<Json<FollowRequest>> {
    Ok(Json(social.graph.accept_request(&vc, request_id).await?))
}

pub async fn reject_follow_request_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path(request_id): Path<RequestId>,
) -> AppResult<Json<FollowRequest>> {
    Ok(Json(social.graph.reject_request(&vc, request_id).await?))
}

pub async fn followers_handler(
    State(social): State<SocialInterface>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(social.graph.list_followers(user_id).await?))
}

pub async fn following_handler(
    State(social): State<SocialInterface>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(social.graph.list_following(user_id).await?))
}

pub async fn feed_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
) -> AppResult<Json<Vec<FeedItem>>> {
    Ok(Json(social.feed.build_feed(&vc).await?))
}

pub async fn create_post_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = social.content.create_post(&vc, req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn create_event_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let event = social.content.create_event(&vc, req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn create_project_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = social.content.create_project(&vc, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_content_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id)): Path<(ContentKind, ContentId)>,
) -> AppResult<Json<ContentView>> {
    Ok(Json(social.content.get_content(&vc, kind, id).await?))
}

pub async fn delete_content_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id)): Path<(ContentKind, ContentId)>,
) -> AppResult<StatusCode> {
    social.content.delete_content(&vc, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_content_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((user_id, kind)): Path<(UserId, ContentKind)>,
) -> AppResult<Json<Vec<ContentItem>>> {
    Ok(Json(social.content.list_user_content(&vc, user_id, kind).await?))
}

pub async fn like_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id)): Path<(ContentKind, ContentId)>,
) -> AppResult<Json<LikeState>> {
    Ok(Json(social.engagement.like(&vc, kind, id).await?))
}

pub async fn unlike_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id)): Path<(ContentKind, ContentId)>,
) -> AppResult<Json<LikeState>> {
    Ok(Json(social.engagement.unlike(&vc, kind, id).await?))
}

pub async fn add_comment_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id)): Path<(ContentKind, ContentId)>,
    Json(body): Json<CommentBody>,
) -> AppResult<(StatusCode, Json<ContentItem>)> {
    let item = social.engagement.add_comment(&vc, kind, id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_comment_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path((kind, id, comment_id)): Path<(ContentKind, ContentId, CommentId)>,
) -> AppResult<Json<ContentItem>> {
    Ok(Json(
        social
            .engagement
            .delete_comment(&vc, kind, id, comment_id)
            .await?,
    ))
}

pub async fn set_attendance_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path(event_id): Path<ContentId>,
    Json(body): Json<AttendanceBody>,
) -> AppResult<Json<Event>> {
    Ok(Json(social.content.set_attendance(&vc, event_id, body.status).await?))
}

pub async fn clear_attendance_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Path(event_id): Path<ContentId>,
) -> AppResult<Json<Event>> {
    Ok(Json(social.content.clear_attendance(&vc, event_id).await?))
}

// Create the API router. Everything except signup, login and health needs a
// bearer token.
pub fn create_social_router(social: SocialInterface) -> Router {
    let authenticated = Router::new()
        // Profiles
        .route("/profile/{id}", get(get_profile_handler))
        .route("/profile", put(update_profile_handler))
        // Social graph
        .route("/follow", post(follow_handler))
        .route("/unfollow", post(unfollow_handler))
        .route("/follow-requests", get(list_follow_requests_handler))
        .route("/acceptFollowRequest/{id}", post(accept_follow_request_handler))
        .route("/rejectFollowRequest/{id}", post(reject_follow_request_handler))
        .route("/followers/{id}", get(followers_handler))
        .route("/following/{id}", get(following_handler))
        // Feed and content
        .route("/feed", get(feed_handler))
        .route("/posts", post(create_post_handler))
        .route("/events", post(create_event_handler))
        .route("/projects", post(create_project_handler))
        .route(
            "/content/{kind}/{id}",
            get(get_content_handler).delete(delete_content_handler),
        )
        .route("/users/{id}/content/{kind}", get(user_content_handler))
        // Engagement
        .route("/content/{kind}/{id}/like", post(like_handler))
        .route("/content/{kind}/{id}/unlike", post(unlike_handler))
        .route("/content/{kind}/{id}/comments", post(add_comment_handler))
        .route(
            "/content/{kind}/{id}/comments/{comment_id}",
            delete(delete_comment_handler),
        )
        .route(
            "/events/{id}/attendance",
            put(set_attendance_handler).delete(clear_attendance_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            social.clone(),
            viewer_context_middleware::<SocialInterface>,
        ));

    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/health", get(health_handler))
        .merge(authenticated)
        .with_state(social)
}
