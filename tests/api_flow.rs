// End-to-end API tests: the full router over an in-memory database

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use campus_graph::{app_state::AppState, config::Config, social_interface::create_social_router};

const PASSWORD: &str = "correct horse battery";

struct TestApp {
    router: Router,
    _media_dir: TempDir,
}

struct Account {
    id: i64,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let config = Config::in_memory(media_dir.path().to_str().unwrap());
        let state = AppState::new(config).await.unwrap();
        Self {
            router: create_social_router(state.social),
            _media_dir: media_dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn signup(&self, username: &str, is_private: bool) -> Account {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({"username": username, "password": PASSWORD, "is_private": is_private})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        Account {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }
}

#[tokio::test]
async fn test_health_and_authentication() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(Method::GET, "/feed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = app.send(Method::GET, "/feed", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let alice = app.signup("alice", false).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "ALICE", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_i64(), Some(alice.id));

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "alice", "password": "wrong password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"username": "Alice", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_private_account_follow_request_flow() {
    let app = TestApp::new().await;
    let alice = app.signup("alice", true).await;
    let bob = app.signup("bob", false).await;

    // Restricted until the request is accepted
    let (status, body) = app
        .send(Method::GET, &format!("/profile/{}", alice.id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "restricted");
    assert_eq!(body["username"], "alice");
    assert!(body.get("bio").is_none());

    let (status, body) = app
        .send(Method::POST, "/follow", Some(&bob.token), Some(json!({"target_id": alice.id})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    let request_id = body["request_id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::POST, "/follow", Some(&bob.token), Some(json!({"target_id": alice.id})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "request_already_pending");

    let (status, body) = app
        .send(Method::GET, "/follow-requests?status=pending", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["requester"]["username"], "bob");

    // Only the target can resolve the request
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/acceptFollowRequest/{}", request_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/acceptFollowRequest/{}", request_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/rejectFollowRequest/{}", request_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "request_already_resolved");

    let (_, body) = app
        .send(Method::GET, &format!("/profile/{}", alice.id), Some(&bob.token), None)
        .await;
    assert_eq!(body["visibility"], "full");
    assert_eq!(body["follow_status"], "following");
    assert_eq!(body["follower_count"], 1);

    let (_, body) = app
        .send(Method::GET, &format!("/following/{}", bob.id), Some(&bob.token), None)
        .await;
    assert_eq!(body[0]["id"].as_i64(), Some(alice.id));

    let (status, body) = app
        .send(Method::POST, "/unfollow", Some(&bob.token), Some(json!({"target_id": alice.id})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unfollowed");

    let (status, body) = app
        .send(Method::POST, "/unfollow", Some(&bob.token), Some(json!({"target_id": alice.id})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "not_following");
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let app = TestApp::new().await;
    let alice = app.signup("alice", false).await;

    let (status, body) = app
        .send(Method::POST, "/follow", Some(&alice.token), Some(json!({"target_id": alice.id})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "self_follow");
}

#[tokio::test]
async fn test_content_engagement_and_feed() {
    let app = TestApp::new().await;
    let alice = app.signup("alice", false).await;
    let bob = app.signup("bob", false).await;

    let (status, post) = app
        .send(Method::POST, "/posts", Some(&alice.token), Some(json!({"caption": "Orientation day"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = post["id"].as_i64().unwrap();

    let (status, event) = app
        .send(
            Method::POST,
            "/events",
            Some(&alice.token),
            Some(json!({
                "title": "Study group",
                "starts_at": "2030-09-01T18:00:00Z",
                "ends_at": "2030-09-01T20:00:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::POST, &format!("/content/post/{}/like", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"like_count": 1, "liked_by_viewer": true}));

    let (status, body) = app
        .send(Method::POST, &format!("/content/post/{}/like", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_liked");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/content/post/{}/comments", post_id),
            Some(&bob.token),
            Some(json!({"text": "  "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_comment");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/content/post/{}/comments", post_id),
            Some(&bob.token),
            Some(json!({"text": "See you there"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["comments"][0]["id"].as_i64().unwrap();

    // The post author cannot remove someone else's comment
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/content/post/{}/comments/{}", post_id, comment_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/events/{}/attendance", event_id),
            Some(&bob.token),
            Some(json!({"status": "going"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attendees"][0]["status"], "going");

    let (status, feed) = app.send(Method::GET, "/feed", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["type"], "event");
    assert_eq!(feed[0]["viewer_attendance"], "going");
    assert_eq!(feed[1]["type"], "post");
    assert_eq!(feed[1]["liked_by_viewer"], true);
    assert_eq!(feed[1]["comment_count"], 1);
    assert_eq!(feed[1]["author"]["username"], "alice");

    let (status, body) = app
        .send(Method::GET, &format!("/users/{}/content/posts", alice.id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["kind"], "post");

    // Only the author can delete
    let (status, _) = app
        .send(Method::DELETE, &format!("/content/post/{}", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::DELETE, &format!("/content/post/{}", post_id), Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app
        .send(Method::GET, &format!("/content/post/{}", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_private_content_is_restricted_to_followers() {
    let app = TestApp::new().await;
    let alice = app.signup("alice", true).await;
    let bob = app.signup("bob", false).await;

    let (_, post) = app
        .send(Method::POST, "/posts", Some(&alice.token), Some(json!({"caption": "close friends"})))
        .await;
    let post_id = post["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::GET, &format!("/content/post/{}", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "restricted");
    assert_eq!(body["author"]["username"], "alice");
    assert!(body.get("item").is_none());

    let (status, _) = app
        .send(Method::POST, &format!("/content/post/{}/like", post_id), Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, feed) = app.send(Method::GET, "/feed", Some(&bob.token), None).await;
    assert!(feed.as_array().unwrap().is_empty());

    let (status, body) = app
        .send(Method::GET, &format!("/content/post/{}", post_id), Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visibility"], "full");
    assert_eq!(body["item"]["caption"], "close friends");
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new().await;
    let alice = app.signup("alice", false).await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/profile",
            Some(&alice.token),
            Some(json!({"display_name": "Alice Chen", "bio": "CS '27", "is_private": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Alice Chen");
    assert_eq!(body["is_private"], true);
    assert_eq!(body["follow_status"], "self");

    let (status, body) = app
        .send(
            Method::PUT,
            "/profile",
            Some(&alice.token),
            Some(json!({"profile_image": "bm90IGFuIGltYWdl"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}
