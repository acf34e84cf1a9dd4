// Demo data for local development: three students, a few follows, a post,
// an event and a project. Skipped when the demo accounts already exist.

use chrono::{Duration, Utc};
use tracing::info;

use crate::{
    error::AppResult,
    infrastructure::viewer::ViewerContext,
    models::user::User,
    services::{CreateEventRequest, CreatePostRequest, CreateProjectRequest, FollowOutcome, SignupRequest},
    social_interface::SocialInterface,
};

const DEMO_PASSWORD: &str = "campus-demo-password";

async fn demo_user(social: &SocialInterface, username: &str, display_name: &str, is_private: bool) -> AppResult<User> {
    social
        .identity
        .signup(SignupRequest {
            username: username.to_string(),
            password: DEMO_PASSWORD.to_string(),
            display_name: Some(display_name.to_string()),
            bio: Some(format!("Hi, I'm {}", display_name)),
            contact: None,
            is_private,
        })
        .await
}

pub async fn seed_demo_data(social: &SocialInterface) -> AppResult<()> {
    if social.identity.find_by_username("alice").await?.is_some() {
        info!("Demo data already present, skipping seed");
        return Ok(());
    }

    let alice = demo_user(social, "alice", "Alice Chen", true).await?;
    let bob = demo_user(social, "bob", "Bob Okafor", false).await?;
    let carol = demo_user(social, "carol", "Carol Diaz", false).await?;

    let alice_vc = ViewerContext::new(alice.id);
    let bob_vc = ViewerContext::new(bob.id);
    let carol_vc = ViewerContext::new(carol.id);

    // Public target: immediate edge
    social.graph.follow(&alice_vc, bob.id).await?;
    social.graph.follow(&carol_vc, bob.id).await?;

    // Private target: request, accepted for bob and left pending for carol
    if let FollowOutcome::Pending { request_id } = social.graph.follow(&bob_vc, alice.id).await? {
        social.graph.accept_request(&alice_vc, request_id).await?;
    }
    social.graph.follow(&carol_vc, alice.id).await?;

    social
        .content
        .create_post(
            &bob_vc,
            CreatePostRequest {
                caption: "First week on campus!".to_string(),
                images: Vec::new(),
            },
        )
        .await?;
    social
        .content
        .create_post(
            &alice_vc,
            CreatePostRequest {
                caption: "Library is packed today".to_string(),
                images: Vec::new(),
            },
        )
        .await?;

    let starts_at = Utc::now() + Duration::days(3);
    social
        .content
        .create_event(
            &carol_vc,
            CreateEventRequest {
                title: "Hack Night".to_string(),
                description: "Bring a laptop and an idea".to_string(),
                location: "Engineering Hall 101".to_string(),
                starts_at,
                ends_at: starts_at + Duration::hours(4),
                is_private: None,
                cover_image: None,
            },
        )
        .await?;

    social
        .content
        .create_project(
            &bob_vc,
            CreateProjectRequest {
                title: "Course Planner".to_string(),
                description: "Drag and drop semester planning".to_string(),
                tech_stack: vec!["Rust".to_string(), "SQLite".to_string()],
                links: vec!["https://example.com/course-planner".to_string()],
                cover_image: None,
            },
        )
        .await?;

    info!("Seeded demo data: alice (private), bob and carol");
    Ok(())
}
