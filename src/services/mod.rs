// Services - the social graph and feed core, one module per component

pub mod content_service;
pub mod engagement_service;
pub mod feed_service;
pub mod graph_repair;
pub mod identity_service;
pub mod social_graph_service;
pub mod visibility_resolver;

pub use content_service::{ContentService, CreateEventRequest, CreatePostRequest, CreateProjectRequest};
pub use engagement_service::{EngagementService, LikeState};
pub use feed_service::FeedService;
pub use graph_repair::{GraphRepair, RepairReport};
pub use identity_service::{IdentityService, ProfileUpdate, SignupRequest};
pub use social_graph_service::{FollowOutcome, FollowRequestView, SocialGraphService};
pub use visibility_resolver::{ContentView, Visibility};
