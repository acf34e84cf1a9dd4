// Campus Graph Server - social graph and feed API

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campus_graph::{
    app_state::AppState, config::Config, data_seeder::seed_demo_data,
    social_interface::create_social_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_graph=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    if config.repair_on_startup {
        let report = app_state.social.repair.run().await?;
        info!("Startup graph repair: {:?}", report);
    }
    if config.seed_demo_data {
        seed_demo_data(&app_state.social).await?;
    }

    let api_router = create_social_router(app_state.social.clone());

    // Build main application router
    let app = Router::new()
        .nest("/api/v1", api_router)
        .nest_service(&config.media.base_url, ServeDir::new(&config.media.dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server_address();
    info!("Campus Graph server starting on http://{}", addr);
    info!("  POST   /api/v1/auth/signup             - Create account");
    info!("  POST   /api/v1/auth/login              - Get a bearer token");
    info!("  GET    /api/v1/feed                    - Home feed");
    info!("  POST   /api/v1/follow                  - Follow or request to follow");
    info!("  GET    /api/v1/content/{{kind}}/{{id}}     - View a post, event or project");

    let listener = TcpListener::bind(addr.as_str()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
