// Graph Repair - one-off reconciliation of follower/following lists

use tracing_subscriber::EnvFilter;

use campus_graph::{app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "campus_graph=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config).await?;

    let report = app_state.social.repair.run().await?;
    println!("Users scanned:             {}", report.users_scanned);
    println!("Users updated:             {}", report.users_updated);
    println!("Follower entries dropped:  {}", report.followers_dropped);
    println!("Following entries added:   {}", report.following_added);
    println!("Following entries removed: {}", report.following_removed);
    if report.is_clean() {
        println!("Follow graph is consistent");
    }

    Ok(())
}
