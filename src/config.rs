use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub node_id: u16,
    pub repair_on_startup: bool,
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub dir: String,
    pub base_url: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let node_id = env_parse("NODE_ID", 0u16);
        if node_id >= 1024 {
            anyhow::bail!("NODE_ID must be less than 1024, got {}", node_id);
        }

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                tracing::warn!("JWT_SECRET not set, using an insecure development secret");
                "campus-graph-dev-secret".to_string()
            }
        };

        Ok(Self {
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite:data/campus_graph.db"),
                max_connections: env_parse("DB_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse("SERVER_PORT", 3000),
            },
            cache: CacheConfig {
                capacity: env_parse("CACHE_CAPACITY", 1000),
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours: env_parse("TOKEN_TTL_HOURS", 24),
            },
            media: MediaConfig {
                dir: env_or("MEDIA_DIR", "data/media"),
                base_url: env_or("MEDIA_BASE_URL", "/media"),
            },
            node_id,
            repair_on_startup: env_parse("REPAIR_ON_STARTUP", false),
            seed_demo_data: env_parse("SEED_DEMO_DATA", false),
        })
    }

    /// In-memory configuration used by tests and local experiments.
    pub fn in_memory(media_dir: &str) -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            cache: CacheConfig { capacity: 128 },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_ttl_hours: 1,
            },
            media: MediaConfig {
                dir: media_dir.to_string(),
                base_url: "/media".to_string(),
            },
            node_id: 1,
            repair_on_startup: false,
            seed_demo_data: false,
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
