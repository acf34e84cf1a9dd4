// Campus Graph - social graph and feed core for a campus network

// Core types and primitives
pub mod core;

// Infrastructure - document store, caching, ids, media and auth
pub mod infrastructure;

// Domain models and the views built from them
pub mod models;

// Social graph, content, engagement and feed services
pub mod services;

// HTTP facade and application wiring
pub mod app_state;
pub mod config;
pub mod social_interface;

// Common utilities
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
