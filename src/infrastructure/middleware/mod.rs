// ViewerContext Middleware - bearer token to ViewerContext
// Separates authentication from handlers, which only see `Vc`

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::{viewer_context_middleware, HasAuthProvider};
