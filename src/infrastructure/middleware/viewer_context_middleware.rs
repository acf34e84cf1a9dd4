// ViewerContext Middleware - verifies the bearer token and injects the
// request-scoped ViewerContext into the request extensions

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::infrastructure::security::AuthProvider;
use crate::infrastructure::viewer::ViewerContext;

/// Application state that can verify tokens
pub trait HasAuthProvider {
    fn auth_provider(&self) -> &Arc<dyn AuthProvider>;
}

pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasAuthProvider + Clone + Send + Sync + 'static,
{
    let token = extract_bearer_token(request.headers())?;
    let user_id = app_state.auth_provider().verify_token(token).await?;

    request
        .extensions_mut()
        .insert(Arc::new(ViewerContext::new(user_id)));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Malformed Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthenticated(
            "Expected a Bearer token".to_string(),
        )),
    }
}
