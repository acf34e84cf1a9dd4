// ViewerContext Extractor - gives handlers the authenticated viewer

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Handler-side handle on the request's ViewerContext. Only available on
/// routes behind `viewer_context_middleware`.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }
}

// Access ViewerContext fields directly, e.g. `vc.user_id`
impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Unauthenticated("No viewer for this request".to_string()));

        async move { vc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserId;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_viewer_from_extensions() {
        let (mut parts, _) = Request::new(()).into_parts();
        parts
            .extensions
            .insert(Arc::new(ViewerContext::new(UserId(5))));

        let vc = Vc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(vc.user_id, UserId(5));
    }

    #[tokio::test]
    async fn test_missing_viewer_is_unauthenticated() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = Vc::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }
}
