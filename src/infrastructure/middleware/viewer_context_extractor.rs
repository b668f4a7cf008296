// ViewerContext Extractor - handler-side access to the authenticated viewer

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Authenticated viewer. Extraction fails with 401 when the middleware found no token.
///
/// ```ignore
/// async fn handler(vc: Vc, Json(body): Json<CreateCommentRequest>) -> AppResult<...> {
///     service.create_comment(&vc.actor, post_id, &body.description).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

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
            .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()));

        async move { vc }
    }
}

/// Viewer for routes that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct MaybeVc(pub Option<Vc>);

impl<S> FromRequestParts<S> for MaybeVc
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()));

        async move { Ok(MaybeVc(vc)) }
    }
}
