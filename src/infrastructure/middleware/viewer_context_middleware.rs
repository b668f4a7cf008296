// ViewerContext Middleware - turns a bearer access token into a request-scoped viewer
// Handlers never see tokens, only the ViewerContext placed in request extensions

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::viewer::{Actor, ViewerContext},
    models::Role,
};

/// Access token payload shared with the service that signs tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// HS256 signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct AccessTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokens {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token for `actor`. Used by the seeding binary and tests.
    pub fn issue(&self, actor: &Actor, email: &str, ttl: Duration) -> AppResult<String> {
        let claims = Claims {
            id: actor.id,
            email: email.to_string(),
            role: actor.role,
            exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
        Ok(token_data.claims)
    }
}

/// Application state that can verify access tokens
pub trait HasAccessTokens {
    fn access_tokens(&self) -> &AccessTokens;
}

/// Injects `Arc<ViewerContext>` when the request carries a valid bearer token.
/// Requests with a missing or unusable token pass through anonymous.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Response
where
    T: HasAccessTokens + Clone + Send + Sync + 'static,
{
    match extract_actor(request.headers(), app_state.access_tokens()) {
        Ok(Some(actor)) => {
            let viewer = ViewerContext::authenticated(actor);
            tracing::debug!(
                request_id = %viewer.request_id,
                actor = %actor.id,
                role = %actor.role,
                "viewer authenticated"
            );
            request.extensions_mut().insert(Arc::new(viewer));
        }
        Ok(None) => {}
        // Stays anonymous; routes that need a viewer answer 401 through `Vc`
        Err(err) => {
            tracing::warn!("ignoring access token: {}", err);
        }
    }

    next.run(request).await
}

fn extract_actor(headers: &HeaderMap, tokens: &AccessTokens) -> AppResult<Option<Actor>> {
    let Some(auth_header) = headers.get("authorization") else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed authorization header".to_string()))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;

    let claims = tokens.verify(token.trim())?;
    Ok(Some(Actor::new(claims.id, claims.role)))
}
