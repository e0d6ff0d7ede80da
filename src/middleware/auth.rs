//! Request identity extraction
//!
//! `AuthUser` pulls `Authorization: Bearer <token>` off the request and asks
//! the identity provider to verify it, then refuses accounts that were
//! blocked or removed since the token was issued. Handlers that take an
//! `AuthUser` never run for unauthenticated requests.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::services::auth::Identity;
use crate::state::AppState;
use crate::utils::errors::ClubHubError;

/// Authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

/// Token part of a `Bearer` authorization header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ClubHubError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ClubHubError::Unauthenticated("missing authorization header".to_string()))?;

        let token = bearer_token(header).ok_or_else(|| {
            ClubHubError::Unauthenticated("expected 'Bearer <token>'".to_string())
        })?;

        let identity = state.services.auth_service.verify(token)?;
        state.services.user_service.ensure_active(&identity).await?;
        Ok(AuthUser(identity))
    }
}
