use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use uuid::Uuid;

use crate::http::AppError;
use crate::AppState;

/// The calling user, as asserted by the gateway in front of the API.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminToken;

const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing x-user-id header"))?;

        let user_id = Uuid::parse_str(user_id.trim())
            .map_err(|_| AppError::unauthorized("invalid x-user-id header"))?;

        Ok(AuthUser { user_id })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if provided != expected {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
