//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cashpoint_shared::types::{ActorId, PointId};
use cashpoint_shared::{AppError, Claims, JwtError, Role};

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates identity-provider tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::from(AppError::Unauthorized(
            "Authorization header with Bearer token is required".to_string(),
        ))
        .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let message = match e {
                JwtError::Expired => "Token has expired",
                _ => "Invalid or malformed token",
            };
            ApiError::from(AppError::Unauthorized(message.to_string())).into_response()
        }
    }
}

/// Extractor for the authenticated actor.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let actor_id = auth.actor_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the actor ID from the claims.
    #[must_use]
    pub const fn actor_id(&self) -> ActorId {
        ActorId::from_uuid(self.0.actor_id())
    }

    /// Returns the point the token assigns the actor to.
    #[must_use]
    pub fn point_id(&self) -> Option<PointId> {
        self.0.assigned_point_id().map(PointId::from_uuid)
    }

    /// Returns the actor's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.0
    }

    /// Rejects actors that are not ADMIN or SUPER.
    ///
    /// # Errors
    ///
    /// Returns a forbidden error for operators.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.role.is_administrative() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("role {} cannot perform this operation", self.0.role)).into())
        }
    }

    /// Rejects operators acting on a point other than their own.
    ///
    /// # Errors
    ///
    /// Returns a forbidden error when the point is not accessible.
    pub fn ensure_point_access(&self, point_id: PointId) -> Result<(), ApiError> {
        if self.0.can_access_point(point_id.into_inner()) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("not assigned to point {point_id}")).into())
        }
    }

    /// Resolves the point the actor works on: the one in the token, else the
    /// active assignment on record.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NoAssignedPoint` when neither exists.
    pub async fn working_point(&self, state: &AppState) -> Result<PointId, ApiError> {
        if let Some(point_id) = self.point_id() {
            return Ok(point_id);
        }
        Ok(state.assignments.current_point(self.actor_id()).await?)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into())
    }
}
