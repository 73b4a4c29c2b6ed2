//! Actor identity as issued by the external identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Till operator, works on the point they are assigned to.
    Operator,
    /// Administrator of the point network.
    Admin,
    /// Unrestricted access.
    Super,
}

impl Role {
    /// Returns true if the role may run reconciliation and read other points.
    #[must_use]
    pub const fn is_administrative(self) -> bool {
        matches!(self, Self::Admin | Self::Super)
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "OPERATOR",
            Self::Admin => "ADMIN",
            Self::Super => "SUPER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims carried by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor ID).
    pub sub: Uuid,
    /// Point of attention the actor is currently assigned to, if any.
    #[serde(default)]
    pub point: Option<Uuid>,
    /// Actor role.
    pub role: Role,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an actor.
    #[must_use]
    pub fn new(actor_id: Uuid, point_id: Option<Uuid>, role: Role, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: actor_id,
            point: point_id,
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the actor ID from claims.
    #[must_use]
    pub const fn actor_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the assigned point from claims.
    #[must_use]
    pub const fn assigned_point_id(&self) -> Option<Uuid> {
        self.point
    }

    /// Returns true if the actor may operate on the given point.
    #[must_use]
    pub fn can_access_point(&self, point_id: Uuid) -> bool {
        self.role.is_administrative() || self.point == Some(point_id)
    }
}
