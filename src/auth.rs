//! Caller identity extracted from headers set by the upstream session
//! provider. This service trusts the reverse proxy to authenticate users
//! and only consumes the resulting role and actor id.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated actor id (UUID).
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated actor role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Role granted to the caller by the session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full contest-control capability.
    Admin,
    /// Grading and retry-resolution capability.
    Jury,
    /// Submission capability.
    Participant,
}

impl Role {
    /// Parse the wire representation of a role.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "JURY" => Some(Self::Jury),
            "PARTICIPANT" => Some(Self::Participant),
            _ => None,
        }
    }

    /// Stable name used in audit entries and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Jury => "JURY",
            Self::Participant => "PARTICIPANT",
        }
    }
}

/// Authenticated caller attached to each control/grading request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    /// Actor identifier issued by the session provider. For participants
    /// this is the team id.
    pub id: Uuid,
    /// Role the session provider granted.
    pub role: Role,
}

impl Caller {
    /// Ensure the caller holds `required`, admins passing every check.
    pub fn require(&self, required: Role) -> Result<(), crate::error::ServiceError> {
        if self.role == required || self.role == Role::Admin {
            Ok(())
        } else {
            Err(crate::error::ServiceError::Unauthorized(format!(
                "{} role required, caller is {}",
                required.as_str(),
                self.role.as_str()
            )))
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized(format!("missing `{name}` header")))
        };

        let id = header(ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized(format!("invalid `{ACTOR_ID_HEADER}` header")))?;

        let role = Role::parse(header(ACTOR_ROLE_HEADER)?).ok_or_else(|| {
            AppError::Unauthorized(format!("invalid `{ACTOR_ROLE_HEADER}` header"))
        })?;

        Ok(Caller { id, role })
    }
}
