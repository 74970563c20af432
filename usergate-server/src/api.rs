//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use usergate_core::{NewUser, User, UserPatch};
use utoipa::ToSchema;

/// User as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Identifier assigned on create
    #[schema(example = "42")]
    pub id: String,

    /// Display name
    #[schema(example = "Alice")]
    pub name: String,

    /// Contact email
    #[schema(example = "alice@example.com")]
    pub email: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Display name, must not be blank
    #[schema(example = "Alice")]
    pub name: String,

    /// Contact email
    #[schema(example = "alice@example.com")]
    pub email: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser::new(req.name, req.email)
    }
}

/// Partial update request; omitted fields are unchanged
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,

    /// New email
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        UserPatch {
            name: req.name,
            email: req.email,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,

    /// Service version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Number of stored users
    pub users: usize,
}

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Service cannot serve user requests
    Unhealthy,
}
