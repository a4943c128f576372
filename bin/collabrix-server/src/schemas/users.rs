use crate::entities::{ProfilePatch, UserRecord};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Missing fields deserialize as `None` so the handler can answer with a
/// single validation message instead of a serde rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub user_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub biography: Option<String>,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl From<UpdateProfileRequest> for ProfilePatch {
    /// Blank strings count as "not provided".
    fn from(req: UpdateProfileRequest) -> Self {
        ProfilePatch {
            username: non_empty(req.username),
            biography: non_empty(req.biography),
            business_name: non_empty(req.business_name),
            location: non_empty(req.location),
            interests: non_empty(req.interests),
            expertise: non_empty(req.expertise),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingRequest {
    /// Must be in `(0, 5]`.
    pub rating: f64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RandomUsersQuery {
    /// How many profiles to sample (default 5, max 50).
    pub size: Option<usize>,
}

/// Public view of a user. Email and password hash are never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub biography: Option<String>,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
    pub points: f64,
    /// Derived from `points`.
    pub tier: u8,
    pub is_admin: bool,
    pub created_at: String,
}

impl UserRecord {
    pub fn to_profile(&self) -> ProfileResponse {
        ProfileResponse {
            id: self.id.clone(),
            username: self.username.clone(),
            biography: self.biography.clone(),
            business_name: self.business_name.clone(),
            location: self.location.clone(),
            interests: self.interests.clone(),
            expertise: self.expertise.clone(),
            points: self.points,
            tier: self.tier().level(),
            is_admin: self.is_admin,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
