use chrono::{DateTime, Utc};
use collabrix_types::{DirectoryUser, Tier};

/// A row in the `users` table.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub biography: Option<String>,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
    pub points: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn tier(&self) -> Tier {
        Tier::from_points(self.points)
    }

    pub fn to_directory_user(&self) -> DirectoryUser {
        DirectoryUser {
            username: self.username.clone(),
            business_name: self.business_name.clone(),
            location: self.location.clone(),
            interests: self.interests.clone(),
            expertise: self.expertise.clone(),
            points: self.points,
        }
    }
}

/// Partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub biography: Option<String>,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub interests: Option<String>,
    pub expertise: Option<String>,
}
