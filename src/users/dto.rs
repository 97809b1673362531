use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::{User, UserStats};

/// Public user representation; the password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub profile_info: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            username: u.username,
            email: u.email,
            profile_info: u.profile_info,
            profile_picture: u.profile_picture,
            created_at: u.created_at,
            posts_count: 0,
            followers_count: 0,
            following_count: 0,
        }
    }
}

impl UserResponse {
    pub fn with_stats(mut self, stats: UserStats) -> Self {
        self.posts_count = stats.posts_count;
        self.followers_count = stats.followers_count;
        self.following_count = stats.following_count;
        self
    }
}

/// Profile as seen by a particular viewer.
#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub is_following: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_info: Option<String>,
    pub profile_picture: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 {
    20
}
