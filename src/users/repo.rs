use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 PHC string
    pub profile_info: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub profile_info: Option<String>,
    pub profile_picture: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_info: Option<String>,
    pub profile_picture: Option<String>,
    pub hashed_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub user_id: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
}

/// A write collided with the unique username or email constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Duplicate {
    #[error("Username already registered")]
    Username,
    #[error("Email already registered")]
    Email,
}

/// Turns a unique violation into [`Duplicate`]; anything else keeps its context.
fn map_unique(e: sqlx::Error, what: &'static str) -> anyhow::Error {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return if db.constraint().is_some_and(|c| c.contains("email")) {
                Duplicate::Email.into()
            } else {
                Duplicate::Username.into()
            };
        }
    }
    anyhow::Error::new(e).context(what)
}

/// User persistence as seen by the auth core and the profile handlers.
///
/// Identity resolution only ever calls [`UserRepository::find_by_id`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;
    async fn update(&self, user_id: i64, changes: UserChanges) -> anyhow::Result<Option<User>>;
    /// Returns `false` when no row was removed.
    async fn delete(&self, user_id: i64) -> anyhow::Result<bool>;
    async fn search(&self, query: &str, skip: i64, limit: i64) -> anyhow::Result<Vec<User>>;
    async fn stats(&self, user_id: i64) -> anyhow::Result<UserStats>;
    async fn is_following(&self, follower_id: i64, followee_id: i64) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str =
    "user_id, username, email, hashed_password, profile_info, profile_picture, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {filter}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, hashed_password, profile_info, profile_picture)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new_user.username)
            .bind(new_user.email)
            .bind(new_user.hashed_password)
            .bind(new_user.profile_info)
            .bind(new_user.profile_picture)
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_unique(e, "insert user"))?;
        Ok(user)
    }

    async fn update(&self, user_id: i64, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET username        = COALESCE($2, username),
                   email           = COALESCE($3, email),
                   profile_info    = COALESCE($4, profile_info),
                   profile_picture = COALESCE($5, profile_picture),
                   hashed_password = COALESCE($6, hashed_password),
                   updated_at      = now()
             WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.profile_info)
            .bind(changes.profile_picture)
            .bind(changes.hashed_password)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_unique(e, "update user"))?;
        Ok(user)
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &str, skip: i64, limit: i64) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE strpos(username, $1) > 0
             ORDER BY user_id
            OFFSET $2 LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(query)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .context("search users")?;
        Ok(rows)
    }

    async fn stats(&self, user_id: i64) -> anyhow::Result<UserStats> {
        let (followers_count, following_count, posts_count) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT (SELECT COUNT(*) FROM follows WHERE followee_id = $1),
                       (SELECT COUNT(*) FROM follows WHERE follower_id = $1),
                       (SELECT COUNT(*) FROM posts   WHERE user_id     = $1)
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .context("user stats")?;
        Ok(UserStats {
            user_id,
            followers_count,
            following_count,
            posts_count,
        })
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.db)
        .await
        .context("check follow")?;
        Ok(exists)
    }
}
