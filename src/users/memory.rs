use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{Duplicate, NewUser, User, UserChanges, UserRepository, UserStats};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    follows: Vec<(i64, i64)>,
    post_authors: Vec<i64>,
    next_id: i64,
}

/// In-process stand-in for the Postgres repository.
#[derive(Default)]
pub struct MemoryUserRepository {
    tables: Mutex<Tables>,
}

impl Tables {
    fn conflict(
        &self,
        user_id: i64,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Option<Duplicate> {
        let others = || self.users.iter().filter(move |u| u.user_id != user_id);
        if let Some(name) = username {
            if others().any(|u| u.username == name) {
                return Some(Duplicate::Username);
            }
        }
        if let Some(email) = email {
            if others().any(|u| u.email == email) {
                return Some(Duplicate::Email);
            }
        }
        None
    }
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, username: &str, email: &str, hashed_password: &str) -> User {
        let mut t = self.tables.lock().unwrap();
        t.next_id += 1;
        let user = User {
            user_id: t.next_id,
            username: username.into(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            profile_info: None,
            profile_picture: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        t.users.push(user.clone());
        user
    }

    pub fn follow(&self, follower_id: i64, followee_id: i64) {
        self.tables.lock().unwrap().follows.push((follower_id, followee_id));
    }

    pub fn add_post(&self, user_id: i64) {
        self.tables.lock().unwrap().post_authors.push(user_id);
    }

    pub fn remove(&self, user_id: i64) {
        self.tables.lock().unwrap().users.retain(|u| u.user_id != user_id);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, user_id: i64) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        {
            let t = self.tables.lock().unwrap();
            if let Some(dup) = t.conflict(0, Some(&new_user.username), Some(&new_user.email)) {
                return Err(dup.into());
            }
        }
        let user = self.insert(&new_user.username, &new_user.email, &new_user.hashed_password);
        let mut t = self.tables.lock().unwrap();
        let stored = t
            .users
            .iter_mut()
            .find(|u| u.user_id == user.user_id)
            .expect("just inserted");
        stored.profile_info = new_user.profile_info;
        stored.profile_picture = new_user.profile_picture;
        Ok(stored.clone())
    }

    async fn update(&self, user_id: i64, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().unwrap();
        if let Some(dup) = t.conflict(user_id, changes.username.as_deref(), changes.email.as_deref()) {
            return Err(dup.into());
        }
        let Some(user) = t.users.iter_mut().find(|u| u.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.profile_info {
            user.profile_info = Some(v);
        }
        if let Some(v) = changes.profile_picture {
            user.profile_picture = Some(v);
        }
        if let Some(v) = changes.hashed_password {
            user.hashed_password = v;
        }
        user.updated_at = Some(OffsetDateTime::now_utc());
        Ok(Some(user.clone()))
    }

    async fn delete(&self, user_id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.user_id != user_id);
        t.follows
            .retain(|&(a, b)| a != user_id && b != user_id);
        Ok(t.users.len() < before)
    }

    async fn search(&self, query: &str, skip: i64, limit: i64) -> anyhow::Result<Vec<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .iter()
            .filter(|u| u.username.contains(query))
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn stats(&self, user_id: i64) -> anyhow::Result<UserStats> {
        let t = self.tables.lock().unwrap();
        Ok(UserStats {
            user_id,
            followers_count: t.follows.iter().filter(|f| f.1 == user_id).count() as i64,
            following_count: t.follows.iter().filter(|f| f.0 == user_id).count() as i64,
            posts_count: t.post_authors.iter().filter(|&&a| a == user_id).count() as i64,
        })
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> anyhow::Result<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.follows.contains(&(follower_id, followee_id)))
    }
}
