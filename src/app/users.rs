use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, email: &str) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (id, email) VALUES ($1, $2) \
             RETURNING id, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email.trim().to_lowercase())
        .fetch_one(self.db.pool())
        .await?;

        Ok(User {
            id: row.get("id"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        let user = row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        });

        Ok(user)
    }
}
