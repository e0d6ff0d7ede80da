//! User repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::connection::conflict_on_unique;
use crate::database::store::UserStore;
use crate::models::user::{CreateUserRequest, User};
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    /// Create a new user
    async fn insert_user(&self, request: CreateUserRequest) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, role, club_id, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name)
        .bind(request.email)
        .bind(request.role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a user with this email already exists"))
    }

    /// Find user by ID
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, club_id, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, club_id, is_active, created_at
            FROM users
            WHERE role <> 'admin'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Block or unblock an account
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_active = $2
            WHERE id = $1
            RETURNING id, name, email, role, club_id, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
