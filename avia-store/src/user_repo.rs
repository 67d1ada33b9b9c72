use async_trait::async_trait;
use avia_core::{NewUser, User, UserRepository};
use avia_shared::RepoResult;
use sqlx::PgPool;

use crate::rows::{store_err, UserRow};

const USER_COLUMNS: &str =
    "id, first_name, last_name, phone, document_number, password_hash, photo_url, role, created_at, updated_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (first_name, last_name, phone, document_number, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(&user.document_number)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        User::try_from(row)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_phone(&self, phone: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE phone = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn update_profile(&self, user: &User) -> RepoResult<User> {
        let sql = format!(
            "UPDATE users SET first_name = $2, last_name = $3, phone = $4, document_number = $5, updated_at = $6 \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(&user.document_number)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        User::try_from(row)
    }
}
