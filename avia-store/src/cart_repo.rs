use async_trait::async_trait;
use avia_core::CartRepository;
use avia_order::{CartItem, CartLine, NewCartItem};
use avia_shared::RepoResult;
use sqlx::PgPool;

use crate::rows::{store_err, CartItemRow, CartLineRow, CART_LINE_SELECT};

pub struct PostgresCartRepository {
    pool: PgPool,
}

impl PostgresCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PostgresCartRepository {
    async fn lines(&self, user_id: i64) -> RepoResult<Vec<CartLine>> {
        let sql = format!("{} WHERE c.user_id = $1 ORDER BY c.id", CART_LINE_SELECT);
        sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(CartLine::try_from)
            .collect()
    }

    async fn add(&self, item: NewCartItem) -> RepoResult<CartItem> {
        let row = sqlx::query_as::<_, CartItemRow>(
            "INSERT INTO cart_items (user_id, flight_id, passenger_name) VALUES ($1, $2, $3) \
             RETURNING id, user_id, flight_id, passenger_name, created_at, updated_at",
        )
        .bind(item.user_id)
        .bind(item.flight_id)
        .bind(&item.passenger_name)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.into())
    }

    async fn remove(&self, user_id: i64, item_id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected() > 0)
    }
}
