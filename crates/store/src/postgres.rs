use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::StockStatus;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ExpirationQuery, InventoryKey, InventoryRecord, InventoryStore, OrderId, OrderRecord,
    OrderStore, ProductId, Result, StoreError, Version,
};

const ORDER_COLUMNS: &str =
    "order_id, order_number, status, customer_email, expires_at, version, updated_at, document";

const INVENTORY_COLUMNS: &str = "product_id, variant, quantity, low_stock_threshold, \
     track_quantity, allow_backorder, stock_status, updated_at";

/// SQL mirror of `common::recompute_stock_status` for a quantity expression.
fn stock_status_case(quantity: &str) -> String {
    format!(
        "CASE \
            WHEN NOT track_quantity THEN 'in-stock' \
            WHEN {quantity} <= 0 AND allow_backorder THEN 'backorder' \
            WHEN {quantity} <= 0 THEN 'out-of-stock' \
            WHEN {quantity} <= low_stock_threshold THEN 'low-stock' \
            ELSE 'in-stock' \
         END"
    )
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            order_number: row.try_get("order_number")?,
            status: row.try_get("status")?,
            customer_email: row.try_get("customer_email")?,
            expires_at: row.try_get::<Option<DateTime<Utc>>, _>("expires_at")?,
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
            document: row.try_get("document")?,
        })
    }

    fn row_to_inventory(row: PgRow) -> Result<InventoryRecord> {
        let variant: String = row.try_get("variant")?;
        let stock_status: String = row.try_get("stock_status")?;

        Ok(InventoryRecord {
            key: InventoryKey {
                product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                variant: (!variant.is_empty()).then_some(variant),
            },
            quantity: row.try_get("quantity")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            track_quantity: row.try_get("track_quantity")?,
            allow_backorder: row.try_get("allow_backorder")?,
            stock_status: StockStatus::parse(&stock_status).ok_or_else(|| {
                StoreError::Serialization(serde::de::Error::custom(format!(
                    "unknown stock status {stock_status:?}"
                )))
            })?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn current_version(&self, order_id: OrderId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, record: OrderRecord) -> Result<Version> {
        let order_id = record.order_id;
        let order_number = record.order_number.clone();

        sqlx::query(
            r#"
            INSERT INTO orders (order_id, order_number, status, customer_email, expires_at, version, updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(&record.order_number)
        .bind(&record.status)
        .bind(&record.customer_email)
        .bind(record.expires_at)
        .bind(Version::first().as_i64())
        .bind(record.updated_at)
        .bind(&record.document)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_order_number") => {
                        return StoreError::DuplicateOrderNumber(order_number.clone());
                    }
                    Some("orders_pkey") => return StoreError::DuplicateOrder(order_id),
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(Version::first())
    }

    async fn update_order(&self, record: OrderRecord, expected: Version) -> Result<Version> {
        // order_number is deliberately absent from the SET list.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET status = $3,
                customer_email = $4,
                expires_at = $5,
                updated_at = $6,
                document = $7,
                version = version + 1
            WHERE order_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(record.order_id.as_uuid())
        .bind(expected.as_i64())
        .bind(&record.status)
        .bind(&record.customer_email)
        .bind(record.expires_at)
        .bind(record.updated_at)
        .bind(&record.document)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(version) => Ok(Version::new(version)),
            None => match self.current_version(record.order_id).await? {
                Some(actual) => {
                    tracing::debug!(
                        order_id = %record.order_id,
                        %expected,
                        %actual,
                        "order version conflict"
                    );
                    metrics::counter!("store_version_conflicts_total", "backend" => "postgres")
                        .increment(1);
                    Err(StoreError::ConcurrencyConflict {
                        order_id: record.order_id,
                        expected,
                        actual,
                    })
                }
                None => Err(StoreError::OrderNotFound(record.order_id)),
            },
        }
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_expired(&self, query: ExpirationQuery) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE expires_at IS NOT NULL
              AND expires_at <= $1
              AND status = ANY($2)
            ORDER BY expires_at ASC
            LIMIT $3
            "#
        ))
        .bind(query.now)
        .bind(&query.statuses)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn put_inventory(&self, mut record: InventoryRecord) -> Result<()> {
        record.refresh_status();

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, variant, quantity, low_stock_threshold, track_quantity, allow_backorder, stock_status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (product_id, variant) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                low_stock_threshold = EXCLUDED.low_stock_threshold,
                track_quantity = EXCLUDED.track_quantity,
                allow_backorder = EXCLUDED.allow_backorder,
                stock_status = EXCLUDED.stock_status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.key.product_id.as_str())
        .bind(record.key.variant_column())
        .bind(record.quantity)
        .bind(record.low_stock_threshold)
        .bind(record.track_quantity)
        .bind(record.allow_backorder)
        .bind(record.stock_status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_inventory(&self, key: &InventoryKey) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE product_id = $1 AND variant = $2"
        ))
        .bind(key.product_id.as_str())
        .bind(key.variant_column())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_inventory).transpose()
    }

    async fn try_decrement(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord> {
        // Check and decrement in one statement; the row lock taken by UPDATE
        // serializes concurrent reservations of the same key.
        let sql = format!(
            r#"
            UPDATE inventory
            SET quantity = CASE WHEN track_quantity THEN quantity - $3 ELSE quantity END,
                stock_status = {status},
                updated_at = NOW()
            WHERE product_id = $1
              AND variant = $2
              AND (NOT track_quantity OR allow_backorder OR quantity >= $3)
            RETURNING {INVENTORY_COLUMNS}
            "#,
            status = stock_status_case("quantity - $3"),
        );

        let row = sqlx::query(&sql)
            .bind(key.product_id.as_str())
            .bind(key.variant_column())
            .bind(i64::from(quantity))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_inventory(row),
            None => match self.get_inventory(key).await? {
                Some(current) => {
                    tracing::debug!(
                        %key,
                        requested = quantity,
                        available = current.quantity,
                        "decrement rejected"
                    );
                    metrics::counter!("store_decrements_rejected_total", "backend" => "postgres")
                        .increment(1);
                    Err(StoreError::InsufficientStock {
                        key: key.clone(),
                        requested: quantity,
                        available: current.quantity,
                    })
                }
                None => Err(StoreError::InventoryNotFound(key.clone())),
            },
        }
    }

    async fn increment(&self, key: &InventoryKey, quantity: u32) -> Result<InventoryRecord> {
        let sql = format!(
            r#"
            UPDATE inventory
            SET quantity = CASE WHEN track_quantity THEN quantity + $3 ELSE quantity END,
                stock_status = {status},
                updated_at = NOW()
            WHERE product_id = $1 AND variant = $2
            RETURNING {INVENTORY_COLUMNS}
            "#,
            status = stock_status_case("quantity + $3"),
        );

        let row = sqlx::query(&sql)
            .bind(key.product_id.as_str())
            .bind(key.variant_column())
            .bind(i64::from(quantity))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_inventory(row),
            None => Err(StoreError::InventoryNotFound(key.clone())),
        }
    }
}
