//! Postgres-backed document store.
//!
//! Every collection is a table holding the serialized document in a `doc`
//! JSONB column, plus the handful of fields queries filter or sort on
//! broken out into typed columns. The document is the source of truth; the
//! typed columns are rewritten from it on every write.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` | Duplicate category name or id |
//! | Database (other) | Any other | `Backend` | Constraint or syntax failures |
//! | ColumnDecode / Decode | N/A | `Serialization` | Stored document no longer matches the type |
//! | Other | N/A | `Backend` | Pool closed, network errors, etc. |

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use storefront_catalog::{Category, Product, ProductFilter, ProductMutation, ProductSort};
use storefront_core::{CategoryId, DomainError, ProductId, UserId};
use storefront_sales::{Order, ProductSales, QuarterlySales};

use super::{
    CategoryStore, OrderStore, ProductStore, StoreError, StoreResult, UserDirectory, UserSummary,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        seq BIGSERIAL,
        id UUID PRIMARY KEY,
        category_id UUID NOT NULL,
        brand TEXT NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        rating DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        doc JSONB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (category_id)",
    "CREATE INDEX IF NOT EXISTS products_seq_idx ON products (seq)",
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        doc JSONB NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS categories_name_key ON categories (lower(name))",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        is_paid BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        doc JSONB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS orders_paid_idx ON orders (is_paid)",
];

/// Quarterly top-sellers as one CTE chain: unwind paid order lines, sum per
/// (product, year, quarter), rank products by overall units, then fold each
/// ranked product's quarters into a chronological JSON array.
const TOP_SELLERS_SQL: &str = r#"
    WITH lines AS (
        SELECT
            (item->>'product')::uuid AS product_id,
            item->>'name' AS line_name,
            (item->>'quantity')::bigint AS quantity,
            o.created_at,
            EXTRACT(YEAR FROM o.created_at AT TIME ZONE 'UTC')::int AS year,
            CASE
                WHEN EXTRACT(MONTH FROM o.created_at AT TIME ZONE 'UTC') <= 3 THEN 1
                WHEN EXTRACT(MONTH FROM o.created_at AT TIME ZONE 'UTC') <= 6 THEN 2
                WHEN EXTRACT(MONTH FROM o.created_at AT TIME ZONE 'UTC') <= 9 THEN 3
                ELSE 4
            END AS quarter
        FROM orders o
        CROSS JOIN LATERAL jsonb_array_elements(o.doc->'orderItems') AS item
        WHERE o.is_paid
    ),
    per_quarter AS (
        SELECT product_id, year, quarter, SUM(quantity)::bigint AS total_sales
        FROM lines
        GROUP BY product_id, year, quarter
    ),
    ranked AS (
        SELECT product_id, SUM(total_sales)::bigint AS total_overall
        FROM per_quarter
        GROUP BY product_id
        ORDER BY total_overall DESC, product_id ASC
        LIMIT $1
    )
    SELECT
        r.product_id,
        r.total_overall,
        (
            SELECT l.line_name FROM lines l
            WHERE l.product_id = r.product_id
            ORDER BY l.created_at ASC
            LIMIT 1
        ) AS line_name,
        jsonb_agg(
            jsonb_build_object(
                'quarter', pq.quarter,
                'year', pq.year,
                'totalSales', pq.total_sales
            )
            ORDER BY pq.year, pq.quarter
        ) AS sales_data
    FROM ranked r
    JOIN per_quarter pq ON pq.product_id = r.product_id
    GROUP BY r.product_id, r.total_overall
    ORDER BY r.total_overall DESC, r.product_id ASC
"#;

/// Postgres-backed document store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`. Product mutations
/// lock the row with `SELECT ... FOR UPDATE` inside a transaction.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect, then create any missing tables and indexes.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn write_product<'e, E>(executor: E, product: &Product, upsert: bool) -> StoreResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = if upsert {
            r#"
            UPDATE products
            SET category_id = $2, brand = $3, price = $4, rating = $5, created_at = $6, doc = $7
            WHERE id = $1
            "#
        } else {
            r#"
            INSERT INTO products (id, category_id, brand, price, rating, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#
        };

        sqlx::query(sql)
            .bind(Uuid::from(product.id_typed()))
            .bind(Uuid::from(product.category()))
            .bind(product.brand())
            .bind(product.price())
            .bind(product.rating())
            .bind(product.created_at())
            .bind(encode_doc(product)?)
            .execute(executor)
            .await
            .map_err(|e| map_sqlx_error("write_product", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresDocumentStore {
    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        Self::write_product(&*self.pool, &product, false).await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(decode_doc).transpose()
    }

    #[instrument(skip(self, mutation), fields(product_id = %id), err)]
    async fn modify_product(
        &self,
        id: ProductId,
        mutation: ProductMutation,
    ) -> StoreResult<Product> {
        let span = Span::current();
        span.record("operation", "modify_product");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;

        // Dropping `tx` on any early return rolls back and releases the lock.
        let Some(row) = row else {
            return Err(DomainError::not_found("product").into());
        };
        let mut product: Product = decode_doc(&row)?;
        mutation.apply(&mut product)?;

        Self::write_product(&mut *tx, &product, true).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("DELETE FROM products WHERE id = $1 RETURNING doc")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        row.as_ref().map(decode_doc).transpose()
    }

    async fn count_products(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_products(&self, skip: u64, limit: u32) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query("SELECT doc FROM products ORDER BY seq ASC OFFSET $1 LIMIT $2")
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(decode_doc).collect()
    }

    async fn find_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let rows = filter_query(filter)
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_products", e))?;
        rows.iter().map(decode_doc).collect()
    }

    async fn sorted_products(&self, sort: ProductSort, limit: usize) -> StoreResult<Vec<Product>> {
        let sql = match sort {
            ProductSort::TopRated => {
                "SELECT doc FROM products ORDER BY rating DESC, seq ASC LIMIT $1"
            }
            ProductSort::Newest => {
                "SELECT doc FROM products ORDER BY created_at DESC, seq ASC LIMIT $1"
            }
        };
        let rows = sqlx::query(sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sorted_products", e))?;
        rows.iter().map(decode_doc).collect()
    }

    async fn products_in_category(&self, category: CategoryId) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query("SELECT doc FROM products WHERE category_id = $1 ORDER BY seq ASC")
            .bind(Uuid::from(category))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("products_in_category", e))?;
        rows.iter().map(decode_doc).collect()
    }

    async fn distinct_brands(&self, categories: &[CategoryId]) -> StoreResult<Vec<String>> {
        // Byte order, to match `String`'s `Ord`.
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT brand FROM products
            WHERE category_id = ANY($1)
            ORDER BY brand COLLATE "C"
            "#,
        )
        .bind(uuids(categories))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("distinct_brands", e))
    }
}

#[async_trait]
impl CategoryStore for PostgresDocumentStore {
    #[instrument(skip(self, category), fields(category_id = %category.id_typed()), err)]
    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        let result = sqlx::query("INSERT INTO categories (id, name, doc) VALUES ($1, $2, $3)")
            .bind(Uuid::from(category.id_typed()))
            .bind(category.name())
            .bind(encode_doc(&category)?)
            .execute(&*self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(DomainError::conflict("category already exists").into())
            }
            Err(e) => Err(map_sqlx_error("insert_category", e)),
        }
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT doc FROM categories WHERE id = ANY($1)")
            .bind(uuids(ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_categories", e))?;
        rows.iter().map(decode_doc).collect()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"SELECT doc FROM categories ORDER BY lower(name) COLLATE "C", name COLLATE "C""#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(decode_doc).collect()
    }
}

#[async_trait]
impl UserDirectory for PostgresDocumentStore {
    async fn upsert_user(&self, user: UserSummary) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        Ok(())
    }

    async fn find_users(&self, ids: &[UserId]) -> StoreResult<Vec<UserSummary>> {
        let rows = sqlx::query("SELECT id, username FROM users WHERE id = ANY($1)")
            .bind(uuids(ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_users", e))?;

        rows.iter()
            .map(|row| {
                Ok(UserSummary {
                    id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
                    username: row.try_get("username").map_err(decode_error)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresDocumentStore {
    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        sqlx::query("INSERT INTO orders (id, is_paid, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::from(order.id_typed()))
            .bind(order.is_paid())
            .bind(order.created_at())
            .bind(encode_doc(&order)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn top_sellers(&self, limit: usize) -> StoreResult<Vec<ProductSales>> {
        let rows = sqlx::query(TOP_SELLERS_SQL)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("top_sellers", e))?;

        rows.iter()
            .map(|row| {
                let product_id: Uuid = row.try_get("product_id").map_err(decode_error)?;
                let total: i64 = row.try_get("total_overall").map_err(decode_error)?;
                let line_name: Option<String> = row.try_get("line_name").map_err(decode_error)?;
                let sales_data: serde_json::Value =
                    row.try_get("sales_data").map_err(decode_error)?;
                let sales_data: Vec<QuarterlySales> = serde_json::from_value(sales_data)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;

                Ok(ProductSales {
                    product_id: ProductId::from_uuid(product_id),
                    line_name: line_name.unwrap_or_default(),
                    sales_data,
                    total_sales_overall: u64::try_from(total).unwrap_or(0),
                })
            })
            .collect()
    }
}

/// Translate a filter into SQL. Brand entries are bound as values and
/// matched with `strpos`, so they never act as patterns.
fn filter_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM products WHERE TRUE");

    if let Some(categories) = &filter.categories {
        qb.push(" AND category_id = ANY(")
            .push_bind(uuids(categories))
            .push(")");
    }

    if let Some(brands) = &filter.brands {
        qb.push(" AND (");
        let mut any = qb.separated(" OR ");
        for brand in brands {
            any.push("brand = ");
            any.push_bind_unseparated(brand.clone());
            any.push("strpos(lower(brand), lower(");
            any.push_bind_unseparated(brand.clone());
            any.push_unseparated(")) > 0");
        }
        qb.push(")");
    }

    if let Some(max_price) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max_price);
    }

    qb.push(" ORDER BY seq ASC");
    qb
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn encode_doc<T: Serialize>(doc: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_doc<T: DeserializeOwned>(row: &PgRow) -> StoreResult<T> {
    let value: serde_json::Value = row.try_get("doc").map_err(decode_error)?;
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Serialization(err.to_string())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}
