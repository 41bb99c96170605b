//! Postgres-backed catalog store implementation.
//!
//! Products, categories and subs live in one table each; ratings live in
//! `product_ratings` keyed by `(product_id, posted_by)`, which is what makes
//! the rating upsert race-free.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use storefront_catalog::{Category, Product, Rating, Stars, Sub};
use storefront_core::{CategoryId, ProductId, SubId, UserId};

use super::query::{ProductPredicate, ProductQuery, RatingAggregate, RatingOutcome, UpdateAck};
use super::r#trait::{CatalogStore, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        slug        TEXT NOT NULL UNIQUE,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subs (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        slug        TEXT NOT NULL UNIQUE,
        parent      UUID NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        seq         BIGSERIAL UNIQUE,
        id          UUID PRIMARY KEY,
        title       TEXT NOT NULL,
        slug        TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        price       DOUBLE PRECISION NOT NULL,
        category    UUID NULL,
        subs        UUID[] NOT NULL DEFAULT '{}',
        quantity    INTEGER NOT NULL DEFAULT 0,
        sold        INTEGER NOT NULL DEFAULT 0,
        shipping    BOOLEAN NOT NULL DEFAULT FALSE,
        color       TEXT NOT NULL DEFAULT '',
        brand       TEXT NOT NULL DEFAULT '',
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS products_text_idx
        ON products USING GIN (to_tsvector('english', title || ' ' || description))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_ratings (
        seq         BIGSERIAL,
        product_id  UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        posted_by   UUID NOT NULL,
        star        SMALLINT NOT NULL CHECK (star BETWEEN 1 AND 5),
        PRIMARY KEY (product_id, posted_by)
    )
    "#,
];

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.slug, p.description, p.price, p.category, p.subs, \
     p.quantity, p.sold, p.shipping, p.color, p.brand, p.created_at, p.updated_at";

/// A SQL fragment with `$N` placeholders and its parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// A SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Float(f64),
    Integer(i64),
    Bool(bool),
    Uuid(Uuid),
    UuidArray(Vec<Uuid>),
}

impl SqlParam {
    fn bind<'q>(
        self,
        query: sqlx::query::Query<'q, Postgres, PgArguments>,
    ) -> sqlx::query::Query<'q, Postgres, PgArguments> {
        match self {
            Self::Text(v) => query.bind(v),
            Self::Float(v) => query.bind(v),
            Self::Integer(v) => query.bind(v),
            Self::Bool(v) => query.bind(v),
            Self::Uuid(v) => query.bind(v),
            Self::UuidArray(v) => query.bind(v),
        }
    }
}

/// Compile a product query into a `SELECT` over `products p`.
pub fn compile_product_query(query: &ProductQuery) -> SqlFragment {
    let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE TRUE");
    let mut params = Vec::new();

    for predicate in &query.predicates {
        sql.push_str(" AND ");
        push_predicate(&mut sql, &mut params, predicate);
    }

    match query.sort {
        Some(sort) => sql.push_str(&format!(
            " ORDER BY p.{} {}, p.seq ASC",
            sort.field.column(),
            sort.order.keyword()
        )),
        None => sql.push_str(" ORDER BY p.seq ASC"),
    }

    if query.skip > 0 {
        params.push(SqlParam::Integer(clamp_i64(query.skip)));
        sql.push_str(&format!(" OFFSET ${}", params.len()));
    }
    if let Some(limit) = query.limit {
        params.push(SqlParam::Integer(clamp_i64(limit)));
        sql.push_str(&format!(" LIMIT ${}", params.len()));
    }

    SqlFragment { sql, params }
}

/// OFFSET/LIMIT are BIGINT; saturate instead of wrapping into negatives.
fn clamp_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn next(params: &mut Vec<SqlParam>, param: SqlParam) -> String {
    params.push(param);
    format!("${}", params.len())
}

fn push_predicate(sql: &mut String, params: &mut Vec<SqlParam>, predicate: &ProductPredicate) {
    let clause = match predicate {
        ProductPredicate::Text(q) => format!(
            "to_tsvector('english', p.title || ' ' || p.description) @@ plainto_tsquery('english', {})",
            next(params, SqlParam::Text(q.clone()))
        ),
        ProductPredicate::PriceBetween { min, max } => {
            let lo = next(params, SqlParam::Float(*min));
            let hi = next(params, SqlParam::Float(*max));
            format!("p.price BETWEEN {lo} AND {hi}")
        }
        ProductPredicate::Category(id) => {
            format!("p.category = {}", next(params, SqlParam::Uuid(*id.as_uuid())))
        }
        ProductPredicate::HasSub(id) => {
            format!("{} = ANY(p.subs)", next(params, SqlParam::Uuid(*id.as_uuid())))
        }
        ProductPredicate::Shipping(v) => format!("p.shipping = {}", next(params, SqlParam::Bool(*v))),
        ProductPredicate::Color(v) => format!("p.color = {}", next(params, SqlParam::Text(v.clone()))),
        ProductPredicate::Brand(v) => format!("p.brand = {}", next(params, SqlParam::Text(v.clone()))),
        ProductPredicate::RatingBucket(stars) => format!(
            "p.id IN (SELECT r.product_id FROM product_ratings r GROUP BY r.product_id \
             HAVING FLOOR(AVG(r.star)) = {})",
            next(params, SqlParam::Integer(i64::from(stars.get())))
        ),
        ProductPredicate::IdIn(ids) => format!(
            "p.id = ANY({})",
            next(
                params,
                SqlParam::UuidArray(ids.iter().map(|id| *id.as_uuid()).collect())
            )
        ),
        ProductPredicate::IdNot(id) => format!("p.id <> {}", next(params, SqlParam::Uuid(*id.as_uuid()))),
    };
    sql.push_str(&clause);
}

/// Postgres-backed catalog store.
///
/// Uses the SQLx connection pool (thread-safe); multi-statement writes run in
/// a transaction.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and apply the schema (idempotent).
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn fetch_products(&self, fragment: SqlFragment) -> Result<Vec<Product>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_products_on(&mut *conn, fragment).await
    }

    async fn product_where(&self, column: &str, param: SqlParam) -> Result<Option<Product>, StoreError> {
        let fragment = SqlFragment {
            sql: format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.{column} = $1"),
            params: vec![param],
        };
        Ok(self.fetch_products(fragment).await?.into_iter().next())
    }
}

async fn fetch_products_on(conn: &mut PgConnection, fragment: SqlFragment) -> Result<Vec<Product>, StoreError> {
    let mut query = sqlx::query(&fragment.sql);
    for param in fragment.params {
        query = param.bind(query);
    }
    let rows = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("find_products", e))?;

    let ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.try_get::<Uuid, _>("id"))
        .collect::<Result<_, _>>()
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    let mut ratings = load_ratings(conn, &ids).await?;

    rows.iter()
        .map(|row| {
            let mut product = decode_product(row)?;
            product.ratings = ratings.remove(product.id.as_uuid()).unwrap_or_default();
            Ok(product)
        })
        .collect()
}

async fn load_ratings(conn: &mut PgConnection, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Rating>>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query(
        r#"
        SELECT product_id, posted_by, star
        FROM product_ratings
        WHERE product_id = ANY($1)
        ORDER BY seq ASC
        "#,
    )
    .bind(ids.to_vec())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_ratings", e))?;

    let mut by_product: HashMap<Uuid, Vec<Rating>> = HashMap::new();
    for row in rows {
        let product_id: Uuid = row.try_get("product_id").map_err(decode_err)?;
        let posted_by: Uuid = row.try_get("posted_by").map_err(decode_err)?;
        let star: i16 = row.try_get("star").map_err(decode_err)?;
        let star = u8::try_from(star)
            .ok()
            .and_then(|s| Stars::new(s).ok())
            .ok_or_else(|| StoreError::Decode(format!("star out of range: {star}")))?;
        by_product.entry(product_id).or_default().push(Rating {
            star,
            posted_by: UserId::from_uuid(posted_by),
        });
    }
    Ok(by_product)
}

fn decode_err(e: sqlx::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}

fn decode_counter(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let v: i32 = row.try_get(column).map_err(decode_err)?;
    u32::try_from(v).map_err(|_| StoreError::Decode(format!("{column} is negative: {v}")))
}

fn encode_counter(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn decode_product(row: &PgRow) -> Result<Product, StoreError> {
    let category: Option<Uuid> = row.try_get("category").map_err(decode_err)?;
    let subs: Vec<Uuid> = row.try_get("subs").map_err(decode_err)?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode_err)?),
        title: row.try_get("title").map_err(decode_err)?,
        slug: row.try_get("slug").map_err(decode_err)?,
        description: row.try_get("description").map_err(decode_err)?,
        price: row.try_get("price").map_err(decode_err)?,
        category: category.map(CategoryId::from_uuid),
        subs: subs.into_iter().map(SubId::from_uuid).collect(),
        quantity: decode_counter(row, "quantity")?,
        sold: decode_counter(row, "sold")?,
        shipping: row.try_get("shipping").map_err(decode_err)?,
        color: row.try_get("color").map_err(decode_err)?,
        brand: row.try_get("brand").map_err(decode_err)?,
        ratings: Vec::new(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode_err)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode_err)?,
    })
}

fn decode_category(row: &PgRow) -> Result<Category, StoreError> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        slug: row.try_get("slug").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn decode_sub(row: &PgRow) -> Result<Sub, StoreError> {
    Ok(Sub {
        id: SubId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        slug: row.try_get("slug").map_err(decode_err)?,
        parent: CategoryId::from_uuid(row.try_get("parent").map_err(decode_err)?),
        created_at: row.try_get("created_at").map_err(decode_err)?,
        updated_at: row.try_get("updated_at").map_err(decode_err)?,
    })
}

fn uuids<T: Into<Uuid> + Copy>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, product), fields(slug = %product.slug), err)]
    async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, slug, description, price, category, subs,
                quantity, sold, shipping, color, brand, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category.map(Uuid::from))
        .bind(uuids(&product.subs))
        .bind(encode_counter(product.quantity))
        .bind(encode_counter(product.sold))
        .bind(product.shipping)
        .bind(&product.color)
        .bind(&product.brand)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self), err)]
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        self.fetch_products(compile_product_query(query)).await
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.product_where("id", SqlParam::Uuid(id.into())).await
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        self.product_where("slug", SqlParam::Text(slug.to_string())).await
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: Product) -> Result<Option<Product>, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE products SET
                title = $2, slug = $3, description = $4, price = $5, category = $6,
                subs = $7, quantity = $8, sold = $9, shipping = $10, color = $11,
                brand = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category.map(Uuid::from))
        .bind(uuids(&product.subs))
        .bind(encode_counter(product.quantity))
        .bind(encode_counter(product.sold))
        .bind(product.shipping)
        .bind(&product.color)
        .bind(&product.brand)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_product_by_id(product.id).await
    }

    #[instrument(skip(self), err)]
    async fn delete_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let Some(product) = self.find_product_by_slug(slug).await? else {
            return Ok(None);
        };
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product.id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok((deleted.rows_affected() > 0).then_some(product))
    }

    async fn estimated_product_count(&self) -> Result<u64, StoreError> {
        // Planner estimate; -1 before the first ANALYZE.
        let row = sqlx::query("SELECT reltuples::BIGINT AS estimate FROM pg_class WHERE relname = 'products'")
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("estimated_product_count", e))?;
        let estimate: i64 = match row {
            Some(row) => row.try_get("estimate").map_err(decode_err)?,
            None => 0,
        };
        if estimate >= 0 {
            return Ok(estimate as u64);
        }
        let row = sqlx::query("SELECT COUNT(*) AS total FROM products")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("estimated_product_count", e))?;
        let total: i64 = row.try_get("total").map_err(decode_err)?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self), fields(bucket = %bucket), err)]
    async fn aggregate_rating_buckets(
        &self,
        bucket: Stars,
        limit: usize,
    ) -> Result<Vec<RatingAggregate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id AS product_id, FLOOR(AVG(r.star))::INT AS floor_average
            FROM products p
            JOIN product_ratings r ON r.product_id = p.id
            GROUP BY p.id, p.seq
            HAVING FLOOR(AVG(r.star)) = $1
            ORDER BY p.seq ASC
            LIMIT $2
            "#,
        )
        .bind(i32::from(bucket.get()))
        .bind(clamp_i64(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("aggregate_rating_buckets", e))?;

        rows.iter()
            .map(|row| {
                let floor: i32 = row.try_get("floor_average").map_err(decode_err)?;
                Ok(RatingAggregate {
                    product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode_err)?),
                    floor_average: u8::try_from(floor)
                        .map_err(|_| StoreError::Decode(format!("floor average out of range: {floor}")))?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id, user = %user, star = %star), err)]
    async fn upsert_rating(
        &self,
        product_id: ProductId,
        user: UserId,
        star: Stars,
    ) -> Result<Option<RatingOutcome>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // Row lock serialises submissions for the same product; the primary key
        // on (product_id, posted_by) makes the insert-or-update itself atomic.
        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_rating", e))?;
        if locked.is_none() {
            return Ok(None);
        }

        let previous: Option<i16> = sqlx::query(
            "SELECT star FROM product_ratings WHERE product_id = $1 AND posted_by = $2",
        )
        .bind(product_id.as_uuid())
        .bind(user.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_rating", e))?
        .map(|row| row.try_get("star"))
        .transpose()
        .map_err(decode_err)?;

        sqlx::query(
            r#"
            INSERT INTO product_ratings (product_id, posted_by, star)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, posted_by)
            DO UPDATE SET star = EXCLUDED.star
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user.as_uuid())
        .bind(i16::from(star.get()))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_rating", e))?;

        sqlx::query("UPDATE products SET updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_rating", e))?;

        let outcome = match previous {
            None => {
                let fragment = SqlFragment {
                    sql: format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"),
                    params: vec![SqlParam::Uuid(product_id.into())],
                };
                let product = fetch_products_on(&mut *tx, fragment)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::Backend("product vanished inside transaction".to_string()))?;
                RatingOutcome::Added(product)
            }
            Some(prev) => RatingOutcome::Updated(UpdateAck {
                matched_count: 1,
                modified_count: u64::from(prev != i16::from(star.get())),
            }),
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(Some(outcome))
    }

    #[instrument(skip(self, category), fields(name = %category.name), err)]
    async fn insert_category(&self, category: Category) -> Result<Category, StoreError> {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY created_at DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(decode_category).collect()
    }

    async fn find_category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        sqlx::query("SELECT * FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category", e))?
            .as_ref()
            .map(decode_category)
            .transpose()
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        sqlx::query("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category", e))?
            .as_ref()
            .map(decode_category)
            .transpose()
    }

    async fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM categories WHERE id = ANY($1)")
            .bind(uuids(ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_categories", e))?;
        rows.iter().map(decode_category).collect()
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: Category) -> Result<Option<Category>, StoreError> {
        sqlx::query("UPDATE categories SET name = $2, slug = $3, updated_at = $4 WHERE id = $1 RETURNING *")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.updated_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?
            .as_ref()
            .map(decode_category)
            .transpose()
    }

    async fn delete_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        sqlx::query("DELETE FROM categories WHERE slug = $1 RETURNING *")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?
            .as_ref()
            .map(decode_category)
            .transpose()
    }

    #[instrument(skip(self, sub), fields(name = %sub.name), err)]
    async fn insert_sub(&self, sub: Sub) -> Result<Sub, StoreError> {
        sqlx::query(
            "INSERT INTO subs (id, name, slug, parent, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(sub.id.as_uuid())
        .bind(&sub.name)
        .bind(&sub.slug)
        .bind(sub.parent.as_uuid())
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_sub", e))?;
        Ok(sub)
    }

    async fn list_subs(&self) -> Result<Vec<Sub>, StoreError> {
        let rows = sqlx::query("SELECT * FROM subs ORDER BY created_at DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_subs", e))?;
        rows.iter().map(decode_sub).collect()
    }

    async fn find_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        sqlx::query("SELECT * FROM subs WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_sub", e))?
            .as_ref()
            .map(decode_sub)
            .transpose()
    }

    async fn find_subs_by_ids(&self, ids: &[SubId]) -> Result<Vec<Sub>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM subs WHERE id = ANY($1)")
            .bind(uuids(ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_subs", e))?;
        rows.iter().map(decode_sub).collect()
    }

    async fn find_subs_by_parent(&self, parent: CategoryId) -> Result<Vec<Sub>, StoreError> {
        let rows = sqlx::query("SELECT * FROM subs WHERE parent = $1 ORDER BY created_at ASC")
            .bind(parent.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_subs_by_parent", e))?;
        rows.iter().map(decode_sub).collect()
    }

    async fn update_sub(&self, sub: Sub) -> Result<Option<Sub>, StoreError> {
        sqlx::query(
            "UPDATE subs SET name = $2, slug = $3, parent = $4, updated_at = $5 WHERE id = $1 RETURNING *",
        )
        .bind(sub.id.as_uuid())
        .bind(&sub.name)
        .bind(&sub.slug)
        .bind(sub.parent.as_uuid())
        .bind(sub.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_sub", e))?
        .as_ref()
        .map(decode_sub)
        .transpose()
    }

    async fn delete_sub_by_slug(&self, slug: &str) -> Result<Option<Sub>, StoreError> {
        sqlx::query("DELETE FROM subs WHERE slug = $1 RETURNING *")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_sub", e))?
            .as_ref()
            .map(decode_sub)
            .transpose()
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::query::{Sort, SortField, SortOrder};
    use crate::search::{PageRequest, PaginationResolver};

    #[test]
    fn empty_query_selects_in_natural_order() {
        let fragment = compile_product_query(&ProductQuery::all());
        assert!(fragment.sql.ends_with("WHERE TRUE ORDER BY p.seq ASC"));
        assert!(fragment.params.is_empty());
    }

    #[test]
    fn predicates_are_anded_with_sequential_placeholders() {
        let query = ProductQuery::matching(vec![
            ProductPredicate::PriceBetween { min: 0.0, max: 100.0 },
            ProductPredicate::Color("Black".to_string()),
        ]);
        let fragment = compile_product_query(&query);
        assert!(fragment.sql.contains("p.price BETWEEN $1 AND $2 AND p.color = $3"));
        assert_eq!(
            fragment.params,
            vec![
                SqlParam::Float(0.0),
                SqlParam::Float(100.0),
                SqlParam::Text("Black".to_string())
            ]
        );
    }

    #[test]
    fn window_and_sort_are_appended() {
        let query = ProductQuery::all()
            .sorted(Sort {
                field: SortField::Price,
                order: SortOrder::Asc,
            })
            .skip(3)
            .limit(3);
        let fragment = compile_product_query(&query);
        assert!(fragment.sql.ends_with("ORDER BY p.price ASC, p.seq ASC OFFSET $1 LIMIT $2"));
        assert_eq!(fragment.params, vec![SqlParam::Integer(3), SqlParam::Integer(3)]);
    }

    #[test]
    fn rating_bucket_compiles_to_grouped_subquery() {
        let query = ProductQuery::matching(vec![ProductPredicate::RatingBucket(Stars::new(4).unwrap())]);
        let fragment = compile_product_query(&query);
        assert!(fragment.sql.contains("HAVING FLOOR(AVG(r.star)) = $1"));
        assert_eq!(fragment.params, vec![SqlParam::Integer(4)]);
    }

    #[test]
    fn huge_page_saturates_offset_instead_of_wrapping() {
        let request = PageRequest {
            page: Some(u64::MAX),
            ..Default::default()
        };
        let query = PaginationResolver::new(3).resolve(&request).unwrap();
        let fragment = compile_product_query(&query);

        assert_eq!(
            fragment.params,
            vec![SqlParam::Integer(i64::MAX), SqlParam::Integer(3)]
        );
        assert!(fragment
            .params
            .iter()
            .all(|p| !matches!(p, SqlParam::Integer(n) if *n < 0)));
    }
}
