use sqlx::{QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{ChannelPrice, Product},
    traits::{IntegrationError, ProductMap, SkuMap},
};

/// Resolves all the given SKUs for one platform in a single round trip. N order items cost one query, and the
/// returned map gives O(1) product resolution while items are materialized.
pub async fn resolve_skus(
    platform_id: i64,
    skus: &[String],
    conn: &mut SqliteConnection,
) -> Result<SkuMap, IntegrationError> {
    if skus.is_empty() {
        return Ok(SkuMap::new());
    }
    let mut builder = QueryBuilder::new(
        r#"
        SELECT p.id, p.name, p.category, p.base_price, p.active, p.available, cp.external_sku
        FROM channel_prices cp JOIN products p ON p.id = cp.product_id
        WHERE cp.platform_id =
    "#,
    );
    builder.push_bind(platform_id);
    builder.push(" AND cp.external_sku IN (");
    let mut separated = builder.separated(", ");
    for sku in skus {
        separated.push_bind(sku);
    }
    builder.push(")");
    let rows = builder.build().fetch_all(conn).await?;
    let mut map = SkuMap::with_capacity(rows.len());
    for row in rows {
        let product = Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            base_price: row.try_get("base_price")?,
            active: row.try_get("active")?,
            available: row.try_get("available")?,
        };
        map.insert(row.try_get("external_sku")?, product);
    }
    Ok(map)
}

pub async fn fetch_channel_prices_for_platform(
    platform_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ChannelPrice>, IntegrationError> {
    let rows = sqlx::query_as("SELECT * FROM channel_prices WHERE platform_id = $1 ORDER BY id")
        .bind(platform_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_channel_prices_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ChannelPrice>, IntegrationError> {
    let rows = sqlx::query_as("SELECT * FROM channel_prices WHERE product_id = $1 ORDER BY platform_id")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Flips availability on every channel row for the product and returns the affected rows, so the caller can
/// fan the change out to each platform.
pub async fn set_product_availability(
    product_id: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<ChannelPrice>, IntegrationError> {
    sqlx::query("UPDATE products SET available = $1 WHERE id = $2")
        .bind(available)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    let rows = sqlx::query_as(
        "UPDATE channel_prices SET available = $1 WHERE product_id = $2 RETURNING *",
    )
    .bind(available)
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Flips availability on one channel listing only, leaving the product and its other channels untouched.
pub async fn set_listing_availability(
    product_id: i64,
    platform_id: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    sqlx::query("UPDATE channel_prices SET available = $1 WHERE product_id = $2 AND platform_id = $3")
        .bind(available)
        .bind(product_id)
        .bind(platform_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_products(
    product_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<ProductMap, IntegrationError> {
    if product_ids.is_empty() {
        return Ok(ProductMap::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in product_ids {
        separated.push_bind(id);
    }
    builder.push(")");
    let products: Vec<Product> = builder.build_query_as().fetch_all(conn).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Fixture helpers used by the integration tests and seed tooling.
pub async fn insert_product(
    name: &str,
    category: &str,
    base_price: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, IntegrationError> {
    let product = sqlx::query_as(
        "INSERT INTO products (name, category, base_price) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(category)
    .bind(base_price)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn insert_channel_price(
    product_id: i64,
    platform_id: i64,
    external_sku: &str,
    price: i64,
    available: bool,
    conn: &mut SqliteConnection,
) -> Result<ChannelPrice, IntegrationError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO channel_prices (product_id, platform_id, external_sku, price, available)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(platform_id)
    .bind(external_sku)
    .bind(price)
    .bind(available)
    .fetch_one(conn)
    .await?;
    Ok(row)
}
