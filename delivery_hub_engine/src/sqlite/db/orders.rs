use log::debug;
use sqlx::SqliteConnection;

use crate::{
    canonical::CanonicalOrder,
    db_types::{Order, OrderId, OrderItem, OrderStatus},
    traits::{IntegrationError, OrderUpsert, SkuMap, StatusChange},
};

/// Inserts the order into the database, returning `inserted == false` if the order already exists.
/// Line items are only written on first insert; a redelivery changes nothing.
pub async fn idempotent_insert(
    order: &CanonicalOrder,
    platform_id: i64,
    skus: &SkuMap,
    conn: &mut SqliteConnection,
) -> Result<OrderUpsert, IntegrationError> {
    let result = match fetch_order(platform_id, &order.external_id, conn).await? {
        Some(existing) => OrderUpsert { order: existing, inserted: false },
        None => {
            let stored = insert_order(order, platform_id, conn).await?;
            insert_items(stored.id, order, skus, conn).await?;
            debug!("📝️ Order {} inserted with id {}", order.external_id, stored.id);
            OrderUpsert { order: stored, inserted: true }
        },
    };
    Ok(result)
}

/// Inserts a new order using the given connection. This is not atomic on its own; embed the call inside a
/// transaction and pass `&mut *tx` as the connection argument.
async fn insert_order(
    order: &CanonicalOrder,
    platform_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, IntegrationError> {
    let address = order.delivery_address.as_ref().map(serde_json::to_string).transpose()?;
    let stored = sqlx::query_as(
        r#"
            INSERT INTO orders (
                external_id,
                platform_id,
                display_number,
                status,
                fulfilment,
                customer_name,
                customer_phone,
                delivery_address,
                subtotal,
                delivery_fee,
                discount,
                tip,
                total,
                raw_payload,
                placed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.external_id.as_str())
    .bind(platform_id)
    .bind(&order.display_number)
    .bind(order.status)
    .bind(order.fulfilment)
    .bind(&order.customer.name)
    .bind(&order.customer.phone)
    .bind(address)
    .bind(order.charges.subtotal)
    .bind(order.charges.delivery_fee)
    .bind(order.charges.discount)
    .bind(order.charges.tip)
    .bind(order.charges.total)
    .bind(order.raw.to_string())
    .bind(order.placed_at)
    .fetch_one(conn)
    .await?;
    Ok(stored)
}

async fn insert_items(
    order_row_id: i64,
    order: &CanonicalOrder,
    skus: &SkuMap,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    for item in &order.items {
        let product_id = skus.get(&item.external_sku).map(|p| p.id);
        let modifiers =
            if item.modifiers.is_empty() { None } else { Some(serde_json::to_string(&item.modifiers)?) };
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, external_sku, name, quantity, unit_price, modifiers, note)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
            "#,
        )
        .bind(order_row_id)
        .bind(product_id)
        .bind(&item.external_sku)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(modifiers)
        .bind(&item.note)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn fetch_order(
    platform_id: i64,
    external_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, IntegrationError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE platform_id = $1 AND external_id = $2")
        .bind(platform_id)
        .bind(external_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, IntegrationError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, IntegrationError> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}

/// Moves an order to `new_status` with a compare-and-set write.
///
/// SQLite has no `SELECT .. FOR UPDATE`; the `AND status = $current` guard on the UPDATE plays the role of the
/// row lock. If another writer commits between our read and our write, zero rows are affected and we re-read
/// the now-committed state. Either the transition is still legal from that state, or the caller gets the
/// conflict error carrying the committed status; two racing writers can never both pass an illegal edge.
///
/// Call this on an autocommit connection, not inside a transaction: each statement here is atomic on its own,
/// and a wrapping transaction would pin the snapshot so the retry re-read could never observe the winner.
pub async fn transition_status(
    order_id: i64,
    new_status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<StatusChange, IntegrationError> {
    loop {
        let order = fetch_order_by_id(order_id, &mut *conn).await?.ok_or(IntegrationError::DatabaseError(
            format!("Order with id {order_id} does not exist"),
        ))?;
        let previous = order.status;
        if !previous.can_transition_to(new_status) {
            return Err(IntegrationError::InvalidStateTransition { from: previous, to: new_status });
        }
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3",
        )
        .bind(new_status)
        .bind(order_id)
        .bind(previous)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 1 {
            let order = fetch_order_by_id(order_id, conn).await?.ok_or(IntegrationError::DatabaseError(
                format!("Order with id {order_id} vanished mid-update"),
            ))?;
            return Ok(StatusChange { order, previous });
        }
        // Lost the race; loop and judge the transition against the winner's committed state.
        debug!("📝️ Concurrent status write on order id {order_id}, re-reading");
    }
}
