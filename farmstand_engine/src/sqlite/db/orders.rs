use std::collections::HashMap;

use chrono::Utc;
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, Paise, ProductId, UserId};

#[derive(Debug, FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
}

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut tx` as the connection argument.
///
/// The order is stored with `total_price` rather than any total the client supplied, and with status `Pending`.
pub async fn insert_order(order: NewOrder, total_price: Paise, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let mut inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                customer_id,
                total_price,
                payment_method,
                delivery_address,
                contact_name,
                contact_phone,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(total_price)
    .bind(order.payment_method)
    .bind(order.delivery_address)
    .bind(order.contact_name)
    .bind(order.contact_phone)
    .bind(OrderStatusType::Pending)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    insert_order_items(inserted.id, &order.items, conn).await?;
    inserted.items = order.items;
    debug!("🗃️ Order {} saved for customer {} with {} items", inserted.id, inserted.customer_id, inserted.items.len());
    Ok(inserted)
}

async fn insert_order_items(id: OrderId, items: &[OrderItem], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::new("INSERT INTO order_items (order_id, position, product_id, quantity) ");
    builder.push_values(items.iter().enumerate(), |mut row, (position, item)| {
        row.push_bind(id).push_bind(position as i64).push_bind(item.product_id).push_bind(item.quantity);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

/// Loads the line items for every order in `orders` with a single query.
async fn attach_items(orders: &mut [Order], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    if orders.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::new("SELECT order_id, product_id, quantity FROM order_items WHERE order_id IN (");
    let mut list = builder.separated(", ");
    for order in orders.iter() {
        list.push_bind(order.id);
    }
    list.push_unseparated(") ORDER BY order_id, position");
    let rows = builder.build_query_as::<OrderItemRow>().fetch_all(conn).await?;
    let mut items = HashMap::<OrderId, Vec<OrderItem>>::new();
    for row in rows {
        items.entry(row.order_id).or_default().push(OrderItem::new(row.product_id, row.quantity));
    }
    for order in orders.iter_mut() {
        order.items = items.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    match order {
        Some(order) => {
            let mut orders = [order];
            attach_items(&mut orders, conn).await?;
            let [order] = orders;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Orders placed by the customer, newest first
pub async fn fetch_orders_for_customer(
    customer_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;
    attach_items(&mut orders, conn).await?;
    trace!("🗃️ Fetched {} orders for customer {customer_id}", orders.len());
    Ok(orders)
}

/// Orders that include at least one product owned by `seller_id`, newest first. Each order appears once, however
/// many of the seller's products it contains.
pub async fn fetch_orders_for_seller(seller_id: UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut orders: Vec<Order> = sqlx::query_as(
        r#"
            SELECT * FROM orders WHERE id IN (
                SELECT order_items.order_id FROM order_items
                JOIN products ON products.id = order_items.product_id
                WHERE products.owner_id = $1
            )
            ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(seller_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_items(&mut orders, conn).await?;
    trace!("🗃️ Fetched {} orders for seller {seller_id}", orders.len());
    Ok(orders)
}

pub async fn fetch_seller_ids_for_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<UserId>, sqlx::Error> {
    let ids = sqlx::query_scalar(
        r#"
            SELECT DISTINCT products.owner_id FROM order_items
            JOIN products ON products.id = order_items.product_id
            WHERE order_items.order_id = $1
            ORDER BY products.owner_id
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Sets the order status and bumps `updated_at`. If `expected` is given, the row is only touched while it still has
/// that status, so the check and the write happen in one statement. Returns `None` if no row matched.
pub async fn update_order_status(
    id: OrderId,
    status: OrderStatusType,
    expected: Option<OrderStatusType>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = match expected {
        Some(old) => {
            sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .bind(old)
                .fetch_optional(&mut *conn)
                .await?
        },
        None => {
            sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
        },
    };
    match order {
        Some(order) => {
            debug!("🗃️ Order {id} status set to {status}");
            let mut orders = [order];
            attach_items(&mut orders, conn).await?;
            let [order] = orders;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}
