use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductId, ProductSummary, UserId},
    market_api::product_objects::ProductUpdate,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (
                name,
                description,
                price,
                unit,
                stock,
                image_url,
                video_url,
                owner_id,
                visible,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.unit)
    .bind(product.stock)
    .bind(product.image_url)
    .bind(product.video_url)
    .bind(product.owner_id)
    .bind(product.visible)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product {} ({}) created for owner {}", product.id, product.name, product.owner_id);
    Ok(product)
}

pub async fn fetch_product(id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Visible products, newest first
pub async fn fetch_visible_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE visible = TRUE ORDER BY created_at DESC, id DESC")
        .fetch_all(conn)
        .await?;
    Ok(products)
}

pub async fn fetch_products_for_owner(
    owner_id: UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE owner_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(owner_id)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

/// Applies the fields that are present in `update`. If `update` is empty, the product is returned unchanged.
pub async fn update_product(
    id: ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    if update.is_empty() {
        return fetch_product(id, conn).await;
    }
    let mut builder = QueryBuilder::new("UPDATE products SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(unit) = update.unit {
        set_clause.push("unit = ");
        set_clause.push_bind_unseparated(unit);
    }
    if let Some(stock) = update.stock {
        set_clause.push("stock = ");
        set_clause.push_bind_unseparated(stock);
    }
    if let Some(image_url) = update.image_url {
        set_clause.push("image_url = ");
        set_clause.push_bind_unseparated(image_url);
    }
    if let Some(video_url) = update.video_url {
        set_clause.push("video_url = ");
        set_clause.push_bind_unseparated(video_url);
    }
    if let Some(visible) = update.visible {
        set_clause.push("visible = ");
        set_clause.push_bind_unseparated(visible);
    }
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let product = builder.build_query_as::<Product>().fetch_optional(conn).await?;
    Ok(product)
}

/// Removes `quantity` units from the product's stock and counts one more purchase, but only if there is enough stock.
///
/// The check and the decrement are a single statement, so the condition is always evaluated against committed state.
/// Returns `None` if the product does not exist or has fewer than `quantity` units left. Use [`fetch_product`] to tell
/// the two cases apart.
pub async fn reserve_stock(
    id: ProductId,
    quantity: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products
            SET stock = stock - $1, buyers_count = buyers_count + 1, updated_at = $2
            WHERE id = $3 AND stock >= $4
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

/// Adds the customer to the product's set of buyers. Repeat purchases do not create duplicates.
pub async fn record_buyer(id: ProductId, buyer: UserId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO product_buyers (product_id, buyer_id) VALUES ($1, $2)")
        .bind(id)
        .bind(buyer)
        .execute(conn)
        .await?;
    if result.rows_affected() > 0 {
        trace!("🗃️ User {buyer} is a new buyer of product {id}");
    }
    Ok(())
}

pub async fn fetch_buyers(id: ProductId, conn: &mut SqliteConnection) -> Result<Vec<UserId>, sqlx::Error> {
    let buyers = sqlx::query_scalar("SELECT buyer_id FROM product_buyers WHERE product_id = $1 ORDER BY buyer_id")
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(buyers)
}

pub async fn fetch_product_summaries(
    ids: &[ProductId],
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductSummary>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT id, name, price, unit, owner_id FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    let summaries = builder.build_query_as::<ProductSummary>().fetch_all(conn).await?;
    Ok(summaries)
}
