use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{CustomerSummary, NewUser, User, UserId};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (name, email, role, phone, location, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.role)
    .bind(user.phone)
    .bind(user.location)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User {} ({}) created with role {}", user.id, user.email, user.role);
    Ok(user)
}

pub async fn fetch_user(id: UserId, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_customer_summaries(
    ids: &[UserId],
    conn: &mut SqliteConnection,
) -> Result<Vec<CustomerSummary>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT id, name, email, phone, location FROM users WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    let summaries = builder.build_query_as::<CustomerSummary>().fetch_all(conn).await?;
    Ok(summaries)
}
