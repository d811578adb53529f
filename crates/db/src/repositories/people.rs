use crate::models::{DbChild, DbCustomer, DbInstructor, DbSubscription};
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn get_instructor_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbInstructor>> {
    let instructor = sqlx::query_as::<_, DbInstructor>(
        r#"
        SELECT id, name
        FROM instructors
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(instructor)
}

pub async fn get_customer_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbCustomer>> {
    let customer = sqlx::query_as::<_, DbCustomer>(
        r#"
        SELECT id, name
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(customer)
}

pub async fn get_children_by_ids(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<DbChild>> {
    let children = sqlx::query_as::<_, DbChild>(
        r#"
        SELECT id, customer_id, name
        FROM children
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(children)
}

pub async fn get_subscription_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbSubscription>> {
    let subscription = sqlx::query_as::<_, DbSubscription>(
        r#"
        SELECT id, customer_id
        FROM subscriptions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(subscription)
}
