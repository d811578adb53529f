use crate::models::{DbAttendance, DbRecurringClass};
use chrono::NaiveDate;
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn create_recurring_class(conn: &mut PgConnection, rc: &DbRecurringClass) -> Result<()> {
    tracing::debug!(
        "Creating recurring class: id={}, instructor_id={}, weekday={}, start_time={}, start_at={}",
        rc.id, rc.instructor_id, rc.weekday, rc.start_time, rc.start_at
    );

    sqlx::query(
        r#"
        INSERT INTO recurring_classes (id, subscription_id, instructor_id, weekday, start_time, start_at, end_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(rc.id)
    .bind(rc.subscription_id)
    .bind(rc.instructor_id)
    .bind(rc.weekday)
    .bind(rc.start_time)
    .bind(rc.start_at)
    .bind(rc.end_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Returns the number of rows updated.
pub async fn end_recurring_class(conn: &mut PgConnection, id: Uuid, end_at: NaiveDate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE recurring_classes
        SET end_at = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(end_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_recurring_class_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbRecurringClass>> {
    let rc = sqlx::query_as::<_, DbRecurringClass>(
        r#"
        SELECT id, subscription_id, instructor_id, weekday, start_time, start_at, end_at
        FROM recurring_classes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(rc)
}

pub async fn get_recurring_classes_by_instructor_id(
    conn: &mut PgConnection,
    instructor_id: Uuid,
) -> Result<Vec<DbRecurringClass>> {
    let classes = sqlx::query_as::<_, DbRecurringClass>(
        r#"
        SELECT id, subscription_id, instructor_id, weekday, start_time, start_at, end_at
        FROM recurring_classes
        WHERE instructor_id = $1
        ORDER BY start_at ASC
        "#,
    )
    .bind(instructor_id)
    .fetch_all(conn)
    .await?;

    Ok(classes)
}

pub async fn get_recurring_classes_by_customer_id(
    conn: &mut PgConnection,
    customer_id: Uuid,
) -> Result<Vec<DbRecurringClass>> {
    let classes = sqlx::query_as::<_, DbRecurringClass>(
        r#"
        SELECT rc.id, rc.subscription_id, rc.instructor_id, rc.weekday, rc.start_time, rc.start_at, rc.end_at
        FROM recurring_classes rc
        JOIN subscriptions s ON s.id = rc.subscription_id
        WHERE s.customer_id = $1
        ORDER BY rc.start_at ASC
        "#,
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await?;

    Ok(classes)
}

pub async fn create_attendance(conn: &mut PgConnection, recurring_class_id: Uuid, child_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recurring_class_attendances (recurring_class_id, child_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(recurring_class_id)
    .bind(child_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_attendances(
    conn: &mut PgConnection,
    recurring_class_ids: &[Uuid],
) -> Result<Vec<DbAttendance>> {
    let attendances = sqlx::query_as::<_, DbAttendance>(
        r#"
        SELECT recurring_class_id AS owner_id, child_id
        FROM recurring_class_attendances
        WHERE recurring_class_id = ANY($1)
        "#,
    )
    .bind(recurring_class_ids)
    .fetch_all(conn)
    .await?;

    Ok(attendances)
}
