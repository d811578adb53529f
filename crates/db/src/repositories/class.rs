use crate::models::{DbAttendance, DbClass};
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

const CLASS_COLUMNS: &str = "id, recurring_class_id, instructor_id, customer_id, date_time, status, \
     is_rebookable, rebookable_until, class_code, is_free_trial, canceled_at, rebooked_class_id";

pub async fn create_class(conn: &mut PgConnection, class: &DbClass) -> Result<()> {
    tracing::debug!(
        "Creating class: id={}, instructor_id={}, date_time={}, status={}",
        class.id, class.instructor_id, class.date_time, class.status
    );

    sqlx::query(
        r#"
        INSERT INTO classes (
            id, recurring_class_id, instructor_id, customer_id, date_time, status,
            is_rebookable, rebookable_until, class_code, is_free_trial, canceled_at, rebooked_class_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(class.id)
    .bind(class.recurring_class_id)
    .bind(class.instructor_id)
    .bind(class.customer_id)
    .bind(class.date_time)
    .bind(&class.status)
    .bind(class.is_rebookable)
    .bind(class.rebookable_until)
    .bind(&class.class_code)
    .bind(class.is_free_trial)
    .bind(class.canceled_at)
    .bind(class.rebooked_class_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Returns the number of rows updated.
pub async fn update_class(conn: &mut PgConnection, class: &DbClass) -> Result<u64> {
    tracing::debug!("Updating class: id={}, status={}", class.id, class.status);

    let result = sqlx::query(
        r#"
        UPDATE classes
        SET status = $2,
            is_rebookable = $3,
            rebookable_until = $4,
            canceled_at = $5,
            rebooked_class_id = $6
        WHERE id = $1
        "#,
    )
    .bind(class.id)
    .bind(&class.status)
    .bind(class.is_rebookable)
    .bind(class.rebookable_until)
    .bind(class.canceled_at)
    .bind(class.rebooked_class_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_class(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM classes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_class_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbClass>> {
    let query = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1");
    let class = sqlx::query_as::<_, DbClass>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(class)
}

pub async fn get_classes_by_instructor_between(
    conn: &mut PgConnection,
    instructor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DbClass>> {
    let query = format!(
        "SELECT {CLASS_COLUMNS} FROM classes \
         WHERE instructor_id = $1 AND date_time >= $2 AND date_time < $3 \
         ORDER BY date_time ASC, id ASC"
    );
    let classes = sqlx::query_as::<_, DbClass>(&query)
        .bind(instructor_id)
        .bind(start)
        .bind(end)
        .fetch_all(conn)
        .await?;

    Ok(classes)
}

pub async fn get_classes_at(conn: &mut PgConnection, date_time: DateTime<Utc>) -> Result<Vec<DbClass>> {
    let query = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE date_time = $1 ORDER BY id ASC");
    let classes = sqlx::query_as::<_, DbClass>(&query)
        .bind(date_time)
        .fetch_all(conn)
        .await?;

    Ok(classes)
}

pub async fn get_classes_by_recurring_class_from(
    conn: &mut PgConnection,
    recurring_class_id: Uuid,
    from: DateTime<Utc>,
) -> Result<Vec<DbClass>> {
    let query = format!(
        "SELECT {CLASS_COLUMNS} FROM classes \
         WHERE recurring_class_id = $1 AND date_time >= $2 \
         ORDER BY date_time ASC"
    );
    let classes = sqlx::query_as::<_, DbClass>(&query)
        .bind(recurring_class_id)
        .bind(from)
        .fetch_all(conn)
        .await?;

    Ok(classes)
}

pub async fn create_attendance(conn: &mut PgConnection, class_id: Uuid, child_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO class_attendances (class_id, child_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(class_id)
    .bind(child_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_attendances(conn: &mut PgConnection, class_ids: &[Uuid]) -> Result<Vec<DbAttendance>> {
    let attendances = sqlx::query_as::<_, DbAttendance>(
        r#"
        SELECT class_id AS owner_id, child_id
        FROM class_attendances
        WHERE class_id = ANY($1)
        "#,
    )
    .bind(class_ids)
    .fetch_all(conn)
    .await?;

    Ok(attendances)
}
