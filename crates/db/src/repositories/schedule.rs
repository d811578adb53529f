use crate::models::{DbSchedule, DbScheduleSlot};
use chrono::{NaiveDate, NaiveTime};
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn create_schedule(conn: &mut PgConnection, schedule: &DbSchedule) -> Result<()> {
    tracing::debug!(
        "Creating schedule: id={}, instructor_id={}, effective_from={}",
        schedule.id, schedule.instructor_id, schedule.effective_from
    );

    sqlx::query(
        r#"
        INSERT INTO instructor_schedules (id, instructor_id, effective_from, effective_to)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(schedule.id)
    .bind(schedule.instructor_id)
    .bind(schedule.effective_from)
    .bind(schedule.effective_to)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn create_schedule_slot(
    conn: &mut PgConnection,
    schedule_id: Uuid,
    weekday: i16,
    start_time: NaiveTime,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO schedule_slots (schedule_id, weekday, start_time)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(schedule_id)
    .bind(weekday)
    .bind(start_time)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_schedules_by_instructor_id(
    conn: &mut PgConnection,
    instructor_id: Uuid,
) -> Result<Vec<DbSchedule>> {
    let schedules = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, instructor_id, effective_from, effective_to
        FROM instructor_schedules
        WHERE instructor_id = $1
        ORDER BY effective_from ASC
        "#,
    )
    .bind(instructor_id)
    .fetch_all(conn)
    .await?;

    Ok(schedules)
}

pub async fn get_slots_by_schedule_ids(
    conn: &mut PgConnection,
    schedule_ids: &[Uuid],
) -> Result<Vec<DbScheduleSlot>> {
    let slots = sqlx::query_as::<_, DbScheduleSlot>(
        r#"
        SELECT schedule_id, weekday, start_time
        FROM schedule_slots
        WHERE schedule_id = ANY($1)
        ORDER BY weekday ASC, start_time ASC
        "#,
    )
    .bind(schedule_ids)
    .fetch_all(conn)
    .await?;

    Ok(slots)
}

/// Returns the number of rows updated.
pub async fn close_schedule(conn: &mut PgConnection, id: Uuid, effective_to: NaiveDate) -> Result<u64> {
    tracing::debug!("Closing schedule: id={}, effective_to={}", id, effective_to);

    let result = sqlx::query(
        r#"
        UPDATE instructor_schedules
        SET effective_to = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(effective_to)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
