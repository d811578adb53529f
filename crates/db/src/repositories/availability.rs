//! Materialised availability and absence rows. Both tables share the
//! `(instructor_id, date_time)` shape.

use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantTable {
    Availabilities,
    Unavailabilities,
}

impl InstantTable {
    fn name(self) -> &'static str {
        match self {
            InstantTable::Availabilities => "instructor_availabilities",
            InstantTable::Unavailabilities => "instructor_unavailabilities",
        }
    }
}

pub async fn get_instants_between(
    conn: &mut PgConnection,
    table: InstantTable,
    instructor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    let query = format!(
        r#"
        SELECT date_time
        FROM {}
        WHERE instructor_id = $1 AND date_time >= $2 AND date_time < $3
        ORDER BY date_time ASC
        "#,
        table.name()
    );
    let instants = sqlx::query_scalar::<_, DateTime<Utc>>(&query)
        .bind(instructor_id)
        .bind(start)
        .bind(end)
        .fetch_all(conn)
        .await?;

    Ok(instants)
}

/// Returns `false` when the row already existed.
pub async fn create_instant(
    conn: &mut PgConnection,
    table: InstantTable,
    instructor_id: Uuid,
    date_time: DateTime<Utc>,
) -> Result<bool> {
    let query = format!(
        r#"
        INSERT INTO {} (instructor_id, date_time)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
        table.name()
    );
    let result = sqlx::query(&query)
        .bind(instructor_id)
        .bind(date_time)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_instant(
    conn: &mut PgConnection,
    table: InstantTable,
    instructor_id: Uuid,
    date_time: DateTime<Utc>,
) -> Result<bool> {
    let query = format!(
        r#"
        DELETE FROM {}
        WHERE instructor_id = $1 AND date_time = $2
        "#,
        table.name()
    );
    let result = sqlx::query(&query)
        .bind(instructor_id)
        .bind(date_time)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
