use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS instructors (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name VARCHAR(255) NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name VARCHAR(255) NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS children (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        customer_id UUID NOT NULL REFERENCES customers(id),
        name VARCHAR(255) NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        customer_id UUID NOT NULL REFERENCES customers(id),
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS instructor_schedules (
        id UUID PRIMARY KEY,
        instructor_id UUID NOT NULL REFERENCES instructors(id),
        effective_from DATE NOT NULL,
        effective_to DATE NULL,
        CONSTRAINT valid_effective_range CHECK (effective_to IS NULL OR effective_to >= effective_from)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schedule_slots (
        schedule_id UUID NOT NULL REFERENCES instructor_schedules(id) ON DELETE CASCADE,
        weekday SMALLINT NOT NULL CHECK (weekday BETWEEN 0 AND 6),
        start_time TIME NOT NULL,
        PRIMARY KEY (schedule_id, weekday, start_time)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS instructor_availabilities (
        instructor_id UUID NOT NULL REFERENCES instructors(id),
        date_time TIMESTAMP WITH TIME ZONE NOT NULL,
        PRIMARY KEY (instructor_id, date_time)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS instructor_unavailabilities (
        instructor_id UUID NOT NULL REFERENCES instructors(id),
        date_time TIMESTAMP WITH TIME ZONE NOT NULL,
        PRIMARY KEY (instructor_id, date_time)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS recurring_classes (
        id UUID PRIMARY KEY,
        subscription_id UUID NOT NULL REFERENCES subscriptions(id),
        instructor_id UUID NOT NULL REFERENCES instructors(id),
        weekday SMALLINT NOT NULL CHECK (weekday BETWEEN 0 AND 6),
        start_time TIME NOT NULL,
        start_at DATE NOT NULL,
        end_at DATE NULL,
        CONSTRAINT valid_interval CHECK (end_at IS NULL OR end_at > start_at)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS recurring_class_attendances (
        recurring_class_id UUID NOT NULL REFERENCES recurring_classes(id) ON DELETE CASCADE,
        child_id UUID NOT NULL REFERENCES children(id),
        PRIMARY KEY (recurring_class_id, child_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS classes (
        id UUID PRIMARY KEY,
        recurring_class_id UUID NULL REFERENCES recurring_classes(id),
        instructor_id UUID NOT NULL REFERENCES instructors(id),
        customer_id UUID NOT NULL REFERENCES customers(id),
        date_time TIMESTAMP WITH TIME ZONE NOT NULL,
        status VARCHAR(32) NOT NULL,
        is_rebookable BOOLEAN NOT NULL DEFAULT FALSE,
        rebookable_until TIMESTAMP WITH TIME ZONE NULL,
        class_code VARCHAR(16) NOT NULL,
        is_free_trial BOOLEAN NOT NULL DEFAULT FALSE,
        canceled_at TIMESTAMP WITH TIME ZONE NULL,
        rebooked_class_id UUID NULL REFERENCES classes(id),
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS class_attendances (
        class_id UUID NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
        child_id UUID NOT NULL REFERENCES children(id),
        PRIMARY KEY (class_id, child_id)
    );
    "#,
];

const INDEXES: &[&str] = &[
    // At most one open schedule version per instructor.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_instructor_schedules_open ON instructor_schedules(instructor_id) WHERE effective_to IS NULL",
    // At most one active class per instructor and instant.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_classes_active_slot ON classes(instructor_id, date_time) WHERE status IN ('pending', 'booked', 'rebooked', 'freeTrial')",
    "CREATE INDEX IF NOT EXISTS idx_classes_date_time ON classes(date_time)",
    "CREATE INDEX IF NOT EXISTS idx_classes_recurring_class_id ON classes(recurring_class_id)",
    "CREATE INDEX IF NOT EXISTS idx_recurring_classes_instructor_id ON recurring_classes(instructor_id)",
    "CREATE INDEX IF NOT EXISTS idx_recurring_classes_subscription_id ON recurring_classes(subscription_id)",
    "CREATE INDEX IF NOT EXISTS idx_children_customer_id ON children(customer_id)",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
