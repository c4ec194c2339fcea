// /server/src/db.rs
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Idempotent schema statements, executed in order on every startup.
pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id             BLOB PRIMARY KEY NOT NULL,
        email          TEXT NOT NULL UNIQUE CHECK (length(email) <= 255),
        first_name     TEXT NOT NULL CHECK (length(first_name) <= 200),
        last_name      TEXT NOT NULL CHECK (length(last_name) <= 200),
        password_hash  TEXT NOT NULL,
        is_active      BOOLEAN NOT NULL DEFAULT 1,
        is_admin       BOOLEAN NOT NULL DEFAULT 0,
        is_student     BOOLEAN NOT NULL DEFAULT 1,
        is_interviewer BOOLEAN NOT NULL DEFAULT 0,
        is_faculty     BOOLEAN NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS admin_profiles (
        id      BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        gender  TEXT NOT NULL DEFAULT 'M' CHECK (gender IN ('M', 'F', 'O'))
    )",
    // bio has no default; callers must supply it
    "CREATE TABLE IF NOT EXISTS student_profiles (
        id      BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        bio     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS faculty_profiles (
        id      BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        gender  TEXT NOT NULL DEFAULT 'M' CHECK (gender IN ('M', 'F', 'O'))
    )",
    "CREATE TABLE IF NOT EXISTS interviewer_profiles (
        id      BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        gender  TEXT NOT NULL DEFAULT 'M' CHECK (gender IN ('M', 'F', 'O'))
    )",
];

pub async fn connect_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // An in-memory database lives only as long as its connections, so the
    // pool must never close the last one.
    let pool = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?
    };

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Schema ready ({} tables)", CREATE_TABLES.len());
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    connect_db("sqlite::memory:")
        .await
        .expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE '%profiles'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = test_pool().await;
        let res = sqlx::query("INSERT INTO admin_profiles (id, user_id) VALUES (?, ?)")
            .bind(uuid::Uuid::new_v4())
            .bind(uuid::Uuid::new_v4())
            .execute(&pool)
            .await;
        assert!(res.is_err());
    }
}
