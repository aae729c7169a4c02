use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Whether the customer table exists; used by readiness probes.
pub async fn schema_present(pool: &DbPool) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'customer'",
    )
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{run_pending, schema_present};
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["customer", "idx_customer_member_number", "idx_customer_created_at"];

    #[tokio::test]
    async fn migrations_create_customer_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert!(!schema_present(&pool).await.expect("probe before migrate"));

        run_pending(&pool).await.expect("run migrations");
        assert!(schema_present(&pool).await.expect("probe after migrate"));

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?")
                .bind(object)
                .fetch_one(&pool)
                .await
                .expect("query sqlite_master")
                .get::<i64, _>("count");
            assert_eq!(count, 1, "schema object `{object}` should exist");
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run should be a no-op");

        pool.close().await;
    }

    #[tokio::test]
    async fn member_number_index_rejects_duplicates() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let insert = "INSERT INTO customer
            (id, name, date_of_birth, member_number, interests, created_at, updated_at)
            VALUES (?, 'Ada', '1990-01-01T00:00:00.000Z', 42, 'math',
                    '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z')";

        sqlx::query(insert).bind("a").execute(&pool).await.expect("first insert");
        let duplicate = sqlx::query(insert).bind("b").execute(&pool).await;

        let is_unique_violation = matches!(
            duplicate,
            Err(sqlx::Error::Database(ref error)) if error.is_unique_violation()
        );
        assert!(is_unique_violation, "second insert should violate the unique index");

        pool.close().await;
    }
}
