use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// The one place the dashboard remembers between visits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LastPlace {
    pub place: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        // Single-row table: id is pinned to 1
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS last_place (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                place TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_last_place(&self, place: &str) -> Result<LastPlace, DatabaseError> {
        let now = chrono::Utc::now();

        let result = sqlx::query_as::<_, LastPlace>(
            r#"
            INSERT INTO last_place (id, place, updated_at)
            VALUES (1, $1, $2)
            ON CONFLICT(id) DO UPDATE SET place = excluded.place, updated_at = excluded.updated_at
            RETURNING place, updated_at
            "#,
        )
        .bind(place)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_last_place(&self) -> Result<Option<LastPlace>, DatabaseError> {
        let result = sqlx::query_as::<_, LastPlace>(
            "SELECT place, updated_at FROM last_place WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }
}

#[cfg(test)]
pub(crate) async fn memory_database() -> Database {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let database = Database::new(pool);
    database.init_tables().await.unwrap();
    database
}
