use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        // Plain INTEGER PRIMARY KEY: wiping a table restarts its ids,
        // which keeps company ids aligned with ranking positions.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id   INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url  TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id         INTEGER PRIMARY KEY,
                company_id INTEGER NOT NULL REFERENCES companies(id),
                first_name TEXT,
                last_name  TEXT,
                title      TEXT,
                email      TEXT,
                phone      TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}
