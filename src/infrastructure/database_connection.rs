// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database file directory if it doesn't exist
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if let Some(parent) = Path::new(db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Foreign keys are off by default in SQLite; the variant cascade
        // depends on them.
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_product_mappings_sql = r#"
            CREATE TABLE IF NOT EXISTS product_mappings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                internal_reference TEXT NOT NULL UNIQUE,
                shopify_product_id INTEGER NOT NULL,
                shopify_handle TEXT,
                title TEXT,
                first_created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        let create_variant_mappings_sql = r#"
            CREATE TABLE IF NOT EXISTS variant_mappings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                internal_sku TEXT NOT NULL UNIQUE,
                shopify_variant_id INTEGER NOT NULL,
                shopify_product_id INTEGER NOT NULL,
                parent_reference TEXT NOT NULL,
                size TEXT,
                price REAL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                last_updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (parent_reference)
                    REFERENCES product_mappings (internal_reference)
                    ON DELETE CASCADE
            )
        "#;

        let create_sync_log_sql = r#"
            CREATE TABLE IF NOT EXISTS sync_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                internal_reference TEXT,
                action TEXT,
                status TEXT,
                message TEXT,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        let create_indexes_sql = [
            "CREATE INDEX IF NOT EXISTS idx_variant_mappings_parent ON variant_mappings (parent_reference)",
            "CREATE INDEX IF NOT EXISTS idx_sync_log_reference ON sync_log (internal_reference)",
            "CREATE INDEX IF NOT EXISTS idx_sync_log_created_at ON sync_log (created_at)",
        ];

        sqlx::query(create_product_mappings_sql).execute(&self.pool).await?;
        sqlx::query(create_variant_mappings_sql).execute(&self.pool).await?;
        sqlx::query(create_sync_log_sql).execute(&self.pool).await?;
        for sql in create_indexes_sql {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite:{}", db_path.to_string_lossy());

        let db = DatabaseConnection::new(&database_url).await?;
        assert!(!db.pool().is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_migration.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url).await?;
        db.migrate().await?;

        let result = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='product_mappings'",
        )
        .fetch_optional(db.pool())
        .await?;

        assert!(result.is_some());
        Ok(())
    }
}
