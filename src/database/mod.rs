pub mod queries;
mod store;

pub use store::PostgresStore;

use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;

pub struct DatabaseManager {
    pub pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// Connects the pool described by `config`
    pub async fn new(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Applies the schema. Existing tables and rows are kept.
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        let create_schema_sql = include_str!("../../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;
        info!("{:<12} --> Schema applied", "Database");
        Ok(())
    }

    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = strip_comments(query);
            if !query.is_empty() {
                sqlx::query(&query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }
}

fn strip_comments(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_statements_survive_comment_stripping() {
        let sql = include_str!("../../sql/01-create-schema.sql");
        let statements: Vec<String> = sql
            .split(';')
            .map(strip_comments)
            .filter(|s| !s.is_empty())
            .collect();
        assert!(statements.iter().all(|s| s.starts_with("CREATE")));
        assert!(statements
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS bids")));
    }

    fn table<'a>(sql: &'a str, name: &str) -> &'a str {
        let start = sql
            .find(&format!("CREATE TABLE IF NOT EXISTS {} (", name))
            .unwrap();
        let end = start + sql[start..].find(");").unwrap();
        &sql[start..end]
    }

    #[test]
    fn item_columns_fit_validated_lengths() {
        use crate::auction::commands::{MAX_TITLE_LEN, MAX_VEHICLE_FIELD_LEN};

        let items = table(include_str!("../../sql/01-create-schema.sql"), "items");
        assert!(items.contains(&format!("title VARCHAR({})", MAX_TITLE_LEN)));
        for column in ["vehicle_make", "vehicle_model"] {
            assert!(items.contains(&format!("{} VARCHAR({})", column, MAX_VEHICLE_FIELD_LEN)));
        }
    }

    #[test]
    fn action_log_rows_are_never_rewritten_by_cascades() {
        let logs = table(
            include_str!("../../sql/01-create-schema.sql"),
            "customer_action_logs",
        );
        assert!(!logs.contains("SET NULL"));
        assert!(!logs.contains("CASCADE"));
        assert_eq!(logs.matches("ON DELETE RESTRICT").count(), 2);
    }
}
