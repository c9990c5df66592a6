pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use parking_lot::RwLock;

use crate::error::AppError;
use crate::models::Schema;
use crate::services::{datasource::DataSource, llm_agent::LlmAgent};

// Application state
pub struct AppState {
    pub config: config::Config,
    pub llm: LlmAgent,
    pub db: DataSource,
    schema: RwLock<Schema>,
}

impl AppState {
    pub fn new(config: config::Config, llm: LlmAgent, db: DataSource, schema: Schema) -> Self {
        Self {
            config,
            llm,
            db,
            schema: RwLock::new(schema),
        }
    }

    /// Opens the configured database and takes the first schema snapshot.
    pub async fn connect(config: config::Config) -> Result<Self, AppError> {
        let db = DataSource::open(&config.database_path).await?;
        let schema = db.reflect_schema().await?;
        let tables = schema.keys().cloned().collect::<Vec<_>>().join(", ");
        let tables = if tables.is_empty() { "None".to_string() } else { tables };
        tracing::info!("Connected. Tables: {}", tables);

        let llm = LlmAgent::from_config(&config);
        Ok(Self::new(config, llm, db, schema))
    }

    pub fn schema(&self) -> Schema {
        self.schema.read().clone()
    }

    /// Re-reflects the database and swaps in the new snapshot.
    pub async fn refresh_schema(&self) -> Result<Schema, AppError> {
        let schema = self.db.reflect_schema().await?;
        *self.schema.write() = schema.clone();
        Ok(schema)
    }
}
