use std::sync::Arc;

use sql_assistant::config::Config;
use sql_assistant::models::Schema;
use sql_assistant::services::datasource::DataSource;
use sql_assistant::services::llm_agent::LlmAgent;
use sql_assistant::AppState;
use tokio_rusqlite::Connection;

pub const HR_SQL: &str = "
    CREATE TABLE Employees(id INTEGER PRIMARY KEY, name TEXT, city TEXT, department_id INTEGER, salary REAL);
    CREATE TABLE departments(department_id INTEGER PRIMARY KEY, department_name TEXT);
    INSERT INTO departments VALUES (1, 'Engineering'), (2, 'Marketing');
    INSERT INTO Employees VALUES
        (1, 'Alice', 'New York', 1, 90000),
        (2, 'Bob', 'Chicago', 2, 75000),
        (3, 'Charlie', 'New York', 1, 80000);
";

pub async fn hr_database() -> DataSource {
    let conn = Connection::open_in_memory().await.unwrap();
    conn.call(|conn| {
        conn.execute_batch(HR_SQL)?;
        Ok(())
    })
    .await
    .unwrap();
    DataSource::from_connection(conn)
}

pub fn test_config() -> Config {
    Config {
        openai_key: "sk-test".to_string(),
        model: "gpt-4.1-nano".to_string(),
        temperature: 0.2,
        database_path: ":memory:".into(),
        max_rows: 200,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

/// State over the HR database with the given (possibly stale) snapshot.
pub async fn test_state(snapshot: Schema) -> Arc<AppState> {
    let config = test_config();
    let llm = LlmAgent::from_config(&config);
    Arc::new(AppState::new(config, llm, hr_database().await, snapshot))
}
