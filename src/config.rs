use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::services::safety::DEFAULT_MAX_ROWS;

const DEFAULT_MODEL: &str = "gpt-4.1-nano";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_DATABASE_PATH: &str = "demo.sqlite";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_key: String,
    pub model: String,
    pub temperature: f32,
    pub database_path: PathBuf,
    pub max_rows: u32,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let openai_key = std::env::var("OPENAI_API_KEY")
            .map_err(|e| anyhow::anyhow!("Failed to load OPENAI_API_KEY: {}", e))?;

        let model = env_or("OPENAI_MODEL", DEFAULT_MODEL);
        let temperature = env_or("OPENAI_TEMPERATURE", &DEFAULT_TEMPERATURE.to_string())
            .parse::<f32>()
            .context("OPENAI_TEMPERATURE must be a number")?;
        let database_path = PathBuf::from(env_or("DATABASE_PATH", DEFAULT_DATABASE_PATH));
        let max_rows = env_or("MAX_ROWS", &DEFAULT_MAX_ROWS.to_string())
            .parse::<u32>()
            .context("MAX_ROWS must be a positive integer")?;
        let bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 127.0.0.1:3000")?;

        Ok(Config {
            openai_key,
            model,
            temperature,
            database_path,
            max_rows,
            bind_addr,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn load_config() -> Result<Config> {
    Config::new()
}
