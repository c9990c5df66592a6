pub mod assistant;
pub mod chart;
pub mod datasource;
pub mod llm_agent;
pub mod normalizer;
pub mod response_repair;
pub mod safety;
