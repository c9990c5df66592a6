use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, Role, CreateChatCompletionRequest,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent,
    },
    Client,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;
use crate::models::Schema;

/// Chat-completion client asked for a JSON `sql`/`summary`/`chart` reply.
pub struct LlmAgent {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl LlmAgent {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.openai_key, &config.model, config.temperature)
    }

    /// Raw text of the model's reply, trimmed.
    pub async fn complete(&self, question: &str, schema: &Schema) -> Result<String, AppError> {
        info!("Sending question to {} ({} tables in schema)", self.model, schema.len());

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: system_prompt(schema),
                    name: None,
                    role: Role::System,
                }
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(question.to_string()),
                    name: None,
                    role: Role::User,
                }
            ),
        ];

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            ..Default::default()
        };

        let response = self.client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;

        let content = response.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LlmError("Model returned no content".to_string()))?;

        debug!("Raw model reply: {}", content);
        Ok(content.trim().to_string())
    }
}

/// One `- table(col1, col2)` line per table.
pub fn schema_markdown(schema: &Schema) -> String {
    schema
        .iter()
        .map(|(table, columns)| format!("- {}({})", table, columns.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(schema: &Schema) -> String {
    format!(
        r#"You are a data analyst that writes safe SQL and summaries.

SCHEMA:
{}

RULES:
- Return valid JSON with keys: sql, summary, chart
- sql: SELECT-only statement (CTEs ok, no INSERT/UPDATE/DELETE)
- Always LIMIT results if user doesn't
- Use table and column names EXACTLY as they appear in the SCHEMA above.
- Never invent new tables or columns.
- summary: short English explanation
- chart: Vega-Lite JSON spec or null
- Do not include comments or text outside the JSON object.
"#,
        schema_markdown(schema)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_markdown_lists_tables_with_columns() {
        let schema: Schema = [
            ("employees".to_string(), vec!["id".to_string(), "name".to_string()]),
            ("departments".to_string(), vec!["department_id".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            schema_markdown(&schema),
            "- departments(department_id)\n- employees(id, name)"
        );
    }

    #[test]
    fn system_prompt_embeds_schema_and_rules() {
        let schema: Schema = [("Employees".to_string(), vec!["id".to_string()])]
            .into_iter()
            .collect();
        let prompt = system_prompt(&schema);
        assert!(prompt.contains("- Employees(id)"));
        assert!(prompt.contains("Return valid JSON with keys: sql, summary, chart"));
    }
}
