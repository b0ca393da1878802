use crate::provider::ToolDefinition;
use async_trait::async_trait;
use quill_bridge::BridgeHandle;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A capability the agent can invoke between completions.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run with the raw JSON argument string the model produced.
    async fn call(&self, arguments: &str) -> Result<String, ToolError>;

    fn name(&self) -> String {
        self.definition().name
    }
}

/// Asks the connected human a question and returns their reply.
pub struct HumanInputTool {
    bridge: BridgeHandle,
    timeout: Duration,
}

impl HumanInputTool {
    pub const NAME: &'static str = "human_input";

    pub fn new(bridge: BridgeHandle, timeout: Duration) -> Self {
        Self { bridge, timeout }
    }
}

#[async_trait]
impl Tool for HumanInputTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Ask questions and get answers from a human through a websocket connection",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "question for context" }
            },
            "required": ["question"]
        }))
    }

    async fn call(&self, arguments: &str) -> Result<String, ToolError> {
        let question = parse_question(arguments)?;
        info!("Asking human: {question}");

        self.bridge.send_question(question);
        let answer = self.bridge.await_answer(self.timeout).await;
        if answer.is_timed_out() {
            info!("No answer within {:?}", self.timeout);
        }
        let answer = answer.into_text();
        info!("Received answer: {answer}");

        Ok(answer)
    }
}

/// Models send `{"question": "..."}`, but a bare JSON string or plain text
/// is accepted too.
fn parse_question(arguments: &str) -> Result<String, ToolError> {
    let value = serde_json::from_str::<Value>(arguments)
        .unwrap_or_else(|_| Value::String(arguments.to_string()));

    let question = match value {
        Value::Object(map) => match map.get("question") {
            Some(Value::String(q)) => q.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(ToolError::InvalidArguments(
                    "missing field 'question'".into(),
                ))
            }
        },
        Value::String(q) => q,
        other => {
            return Err(ToolError::InvalidArguments(format!(
                "expected an object with 'question', got {other}"
            )))
        }
    };

    if question.trim().is_empty() {
        return Err(ToolError::InvalidArguments("question is empty".into()));
    }
    Ok(question)
}
