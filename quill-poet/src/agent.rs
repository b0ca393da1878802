//! Agent implementation - drives the completion <-> tool loop

use crate::provider::{
    ChatMessage, ChatModel, CompletionRequest, FinishReason, ProviderError, ToolCall,
};
use crate::tool::Tool;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Provider(#[from] ProviderError),
    #[error("no final answer after {0} iterations")]
    IterationLimit(usize),
    #[error("empty LLM response")]
    EmptyResponse,
}

/// A unit of work handed to an agent
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "{}\n\nThis is the expected output for your final answer: {}",
            self.description, self.expected_output
        )
    }
}

/// Result from a completed run
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub output: String,
    pub iterations: usize,
    pub tool_calls: usize,
    /// The model stopped at its token limit, so `output` may be cut short.
    pub truncated: bool,
}

pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    tools: Vec<Box<dyn Tool>>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            max_iterations: 20,
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}\n\
             Use the tools available to you whenever you need information from the user. \
             When you have the final answer, reply with it directly and without tool calls.",
            self.role, self.backstory, self.goal
        )
    }

    /// Run `task` to completion against `model`.
    pub async fn run<M: ChatModel>(&self, model: &M, task: &Task) -> Result<AgentOutcome, AgentError> {
        info!("Agent '{}' starting task", self.role);

        let definitions: Vec<_> = self.tools.iter().map(|t| t.definition()).collect();
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(task.prompt()),
        ];
        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            let request = CompletionRequest::new(messages.clone()).with_tools(definitions.clone());
            let response = model.complete(request).await?;

            if response.tool_calls.is_empty() {
                let truncated = response.finish_reason == FinishReason::Length;
                if truncated {
                    warn!("final answer hit the token limit and may be incomplete");
                }
                let output = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(AgentError::EmptyResponse)?;
                info!("Agent finished after {iteration} iterations, {tool_calls} tool calls");
                return Ok(AgentOutcome {
                    output,
                    iterations: iteration,
                    tool_calls,
                    truncated,
                });
            }

            debug!(
                "iteration {iteration}: {} tool calls requested",
                response.tool_calls.len()
            );
            messages.push(ChatMessage::assistant_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.invoke(call).await;
                messages.push(ChatMessage::tool_result(&call.id, result));
                tool_calls += 1;
            }
        }

        Err(AgentError::IterationLimit(self.max_iterations))
    }

    /// Failures are reported back to the model as the tool result so it can
    /// correct itself.
    async fn invoke(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name()) else {
            warn!("model requested unknown tool '{}'", call.name());
            return format!("Error: unknown tool '{}'", call.name());
        };
        match tool.call(call.arguments()).await {
            Ok(result) => result,
            Err(e) => {
                warn!("tool '{}' failed: {e}", call.name());
                format!("Error: {e}")
            }
        }
    }
}
