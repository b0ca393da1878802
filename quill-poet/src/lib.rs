//! # Quill Poet
//!
//! A single LLM agent that writes a poem from words a human supplies
//! through the quill bridge:
//! 1. The agent asks how many words to rhyme around
//! 2. It asks for each word, one question at a time
//! 3. It composes the poem and returns it as the run's result
//!
//! Questions reach the human through [`tool::HumanInputTool`].

pub mod agent;
pub mod config;
pub mod poet;
pub mod provider;
pub mod tool;

pub use agent::{Agent, AgentError, AgentOutcome, Task};
pub use config::{Cli, HarnessConfig, LlmConfig, PoetConfig};
pub use provider::{
    ChatMessage, ChatModel, CompletionRequest, CompletionResponse, FinishReason,
    OpenAiCompatProvider, ProviderError, Role, ToolCall, ToolDefinition,
};
pub use tool::{HumanInputTool, Tool, ToolError};
