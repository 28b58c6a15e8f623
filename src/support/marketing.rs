//! 市场专员：绑定工具调用 LLM，可与工具执行节点多轮往返

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::core::{AgentError, ConversationState, StateUpdate};
use crate::llm::{CompletionOptions, LlmClient, ToolSpec};
use crate::memory::{Message, Role};
use crate::support::prompts;
use crate::workflow::Node;

/// 若历史最后一条是 assistant 消息（上一次未完成的回复），去掉这一条；最多只去一条
pub fn trim_trailing_assistant(history: &[Message]) -> &[Message] {
    match history.split_last() {
        Some((last, rest)) if last.role == Role::Assistant => rest,
        _ => history,
    }
}

pub struct MarketingNode {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    tools: Vec<ToolSpec>,
}

impl MarketingNode {
    pub fn new(llm: Arc<dyn LlmClient>, company_name: &str, tools: Vec<ToolSpec>) -> Self {
        Self {
            llm,
            system_prompt: prompts::marketing_system(company_name),
            tools,
        }
    }
}

#[async_trait]
impl Node<ConversationState> for MarketingNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        let history = trim_trailing_assistant(&state.messages);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend_from_slice(history);

        let options = CompletionOptions::with_tools(self.tools.clone());
        let reply = self.llm.complete(&messages, &options).await?;
        info!(
            tool_calls = reply.tool_calls.len(),
            round = state.tool_rounds,
            "marketing handler replied"
        );
        Ok(StateUpdate::message(reply))
    }
}
