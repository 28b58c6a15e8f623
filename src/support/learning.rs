//! 学习专员：当前为直通占位节点，不修改状态
//!
//! 扩展时按市场专员的形状实现（绑定知识库检索工具 + 工具循环）。

use async_trait::async_trait;
use tracing::info;

use crate::core::{AgentError, ConversationState, StateUpdate};
use crate::workflow::Node;

pub struct LearningNode;

#[async_trait]
impl Node<ConversationState> for LearningNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        info!(messages = state.messages.len(), "handled by learning team");
        Ok(StateUpdate::default())
    }
}
