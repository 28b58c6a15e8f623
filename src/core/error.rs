//! 编排错误类型
//!
//! 任一节点返回错误即终止当前轮次；step 流以 Err 结束而不是最终快照。

use thiserror::Error;

use crate::knowledge::KnowledgeError;
use crate::llm::LlmError;
use crate::memory::Message;
use crate::workflow::WorkflowError;

/// 一轮对话编排中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 分类调用的 content 不是合法 JSON 或缺少 nextRepresentative；
    /// reply 为已生成但未并入状态的前台回复，调用方可自行保留
    #[error("Classification parse error: {reason}")]
    ClassificationParse { reason: String, reply: Box<Message> },

    #[error("Unknown tool: {0}")]
    ToolLookup(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Tool loop exceeded {0} rounds")]
    ToolLoopExceeded(usize),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 工具层面的失败（查找失败 / 执行失败 / 超时），可按策略转为 tool 结果消息
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            AgentError::ToolLookup(_) | AgentError::ToolExecutionFailed(_) | AgentError::ToolTimeout(_)
        )
    }
}
