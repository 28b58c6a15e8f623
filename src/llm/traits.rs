//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：输入有序消息与可选项，返回一条 assistant 消息。
//! 可选项支持结构化 JSON 输出与工具绑定（返回消息可能携带 tool_calls）。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用失败（网络、服务端、响应格式）
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Mock script exhausted")]
    ScriptExhausted,
}

/// 输出格式约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// 要求 content 可解析为 JSON 对象
    JsonObject,
}

/// 绑定给模型的工具声明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// 参数 JSON Schema
    pub parameters: Value,
}

/// 单次调用的可选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub response_format: ResponseFormat,
    pub tools: Vec<ToolSpec>,
}

impl CompletionOptions {
    pub fn json_object() -> Self {
        Self {
            response_format: ResponseFormat::JsonObject,
            ..Self::default()
        }
    }

    pub fn with_tools(tools: Vec<ToolSpec>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }
}

/// LLM 客户端 trait：需无状态 / 可重入，多个会话并发共享同一实例
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
