//! 知识库检索工具：把 KnowledgeBase::retrieve 包装成 LLM 可调用的工具

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::knowledge::KnowledgeBase;
use crate::tools::schema::parameters_schema;
use crate::tools::Tool;

pub const RETRIEVE_TOOL_NAME: &str = "retrieve_learning_knowledge_base";

/// 未检索到内容时返回给 LLM 的文本
pub const NO_PASSAGES: &str = "No relevant passages found.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveArgs {
    /// Natural language question to search the course knowledge base for
    pub query: String,
}

/// 检索工具：返回最相关的若干段落，段落之间空行分隔
pub struct RetrieveKnowledgeTool {
    kb: Arc<KnowledgeBase>,
    top_k: usize,
}

impl RetrieveKnowledgeTool {
    pub fn new(kb: Arc<KnowledgeBase>, top_k: usize) -> Self {
        Self {
            kb,
            top_k: top_k.max(1),
        }
    }
}

#[async_trait]
impl Tool for RetrieveKnowledgeTool {
    fn name(&self) -> &str {
        RETRIEVE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search and return information about courses, curriculum and learning material"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<RetrieveArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: RetrieveArgs =
            serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))?;
        let results = self
            .kb
            .retrieve(&args.query, self.top_k)
            .await
            .map_err(|e| e.to_string())?;

        if results.is_empty() {
            return Ok(NO_PASSAGES.to_string());
        }
        Ok(results
            .into_iter()
            .map(|r| r.chunk.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
