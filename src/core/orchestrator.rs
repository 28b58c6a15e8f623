//! 运行时装配：按配置创建 LLM、知识库、工具注册表与客服工作流，并驱动多轮对话
//!
//! 每轮对话新建 ConversationState（历史 + 新用户消息），跑完后把最终消息写回短期记忆。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::{AgentError, ConversationState};
use crate::knowledge::KnowledgeBase;
use crate::llm::{create_deepseek_client, create_embedder_from_config, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::ConversationMemory;
use crate::support::{build_support_workflow, SupportSettings};
use crate::tools::{OffersTool, RetrieveKnowledgeTool, ToolRegistry};
use crate::workflow::{CompiledWorkflow, StepSnapshot};

/// 根据配置选择 LLM 后端（OpenAI 兼容 / DeepSeek / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);
    let has_key = |name: &str| std::env::var(name).map(|k| !k.is_empty()).unwrap_or(false);

    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => {
            info!("Using Mock LLM");
            Ok(Arc::new(MockLlmClient::new()))
        }
        "deepseek" if has_key("DEEPSEEK_API_KEY") || has_key("OPENAI_API_KEY") => {
            let model = cfg.llm.deepseek.model.as_deref().unwrap_or(&cfg.llm.model);
            info!(model, "Using DeepSeek LLM");
            Ok(Arc::new(create_deepseek_client(Some(model), timeout)?))
        }
        "openai" if has_key("OPENAI_API_KEY") => {
            let model = cfg.llm.openai.model.as_deref().unwrap_or(&cfg.llm.model);
            info!(model, "Using OpenAI LLM");
            Ok(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                model,
                None,
                timeout,
            )?))
        }
        "deepseek" | "openai" => {
            warn!(provider = %cfg.llm.provider, "No API key set, using Mock LLM");
            Ok(Arc::new(MockLlmClient::new()))
        }
        other => Err(AgentError::ConfigError(format!("unknown llm provider '{other}'"))),
    }
}

/// 打开已有的知识库索引；没有索引文件或没有嵌入服务时返回 None
pub async fn open_knowledge_base(cfg: &AppConfig) -> Result<Option<Arc<KnowledgeBase>>, AgentError> {
    let index_path = &cfg.knowledge.index_path;
    if !index_path.exists() {
        info!(path = %index_path.display(), "no knowledge index, retrieval tool disabled");
        return Ok(None);
    }
    let Some(embedder) =
        create_embedder_from_config(cfg.knowledge.base_url.as_deref(), &cfg.knowledge.embedding_model)
    else {
        warn!("knowledge index present but no embedding provider, retrieval tool disabled");
        return Ok(None);
    };
    let kb = KnowledgeBase::open(embedder, cfg.knowledge.chunking(), index_path).await?;
    Ok(Some(Arc::new(kb)))
}

/// 把本地文档加入知识库索引（索引文件不存在时新建），返回写入的块数
pub async fn ingest_document(cfg: &AppConfig, document: &Path) -> Result<usize, AgentError> {
    let embedder =
        create_embedder_from_config(cfg.knowledge.base_url.as_deref(), &cfg.knowledge.embedding_model)
            .ok_or_else(|| AgentError::ConfigError("OPENAI_API_KEY is required for ingestion".to_string()))?;

    let index_path = &cfg.knowledge.index_path;
    let kb = if index_path.exists() {
        KnowledgeBase::open(embedder, cfg.knowledge.chunking(), index_path).await?
    } else {
        KnowledgeBase::new(embedder, cfg.knowledge.chunking())
    };
    let added = kb.ingest_file(document).await?;
    kb.save(index_path).await?;
    Ok(added)
}

/// 内置工具：优惠查询；有知识库时再加检索工具
pub fn create_tool_registry(cfg: &AppConfig, knowledge: Option<Arc<KnowledgeBase>>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(OffersTool);
    if let Some(kb) = knowledge {
        tools.register(RetrieveKnowledgeTool::new(kb, cfg.knowledge.top_k));
    }
    tools
}

/// 客服运行时：编译好的工作流 + 跨轮短期记忆
pub struct SupportRuntime {
    llm: Arc<dyn LlmClient>,
    workflow: CompiledWorkflow<ConversationState>,
    memory: ConversationMemory,
}

impl SupportRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        settings: &SupportSettings,
        max_context_turns: usize,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            workflow: build_support_workflow(llm.clone(), tools, settings)?,
            llm,
            memory: ConversationMemory::new(max_context_turns),
        })
    }

    /// 按配置装配完整运行时
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let llm = create_llm_from_config(cfg)?;
        let knowledge = open_knowledge_base(cfg).await?;
        let tools = Arc::new(create_tool_registry(cfg, knowledge));
        info!(tools = ?tools.tool_names(), "tool registry ready");
        Self::new(llm, tools, &cfg.support_settings(), cfg.app.max_context_turns)
    }

    /// 后端累计 token 使用：(prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }

    /// 执行一轮：每个快照回调一次 on_step；成功后写回记忆，失败时本轮不进入记忆
    pub async fn run_turn<F>(&mut self, input: &str, mut on_step: F) -> Result<ConversationState, AgentError>
    where
        F: FnMut(&StepSnapshot<ConversationState>),
    {
        let turn_id = uuid::Uuid::new_v4();
        info!(turn = %turn_id, history = self.memory.len(), "turn started");
        let initial = ConversationState::new_turn(self.memory.messages().to_vec(), input);
        let mut last = initial.clone();
        let mut steps = self.workflow.stream(initial);
        while let Some(snapshot) = steps.next().await {
            let snapshot = snapshot?;
            on_step(&snapshot);
            last = snapshot.state;
        }
        drop(steps);

        let (prompt_tokens, completion_tokens, total_tokens) = self.token_usage();
        info!(
            turn = %turn_id,
            messages = last.messages.len(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "turn finished"
        );
        self.memory.replace(last.messages.clone());
        Ok(last)
    }
}
