//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CONCIERGE__*` 覆盖（双下划线表示嵌套，如 `CONCIERGE__LLM__PROVIDER=mock`）。
//! API Key 只从环境变量读取（OPENAI_API_KEY / DEEPSEEK_API_KEY），不进配置文件。

use std::path::PathBuf;

use serde::Deserialize;

use crate::knowledge::ChunkingConfig;
use crate::support::{SupportSettings, UnknownToolPolicy};
use crate::tools::OFFERS_TOOL_NAME;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub support: SupportSection,
    pub tools: ToolsSection,
    pub knowledge: KnowledgeSection,
}

/// [app] 段：跨轮保留的对话轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 驱动程序在多轮之间保留的历史轮数
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            max_context_turns: 20,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub deepseek: LlmDeepSeekSection,
    pub openai: LlmOpenAiSection,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [support] 段：客服工作流
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupportSection {
    pub company_name: String,
    /// 绑定给市场专员的工具
    pub marketing_tools: Vec<String>,
    /// 每轮最多执行的工具轮数
    pub max_tool_rounds: usize,
    /// 每轮最多执行的节点数
    pub recursion_limit: usize,
}

impl Default for SupportSection {
    fn default() -> Self {
        Self {
            company_name: "Code Academy".to_string(),
            marketing_tools: vec![OFFERS_TOOL_NAME.to_string()],
            max_tool_rounds: 5,
            recursion_limit: 25,
        }
    }
}

/// [tools] 段：工具超时与失败处理
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub unknown_tool_policy: UnknownToolPolicy,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            unknown_tool_policy: UnknownToolPolicy::Report,
        }
    }
}

/// [knowledge] 段：知识库索引与分块
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeSection {
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// 检索返回的段落数
    pub top_k: usize,
    pub embedding_model: String,
    /// 嵌入服务地址，未设置时用 OpenAI
    pub base_url: Option<String>,
}

impl Default for KnowledgeSection {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("data/knowledge_index.json"),
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 4,
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
        }
    }
}

impl KnowledgeSection {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            ..ChunkingConfig::default()
        }
    }
}

impl AppConfig {
    /// 工作流构建参数
    pub fn support_settings(&self) -> SupportSettings {
        SupportSettings {
            company_name: self.support.company_name.clone(),
            marketing_tools: self.support.marketing_tools.clone(),
            max_tool_rounds: self.support.max_tool_rounds,
            tool_timeout_secs: self.tools.tool_timeout_secs,
            unknown_tool_policy: self.tools.unknown_tool_policy,
            recursion_limit: self.support.recursion_limit,
        }
    }
}

/// 从 config 目录加载配置，环境变量 CONCIERGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CONCIERGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(env_source());

    builder.build()?.try_deserialize()
}

/// CONCIERGE__* 环境变量；列表键以逗号分隔（如 CONCIERGE__SUPPORT__MARKETING_TOOLS=a,b）
fn env_source() -> config::Environment {
    config::Environment::with_prefix("CONCIERGE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("support.marketing_tools")
}
