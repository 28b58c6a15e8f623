//! 客服路由工作流
//!
//! 前台回复并分类 -> 路由到市场专员（可与工具节点循环）/ 学习专员 / 直接结束。
//! 所有依赖（LLM、工具注册表）在构建时注入，编译后的工作流可被多个会话并发运行。

pub mod front_desk;
pub mod learning;
pub mod marketing;
pub mod prompts;
pub mod router;
pub mod tool_node;

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::core::{AgentError, ConversationState};
use crate::llm::LlmClient;
use crate::tools::{ToolExecutor, ToolRegistry, OFFERS_TOOL_NAME};
use crate::workflow::{CompiledWorkflow, WorkflowBuilder, WorkflowError, END, START};

pub use front_desk::{ClassifierVerdict, FrontDeskNode};
pub use learning::LearningNode;
pub use marketing::{trim_trailing_assistant, MarketingNode};
pub use router::{is_marketing_tool_next, who_is_next};
pub use tool_node::ToolNode;

pub const FRONT_DESK: &str = "front_desk_support";
pub const MARKETING: &str = "marketing_support";
pub const LEARNING: &str = "learning_support";
pub const MARKETING_TOOLS: &str = "marketing_tools";

/// 工具查找 / 执行失败时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// 以 "Error: ..." 工具结果消息回给模型，由专员向用户解释
    #[default]
    Report,
    /// 终止本轮
    Abort,
}

/// 构建客服工作流所需的参数
#[derive(Debug, Clone)]
pub struct SupportSettings {
    pub company_name: String,
    /// 绑定给市场专员的工具名
    pub marketing_tools: Vec<String>,
    pub max_tool_rounds: usize,
    pub tool_timeout_secs: u64,
    pub unknown_tool_policy: UnknownToolPolicy,
    pub recursion_limit: usize,
}

impl Default for SupportSettings {
    fn default() -> Self {
        Self {
            company_name: "Code Academy".to_string(),
            marketing_tools: vec![OFFERS_TOOL_NAME.to_string()],
            max_tool_rounds: 5,
            tool_timeout_secs: 30,
            unknown_tool_policy: UnknownToolPolicy::Report,
            recursion_limit: 25,
        }
    }
}

/// 用满工具轮数并触发 ToolLoopExceeded 所需的最少步数：
/// 前台 + 专员，每轮 工具 + 专员，再加越界的那次工具节点
pub fn min_recursion_limit(max_tool_rounds: usize) -> usize {
    2 * max_tool_rounds + 3
}

/// 组装客服工作流
///
/// - marketing_tools 中有未注册的名称时报 ToolLookup
/// - recursion_limit 小于 [`min_recursion_limit`] 时报 InvalidConfiguration
pub fn build_support_workflow(
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    settings: &SupportSettings,
) -> Result<CompiledWorkflow<ConversationState>, AgentError> {
    let required = min_recursion_limit(settings.max_tool_rounds);
    if settings.recursion_limit < required {
        return Err(WorkflowError::InvalidConfiguration(format!(
            "recursion_limit {} is below {} needed for max_tool_rounds {}",
            settings.recursion_limit, required, settings.max_tool_rounds
        ))
        .into());
    }

    let marketing_specs = tools.specs_for(settings.marketing_tools.as_slice())?;
    info!(
        company = %settings.company_name,
        marketing_tools = ?settings.marketing_tools,
        max_tool_rounds = settings.max_tool_rounds,
        "building support workflow"
    );

    let executor = ToolExecutor::new(tools, settings.tool_timeout_secs);

    let workflow = WorkflowBuilder::new("customer_support")
        .add_node(FRONT_DESK, FrontDeskNode::new(llm.clone(), &settings.company_name))
        .add_node(
            MARKETING,
            MarketingNode::new(llm, &settings.company_name, marketing_specs),
        )
        .add_node(LEARNING, LearningNode)
        .add_node(
            MARKETING_TOOLS,
            ToolNode::new(executor, settings.max_tool_rounds, settings.unknown_tool_policy),
        )
        .add_edge(START, FRONT_DESK)
        .add_conditional_edges(
            FRONT_DESK,
            who_is_next,
            [(MARKETING, MARKETING), (LEARNING, LEARNING), (END, END)],
        )
        .add_conditional_edges(
            MARKETING,
            is_marketing_tool_next,
            [(MARKETING_TOOLS, MARKETING_TOOLS), (END, END)],
        )
        .add_edge(MARKETING_TOOLS, MARKETING)
        .add_edge(LEARNING, END)
        .recursion_limit(settings.recursion_limit)
        .build()?;

    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::OffersTool;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(OffersTool);
        Arc::new(registry)
    }

    #[test]
    fn test_build_support_workflow() {
        let workflow = build_support_workflow(
            Arc::new(MockLlmClient::new()),
            registry(),
            &SupportSettings::default(),
        )
        .unwrap();
        assert_eq!(workflow.node_count(), 4);
        assert_eq!(workflow.name(), "customer_support");
    }

    #[test]
    fn test_unknown_marketing_tool_rejected() {
        let settings = SupportSettings {
            marketing_tools: vec!["coupon_printer".to_string()],
            ..SupportSettings::default()
        };
        let result = build_support_workflow(Arc::new(MockLlmClient::new()), registry(), &settings);
        assert!(matches!(result, Err(AgentError::ToolLookup(ref n)) if n == "coupon_printer"));
    }

    #[test]
    fn test_recursion_limit_must_cover_tool_rounds() {
        let settings = SupportSettings {
            max_tool_rounds: 3,
            recursion_limit: 7,
            ..SupportSettings::default()
        };
        let result = build_support_workflow(Arc::new(MockLlmClient::new()), registry(), &settings);
        assert!(matches!(
            result,
            Err(AgentError::Workflow(WorkflowError::InvalidConfiguration(_)))
        ));

        let settings = SupportSettings {
            recursion_limit: min_recursion_limit(3),
            ..settings
        };
        assert!(build_support_workflow(Arc::new(MockLlmClient::new()), registry(), &settings).is_ok());
        assert!(SupportSettings::default().recursion_limit >= min_recursion_limit(5));
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: UnknownToolPolicy = serde_json::from_str("\"abort\"").unwrap();
        assert_eq!(policy, UnknownToolPolicy::Abort);
    }
}
