//! 工具执行节点：按请求顺序执行最后一条 assistant 消息中的工具调用，结果以 tool 消息追加

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::{AgentError, ConversationState, StateUpdate};
use crate::memory::{Message, Role, ToolCallRequest};
use crate::support::UnknownToolPolicy;
use crate::tools::ToolExecutor;
use crate::workflow::Node;

pub struct ToolNode {
    executor: ToolExecutor,
    max_rounds: usize,
    policy: UnknownToolPolicy,
}

impl ToolNode {
    pub fn new(executor: ToolExecutor, max_rounds: usize, policy: UnknownToolPolicy) -> Self {
        Self {
            executor,
            max_rounds,
            policy,
        }
    }
}

#[async_trait]
impl Node<ConversationState> for ToolNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        if state.tool_rounds >= self.max_rounds {
            warn!(limit = self.max_rounds, "tool loop bound reached");
            return Err(AgentError::ToolLoopExceeded(self.max_rounds));
        }

        let calls: &[ToolCallRequest] = match state.last_message() {
            Some(m) if m.role == Role::Assistant => m.tool_calls.as_slice(),
            _ => &[],
        };

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let content = match self.executor.execute(&call.name, call.arguments.clone()).await {
                Ok(output) => output,
                Err(e) if e.is_tool_failure() && self.policy == UnknownToolPolicy::Report => {
                    warn!(tool = %call.name, error = %e, "tool failure reported to model");
                    format!("Error: {e}")
                }
                Err(e) => return Err(e),
            };
            results.push(Message::tool(call.id.as_str(), content));
        }

        let round = state.tool_rounds + 1;
        info!(calls = results.len(), round, "tool round finished");
        Ok(StateUpdate {
            messages: results,
            next_representative: None,
            tool_rounds: Some(round),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ToolRegistry};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn node(policy: UnknownToolPolicy, max_rounds: usize) -> ToolNode {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("upper", "", |args: Value| {
            Ok(args["text"].as_str().unwrap_or_default().to_uppercase())
        }));
        registry.register(FnTool::new("broken", "", |_: Value| Err("db down".to_string())));
        ToolNode::new(ToolExecutor::new(Arc::new(registry), 5), max_rounds, policy)
    }

    fn requesting(calls: Vec<ToolCallRequest>) -> ConversationState {
        let mut state = ConversationState::new_turn(Vec::new(), "q");
        state.messages.push(Message::assistant_with_tool_calls("", calls));
        state
    }

    #[tokio::test]
    async fn test_results_in_request_order() {
        let state = requesting(vec![
            ToolCallRequest::new("c1", "upper", json!({"text": "a"})),
            ToolCallRequest::new("c2", "upper", json!({"text": "b"})),
        ]);
        let update = node(UnknownToolPolicy::Report, 5).run(&state).await.unwrap();

        assert_eq!(update.messages, vec![Message::tool("c1", "A"), Message::tool("c2", "B")]);
        assert_eq!(update.tool_rounds, Some(1));
    }

    #[tokio::test]
    async fn test_report_policy_turns_failures_into_messages() {
        let state = requesting(vec![
            ToolCallRequest::new("c1", "missing", json!({})),
            ToolCallRequest::new("c2", "broken", json!({})),
        ]);
        let update = node(UnknownToolPolicy::Report, 5).run(&state).await.unwrap();

        assert_eq!(update.messages.len(), 2);
        assert_eq!(update.messages[0].tool_call_id.as_deref(), Some("c1"));
        assert!(update.messages[0].content.starts_with("Error: Unknown tool: missing"));
        assert!(update.messages[1].content.contains("db down"));
    }

    #[tokio::test]
    async fn test_abort_policy_fails_turn() {
        let state = requesting(vec![ToolCallRequest::new("c1", "missing", json!({}))]);
        let err = node(UnknownToolPolicy::Abort, 5).run(&state).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolLookup(ref n) if n == "missing"));
    }

    #[tokio::test]
    async fn test_round_bound() {
        let mut state = requesting(vec![ToolCallRequest::new("c1", "upper", json!({"text": "a"}))]);
        state.tool_rounds = 2;
        let err = node(UnknownToolPolicy::Report, 2).run(&state).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolLoopExceeded(2)));
    }
}
