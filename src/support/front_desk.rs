//! 前台节点：先生成面向用户的回复，再用一次结构化调用把回复意图分类为路由决定

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::{AgentError, ConversationState, Representative, StateUpdate};
use crate::llm::{CompletionOptions, LlmClient};
use crate::memory::Message;
use crate::support::prompts;
use crate::workflow::Node;

/// 分类调用 content 的解码结果；Malformed 必须由调用方显式处理
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierVerdict {
    Decided(Representative),
    Malformed(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    next_representative: Option<String>,
}

impl ClassifierVerdict {
    /// 解码分类结果：content 须是 JSON 对象且含字符串字段 nextRepresentative
    pub fn decode(content: &str) -> Self {
        let raw: RawVerdict = match serde_json::from_str(content.trim()) {
            Ok(raw) => raw,
            Err(e) => return ClassifierVerdict::Malformed(format!("invalid JSON: {e}")),
        };
        match raw.next_representative {
            Some(value) => ClassifierVerdict::Decided(Representative::from_decision(&value)),
            None => ClassifierVerdict::Malformed("missing field `nextRepresentative`".to_string()),
        }
    }
}

/// 前台节点
pub struct FrontDeskNode {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl FrontDeskNode {
    pub fn new(llm: Arc<dyn LlmClient>, company_name: &str) -> Self {
        Self {
            llm,
            system_prompt: prompts::front_desk_system(company_name),
        }
    }

    async fn classify(&self, history: &[Message], reply: &Message) -> Result<ClassifierVerdict, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(Message::system(prompts::CLASSIFIER_SYSTEM));
        messages.extend_from_slice(history);
        messages.push(reply.clone());
        messages.push(Message::user(prompts::CLASSIFIER_INSTRUCTION));

        let response = self
            .llm
            .complete(&messages, &CompletionOptions::json_object())
            .await?;
        Ok(ClassifierVerdict::decode(&response.content))
    }
}

#[async_trait]
impl Node<ConversationState> for FrontDeskNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend_from_slice(&state.messages);
        let reply = self.llm.complete(&messages, &CompletionOptions::default()).await?;

        match self.classify(&state.messages, &reply).await? {
            ClassifierVerdict::Decided(next) => {
                info!(next = %next, "front desk classified reply");
                Ok(StateUpdate {
                    messages: vec![reply],
                    next_representative: Some(next),
                    tool_rounds: None,
                })
            }
            ClassifierVerdict::Malformed(reason) => {
                warn!(%reason, "classification output rejected");
                Err(AgentError::ClassificationParse {
                    reason,
                    reply: Box::new(reply),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, ResponseFormat};
    use crate::memory::Role;

    #[test]
    fn test_decode_verdicts() {
        assert_eq!(
            ClassifierVerdict::decode(r#"{"nextRepresentative": "MARKETING"}"#),
            ClassifierVerdict::Decided(Representative::Marketing)
        );
        assert_eq!(
            ClassifierVerdict::decode(r#" {"nextRepresentative": "LEARNING", "why": "x"} "#),
            ClassifierVerdict::Decided(Representative::Learning)
        );
        assert_eq!(
            ClassifierVerdict::decode(r#"{"nextRepresentative": "something else"}"#),
            ClassifierVerdict::Decided(Representative::Respond)
        );
        assert!(matches!(
            ClassifierVerdict::decode("MARKETING"),
            ClassifierVerdict::Malformed(_)
        ));
        assert!(matches!(
            ClassifierVerdict::decode(r#"{"next": "MARKETING"}"#),
            ClassifierVerdict::Malformed(ref r) if r.contains("nextRepresentative")
        ));
        assert!(matches!(
            ClassifierVerdict::decode(r#"{"nextRepresentative": 3}"#),
            ClassifierVerdict::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_front_desk_calls() {
        let llm = Arc::new(MockLlmClient::scripted([
            Message::assistant("Please hold, connecting you to marketing."),
            Message::assistant(r#"{"nextRepresentative": "MARKETING"}"#),
        ]));
        let node = FrontDeskNode::new(llm.clone(), "Acme");
        let state = ConversationState::new_turn(Vec::new(), "any coupons?");

        let update = node.run(&state).await.unwrap();
        assert_eq!(update.next_representative, Some(Representative::Marketing));
        assert_eq!(update.messages.len(), 1);

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);

        let reply_call = &calls[0];
        assert_eq!(reply_call.messages.len(), 2);
        assert_eq!(reply_call.messages[0].role, Role::System);
        assert_eq!(reply_call.options.response_format, ResponseFormat::Text);

        let classify_call = &calls[1];
        let roles: Vec<Role> = classify_call.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(classify_call.messages[0].content, prompts::CLASSIFIER_SYSTEM);
        assert_eq!(classify_call.messages[2].content, "Please hold, connecting you to marketing.");
        assert_eq!(classify_call.options.response_format, ResponseFormat::JsonObject);
    }

    #[tokio::test]
    async fn test_malformed_classification_carries_reply() {
        let llm = Arc::new(MockLlmClient::scripted([
            Message::assistant("Hello!"),
            Message::assistant("not json"),
        ]));
        let node = FrontDeskNode::new(llm, "Acme");
        let state = ConversationState::new_turn(Vec::new(), "hi");

        match node.run(&state).await {
            Err(AgentError::ClassificationParse { reply, .. }) => assert_eq!(reply.content, "Hello!"),
            other => panic!("expected ClassificationParse, got {other:?}"),
        }
    }
}
