//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本顺序返回预设回复，并记录每次调用收到的消息与可选项，便于断言。
//! 脚本用完后回退为回显：结构化调用返回 RESPOND，普通调用回显最后一条 User 消息。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError, ResponseFormat};
use crate::memory::{Message, Role};

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// Mock 客户端：脚本化回复 + 调用记录
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<Message, LlmError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    /// 脚本用完后是否报错（测试中用于发现多余调用）
    strict: bool,
}

impl MockLlmClient {
    /// 回显模式（无脚本）
    pub fn new() -> Self {
        Self::default()
    }

    /// 严格脚本模式：按顺序返回 replies，用完后返回 ScriptExhausted
    pub fn scripted(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
            strict: true,
        }
    }

    pub fn push_error(&self, error: LlmError) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn echo(messages: &[Message], options: &CompletionOptions) -> Message {
        if options.response_format == ResponseFormat::JsonObject {
            return Message::assistant(r#"{"nextRepresentative": "RESPOND"}"#);
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Message::assistant(format!("Echo from Mock: {last_user}"))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                messages: messages.to_vec(),
                options: options.clone(),
            });

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(reply) => reply,
            None if self.strict => Err(LlmError::ScriptExhausted),
            None => Ok(Self::echo(messages, options)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order_then_exhausted() {
        let llm = MockLlmClient::scripted([Message::assistant("one"), Message::assistant("two")]);
        let opts = CompletionOptions::default();

        assert_eq!(llm.complete(&[], &opts).await.unwrap().content, "one");
        assert_eq!(llm.complete(&[], &opts).await.unwrap().content, "two");
        assert!(matches!(
            llm.complete(&[], &opts).await,
            Err(LlmError::ScriptExhausted)
        ));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let llm = MockLlmClient::new();
        let reply = llm
            .complete(&[Message::user("hello")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "Echo from Mock: hello");

        let verdict = llm
            .complete(&[Message::user("hello")], &CompletionOptions::json_object())
            .await
            .unwrap();
        assert!(verdict.content.contains("RESPOND"));
    }

    #[tokio::test]
    async fn test_records_options() {
        let llm = MockLlmClient::scripted([Message::assistant("{}")]);
        llm.complete(&[Message::user("q")], &CompletionOptions::json_object())
            .await
            .unwrap();
        let calls = llm.calls();
        assert_eq!(calls[0].options.response_format, ResponseFormat::JsonObject);
        assert_eq!(calls[0].messages, vec![Message::user("q")]);
    }
}
