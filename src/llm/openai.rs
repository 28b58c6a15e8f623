//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 支持 response_format=json_object 与 function 工具绑定。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
    ResponseFormat as ApiResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::llm::{CompletionOptions, LlmClient, LlmError, ResponseFormat, ToolSpec};
use crate::memory::{Message, Role, ToolCallRequest};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 async_openai Client 与 model 名
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new()
                .with_api_base(url.trim_end_matches('/'))
                .with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(config).with_http_client(http),
            model: model.to_string(),
            usage: TokenUsage::new(),
        })
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !options.tools.is_empty() {
            args.tools(options.tools.iter().map(to_tool).collect::<Vec<_>>());
        }
        if options.response_format == ResponseFormat::JsonObject {
            args.response_format(ApiResponseFormat::JsonObject);
        }
        args.build()
    }
}

/// 内部消息 -> API 请求消息；带 tool_calls 的 assistant 消息 content 为空时不发送 content
fn to_request_message(m: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let message: ChatCompletionRequestMessage = match m.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(m.content.clone())
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(m.content.clone())
            .build()?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !m.content.is_empty() || m.tool_calls.is_empty() {
                args.content(m.content.clone());
            }
            if !m.tool_calls.is_empty() {
                args.tool_calls(m.tool_calls.iter().map(to_api_tool_call).collect::<Vec<_>>());
            }
            args.build()?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .content(m.content.clone())
            .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
            .build()?
            .into(),
    };
    Ok(message)
}

fn to_api_tool_call(call: &ToolCallRequest) -> ChatCompletionMessageToolCalls {
    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
        id: call.id.clone(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    })
}

fn to_tool(spec: &ToolSpec) -> ChatCompletionTools {
    ChatCompletionTools::Function(ChatCompletionTool {
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    })
}

/// arguments 在线上是 JSON 字符串；无法解析时原样保留为字符串，交给工具报错
fn parse_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&raw).unwrap_or(Value::String(raw))
    }
}

fn from_api_tool_call(call: ChatCompletionMessageToolCalls) -> ToolCallRequest {
    match call {
        ChatCompletionMessageToolCalls::Function(call) => {
            ToolCallRequest::new(call.id, call.function.name, parse_arguments(call.function.arguments))
        }
        ChatCompletionMessageToolCalls::Custom(call) => {
            ToolCallRequest::new(call.id, call.custom_tool.name, Value::String(call.custom_tool.input))
        }
    }
}

/// API 响应消息 -> 内部 assistant 消息
fn from_response_message(m: ChatCompletionResponseMessage) -> Message {
    let calls = m
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(from_api_tool_call)
        .collect();
    Message::assistant_with_tool_calls(m.content.unwrap_or_default(), calls)
}

fn map_error(e: OpenAIError) -> LlmError {
    match e {
        OpenAIError::ApiError(api) => LlmError::Api(api.to_string()),
        OpenAIError::JSONDeserialize(e, _) => LlmError::InvalidResponse(e.to_string()),
        other => LlmError::Request(other.to_string()),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, LlmError> {
        let request = self.build_request(messages, options).map_err(map_error)?;
        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = options.tools.len(),
            "chat completion request"
        );

        let response = self.client.chat().create(request).await.map_err(map_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|c| from_response_message(c.message))
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            Some("http://localhost:9/v1/"),
            "gpt-test",
            Some("sk-test"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn offers_spec() -> ToolSpec {
        ToolSpec {
            name: "offers_query_tool".into(),
            description: "offers".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_request_with_json_format() {
        let req = client()
            .build_request(&[Message::user("hi")], &CompletionOptions::json_object())
            .unwrap();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        assert!(value.get("tools").is_none());
        assert_eq!(value["model"], "gpt-test");
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_request_with_bound_tools() {
        let req = client()
            .build_request(&[Message::user("hi")], &CompletionOptions::with_tools(vec![offers_spec()]))
            .unwrap();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "offers_query_tool");
        assert_eq!(value["tools"][0]["function"]["parameters"]["type"], "object");
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_assistant_tool_call_omits_empty_content() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCallRequest::new("call_1", "offers_query_tool", json!({}))],
        );
        let wire = serde_json::to_value(to_request_message(&msg).unwrap()).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert!(wire.get("content").is_none());
        assert_eq!(
            wire["tool_calls"],
            json!([{
                "type": "function",
                "id": "call_1",
                "function": {"name": "offers_query_tool", "arguments": "{}"}
            }])
        );
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let wire = serde_json::to_value(to_request_message(&Message::tool("call_9", "ok")).unwrap()).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_9");
        assert_eq!(wire["content"], "ok");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_a",
                "type": "function",
                "function": {"name": "retrieve_learning_knowledge_base", "arguments": "{\"query\":\"react\"}"}
            }]
        });
        let response: ChatCompletionResponseMessage = serde_json::from_value(body).unwrap();
        let msg = from_response_message(response);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "");
        assert_eq!(msg.tool_calls[0].id, "call_a");
        assert_eq!(msg.tool_calls[0].arguments, json!({"query": "react"}));
    }

    #[test]
    fn test_unparseable_arguments_kept_as_string() {
        assert_eq!(parse_arguments("not json".into()), json!("not json"));
        assert_eq!(parse_arguments("  ".into()), json!({}));
    }

    #[test]
    fn test_token_usage_accumulates() {
        let usage = TokenUsage::new();
        usage.add(10, 5);
        usage.add(1, 1);
        assert_eq!(usage.get(), (11, 6, 17));
    }
}
