//! 记忆层：对话消息模型与短期对话记忆

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role, ToolCallRequest};
