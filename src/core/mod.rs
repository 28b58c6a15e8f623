//! 核心编排层：错误、会话状态与运行时装配

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{
    create_llm_from_config, create_tool_registry, ingest_document, open_knowledge_base, SupportRuntime,
};
pub use state::{ConversationState, Representative, StateUpdate};
