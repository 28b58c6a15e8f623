//! Concierge - 客服对话路由编排
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话状态、运行时装配
//! - **knowledge**: 知识库（分块、向量化、检索）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与嵌入
//! - **memory**: 消息模型与跨轮短期记忆
//! - **observability**: 日志初始化
//! - **support**: 客服工作流（前台分类、路由、市场专员与工具循环、学习专员）
//! - **tools**: 工具注册表、执行器与内置工具
//! - **workflow**: 通用图执行引擎

pub mod config;
pub mod core;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod support;
pub mod tools;
pub mod workflow;
