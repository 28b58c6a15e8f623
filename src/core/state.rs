//! 会话状态：消息历史 + 本轮路由决定
//!
//! 节点只返回 StateUpdate，由引擎合并：数组字段追加，标量字段替换；messages 在一轮内只增不减。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::memory::Message;
use crate::workflow::WorkflowState;

/// 前台分类出的下一位接待者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Representative {
    Marketing,
    Learning,
    /// 前台直接回答，不转交
    Respond,
}

impl Representative {
    /// 将分类器给出的原始值映射为决定：按固定优先级做子串匹配，
    /// 同时包含 MARKETING 与 LEARNING 时归 Marketing
    pub fn from_decision(raw: &str) -> Self {
        if raw.contains("MARKETING") {
            Representative::Marketing
        } else if raw.contains("LEARNING") {
            Representative::Learning
        } else {
            Representative::Respond
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Representative::Marketing => "MARKETING",
            Representative::Learning => "LEARNING",
            Representative::Respond => "RESPOND",
        }
    }
}

impl fmt::Display for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一轮对话的状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// 仅由前台写入、仅由路由读取；每轮新建状态时为 None
    pub next_representative: Option<Representative>,
    /// 本轮已执行的工具轮数
    pub tool_rounds: usize,
}

impl ConversationState {
    /// 以历史消息 + 新的用户消息开始一轮
    pub fn new_turn(history: impl IntoIterator<Item = Message>, user_input: impl Into<String>) -> Self {
        let mut messages: Vec<Message> = history.into_iter().collect();
        messages.push(Message::user(user_input));
        Self {
            messages,
            next_representative: None,
            tool_rounds: 0,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// 节点输出的部分状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// 追加到 messages
    pub messages: Vec<Message>,
    pub next_representative: Option<Representative>,
    pub tool_rounds: Option<usize>,
}

impl StateUpdate {
    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn message(message: Message) -> Self {
        Self::messages(vec![message])
    }
}

impl WorkflowState for ConversationState {
    type Update = StateUpdate;

    fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(rep) = update.next_representative {
            self.next_representative = Some(rep);
        }
        if let Some(rounds) = update.tool_rounds {
            self.tool_rounds = rounds;
        }
    }
}
