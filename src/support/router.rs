//! 路由：纯函数，从状态得到下一跳标签

use crate::core::{ConversationState, Representative};
use crate::support::{LEARNING, MARKETING, MARKETING_TOOLS};
use crate::workflow::END;

/// 前台之后的下一跳；未设置决定时视为 Respond
pub fn who_is_next(state: &ConversationState) -> &'static str {
    match state.next_representative.unwrap_or(Representative::Respond) {
        Representative::Marketing => MARKETING,
        Representative::Learning => LEARNING,
        Representative::Respond => END,
    }
}

/// 市场专员之后：最后一条消息带 tool_calls 则执行工具，否则结束
pub fn is_marketing_tool_next(state: &ConversationState) -> &'static str {
    match state.last_message() {
        Some(message) if message.has_tool_calls() => MARKETING_TOOLS,
        _ => END,
    }
}
