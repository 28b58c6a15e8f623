//! 工作流类型定义
//!
//! 定义状态合并 trait、节点 trait、边与错误类型

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AgentError;

pub type NodeId = String;

/// 入口哨兵：从 START 出发的边指向第一个节点
pub const START: &str = "__start__";
/// 终止哨兵
pub const END: &str = "__end__";

/// 可被引擎驱动的状态：节点返回部分更新，由 merge 合并
pub trait WorkflowState: Clone + Send + Sync + 'static {
    type Update: Send + 'static;

    fn merge(&mut self, update: Self::Update);
}

/// 工作流节点：读取当前状态，返回部分更新
#[async_trait]
pub trait Node<S: WorkflowState>: Send + Sync {
    async fn run(&self, state: &S) -> Result<S::Update, AgentError>;
}

/// 同步闭包节点
pub struct FnNode<F>(pub F);

#[async_trait]
impl<S, F> Node<S> for FnNode<F>
where
    S: WorkflowState,
    F: Fn(&S) -> Result<S::Update, AgentError> + Send + Sync,
{
    async fn run(&self, state: &S) -> Result<S::Update, AgentError> {
        (self.0)(state)
    }
}

/// 条件边的决策函数：根据状态返回标签
pub type DecisionFn<S> = Arc<dyn Fn(&S) -> &'static str + Send + Sync>;

/// 节点的出边
pub enum Edge<S> {
    /// 无条件边
    Direct(NodeId),
    /// 条件边：决策函数给出标签，再按映射找下一个节点
    Conditional {
        decide: DecisionFn<S>,
        mapping: HashMap<String, NodeId>,
    },
}

/// 工作流错误类型
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Invalid workflow configuration: {0}")]
    InvalidConfiguration(String),
    /// 决策函数返回了映射中没有的标签
    #[error("Router configuration error: label '{label}' from node '{node}' is not mapped")]
    UnmappedLabel { node: NodeId, label: String },
    #[error("Recursion limit of {0} steps reached")]
    RecursionLimit(usize),
}
