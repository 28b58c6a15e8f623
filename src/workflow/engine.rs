//! 工作流引擎
//!
//! 从 START 出发，严格顺序地执行节点：运行节点 -> 合并部分输出 -> 解析下一跳（无条件边优先，
//! 否则调用决策函数并查映射）-> 到达 END 停止。每执行一个节点产出一个状态快照。

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, info};

use crate::core::AgentError;
use crate::workflow::types::*;

/// 单步执行后的状态快照
#[derive(Debug, Clone)]
pub struct StepSnapshot<S> {
    /// 从 1 开始的步序号
    pub step: usize,
    /// 刚执行完的节点
    pub node: NodeId,
    /// 合并该节点输出后的状态
    pub state: S,
    /// 完成时间（毫秒时间戳）
    pub completed_at: i64,
}

/// 快照流：每个节点执行产出一项；出错时产出 Err 后结束
pub type StepStream<'a, S> = Pin<Box<dyn Stream<Item = Result<StepSnapshot<S>, AgentError>> + Send + 'a>>;

/// 待执行的下一步
struct Cursor<S> {
    node: NodeId,
    state: S,
    step: usize,
}

/// 编译完成的工作流；不可变，可在多个会话间共享并发运行
pub struct CompiledWorkflow<S: WorkflowState> {
    name: String,
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: HashMap<NodeId, Edge<S>>,
    recursion_limit: usize,
}

impl<S: WorkflowState> CompiledWorkflow<S> {
    pub(crate) fn new(
        name: String,
        nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
        edges: HashMap<NodeId, Edge<S>>,
        recursion_limit: usize,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            recursion_limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 解析 from 的下一跳
    fn resolve(&self, from: &str, state: &S) -> Result<NodeId, WorkflowError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| WorkflowError::NodeNotFound(from.to_string()))?;
        match edge {
            Edge::Direct(to) => Ok(to.clone()),
            Edge::Conditional { decide, mapping } => {
                let label = decide(state);
                debug!(workflow = %self.name, from, label, "conditional edge");
                mapping
                    .get(label)
                    .cloned()
                    .ok_or_else(|| WorkflowError::UnmappedLabel {
                        node: from.to_string(),
                        label: label.to_string(),
                    })
            }
        }
    }

    /// 执行 cursor 指向的节点，返回快照与下一步（到达 END 时为 None）
    async fn advance(&self, cursor: Cursor<S>) -> Result<(StepSnapshot<S>, Option<Cursor<S>>), AgentError> {
        if cursor.step >= self.recursion_limit {
            return Err(WorkflowError::RecursionLimit(self.recursion_limit).into());
        }
        let node = self
            .nodes
            .get(&cursor.node)
            .ok_or_else(|| WorkflowError::NodeNotFound(cursor.node.clone()))?;

        debug!(workflow = %self.name, node = %cursor.node, step = cursor.step + 1, "running node");
        let update = node.run(&cursor.state).await?;

        let mut state = cursor.state;
        state.merge(update);
        let next = self.resolve(&cursor.node, &state)?;
        let step = cursor.step + 1;

        let snapshot = StepSnapshot {
            step,
            node: cursor.node,
            state: state.clone(),
            completed_at: chrono::Utc::now().timestamp_millis(),
        };
        if next == END {
            info!(workflow = %self.name, steps = step, "workflow reached END");
            return Ok((snapshot, None));
        }
        Ok((
            snapshot,
            Some(Cursor {
                node: next,
                state,
                step,
            }),
        ))
    }

    /// 逐步执行，产出每个节点执行后的状态快照
    pub fn stream(&self, initial: S) -> StepStream<'_, S> {
        let seed = match self.resolve(START, &initial) {
            Ok(node) if node == END => None,
            Ok(node) => Some(Ok(Cursor {
                node,
                state: initial,
                step: 0,
            })),
            Err(e) => Some(Err(AgentError::from(e))),
        };

        Box::pin(stream::unfold(seed, move |seed| async move {
            match seed? {
                Err(e) => Some((Err(e), None)),
                Ok(cursor) => match self.advance(cursor).await {
                    Ok((snapshot, next)) => Some((Ok(snapshot), next.map(Ok))),
                    Err(e) => Some((Err(e), None)),
                },
            }
        }))
    }

    /// 运行到 END，返回最终状态
    pub async fn invoke(&self, initial: S) -> Result<S, AgentError> {
        let mut last = initial.clone();
        let mut steps = self.stream(initial);
        while let Some(snapshot) = steps.next().await {
            last = snapshot?.state;
        }
        Ok(last)
    }
}
