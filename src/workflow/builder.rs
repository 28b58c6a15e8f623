//! 工作流构建器
//!
//! 提供流畅的API来声明节点与边；build 时校验图的完整性

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::workflow::engine::CompiledWorkflow;
use crate::workflow::types::*;

/// 默认最大执行步数
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// 工作流构建器
pub struct WorkflowBuilder<S: WorkflowState> {
    name: String,
    nodes: Vec<(NodeId, Arc<dyn Node<S>>)>,
    edges: Vec<(NodeId, Edge<S>)>,
    recursion_limit: usize,
}

impl<S: WorkflowState> WorkflowBuilder<S> {
    /// 创建新的工作流构建器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// 添加节点
    pub fn add_node(mut self, id: impl Into<NodeId>, node: impl Node<S> + 'static) -> Self {
        self.nodes.push((id.into(), Arc::new(node)));
        self
    }

    /// 添加无条件边
    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// 添加条件边：mapping 必须覆盖 decide 可能返回的全部标签
    pub fn add_conditional_edges<F, I, L, T>(
        mut self,
        from: impl Into<NodeId>,
        decide: F,
        mapping: I,
    ) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<NodeId>,
    {
        let mapping = mapping
            .into_iter()
            .map(|(label, to)| (label.into(), to.into()))
            .collect();
        self.edges.push((
            from.into(),
            Edge::Conditional {
                decide: Arc::new(decide),
                mapping,
            },
        ));
        self
    }

    /// 设置单次运行允许执行的最大节点数
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// 构建工作流
    pub fn build(self) -> Result<CompiledWorkflow<S>, WorkflowError> {
        let invalid = |msg: String| Err(WorkflowError::InvalidConfiguration(msg));

        if self.recursion_limit == 0 {
            return invalid("recursion_limit must be positive".to_string());
        }

        let mut nodes: HashMap<NodeId, Arc<dyn Node<S>>> = HashMap::new();
        for (id, node) in self.nodes {
            if id == START || id == END {
                return invalid(format!("'{id}' is a reserved node name"));
            }
            if nodes.insert(id.clone(), node).is_some() {
                return invalid(format!("duplicate node '{id}'"));
            }
        }

        let target_exists = |to: &NodeId| to == END || nodes.contains_key(to);

        let mut edges: HashMap<NodeId, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if from != START && !nodes.contains_key(&from) {
                return invalid(format!("edge from unknown node '{from}'"));
            }
            match &edge {
                Edge::Direct(to) => {
                    if !target_exists(to) {
                        return invalid(format!("edge '{from}' -> unknown node '{to}'"));
                    }
                }
                Edge::Conditional { mapping, .. } => {
                    if mapping.is_empty() {
                        return invalid(format!("conditional edge from '{from}' has no mapping"));
                    }
                    if let Some(to) = mapping.values().find(|to| !target_exists(to)) {
                        return invalid(format!("edge '{from}' maps to unknown node '{to}'"));
                    }
                }
            }
            if edges.insert(from.clone(), edge).is_some() {
                return invalid(format!("node '{from}' has more than one outgoing edge"));
            }
        }

        if !edges.contains_key(START) {
            return invalid("no entry edge from START".to_string());
        }

        let reachable_from: HashSet<&NodeId> = edges.keys().collect();
        let mut missing: Vec<&NodeId> = nodes
            .keys()
            .filter(|id| !reachable_from.contains(id))
            .collect();
        missing.sort();
        if let Some(id) = missing.first() {
            return invalid(format!("node '{id}' has no outgoing edge"));
        }

        Ok(CompiledWorkflow::new(
            self.name,
            nodes,
            edges,
            self.recursion_limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentError;

    #[derive(Clone, Default)]
    struct Counter(usize);

    impl WorkflowState for Counter {
        type Update = usize;
        fn merge(&mut self, update: usize) {
            self.0 += update;
        }
    }

    fn inc() -> FnNode<fn(&Counter) -> Result<usize, AgentError>> {
        FnNode(|_| Ok(1))
    }

    fn expect_invalid(result: Result<CompiledWorkflow<Counter>, WorkflowError>, needle: &str) {
        match result {
            Err(WorkflowError::InvalidConfiguration(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {msg}")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected invalid configuration"),
        }
    }

    #[test]
    fn test_build_linear_workflow() {
        let workflow = WorkflowBuilder::new("linear")
            .add_node("a", inc())
            .add_node("b", inc())
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .build()
            .expect("Failed to build workflow");

        assert_eq!(workflow.name(), "linear");
        assert_eq!(workflow.node_count(), 2);
    }

    #[test]
    fn test_build_without_entry_fails() {
        let result = WorkflowBuilder::new("no entry")
            .add_node("a", inc())
            .add_edge("a", END)
            .build();
        expect_invalid(result, "START");
    }

    #[test]
    fn test_unknown_target_fails() {
        let result = WorkflowBuilder::new("dangling")
            .add_node("a", inc())
            .add_edge(START, "a")
            .add_edge("a", "b")
            .build();
        expect_invalid(result, "unknown node 'b'");
    }

    #[test]
    fn test_unknown_mapping_target_fails() {
        let result = WorkflowBuilder::new("dangling map")
            .add_node("a", inc())
            .add_edge(START, "a")
            .add_conditional_edges("a", |_: &Counter| "x", [("x", "nowhere")])
            .build();
        expect_invalid(result, "nowhere");
    }

    #[test]
    fn test_node_without_outgoing_edge_fails() {
        let result = WorkflowBuilder::new("dead end")
            .add_node("a", inc())
            .add_node("b", inc())
            .add_edge(START, "a")
            .add_edge("a", END)
            .build();
        expect_invalid(result, "'b' has no outgoing edge");
    }

    #[test]
    fn test_duplicate_outgoing_edge_fails() {
        let result = WorkflowBuilder::new("fork")
            .add_node("a", inc())
            .add_edge(START, "a")
            .add_edge("a", END)
            .add_conditional_edges("a", |_: &Counter| "end", [("end", END)])
            .build();
        expect_invalid(result, "more than one outgoing edge");
    }

    #[test]
    fn test_reserved_node_name_fails() {
        let result = WorkflowBuilder::new("reserved")
            .add_node(END, inc())
            .add_edge(START, END)
            .build();
        expect_invalid(result, "reserved");
    }
}
