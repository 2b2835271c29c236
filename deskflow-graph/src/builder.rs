//! Graph construction and validation.

use crate::checkpoint::Checkpointer;
use crate::edge::{Edge, EdgeTarget, RouterFn, START};
use crate::error::{GraphError, Result};
use crate::node::{FnNode, Node, NodeContext, StepUpdate};
use crate::state::{State, StateSchema};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Builder for a [`Graph`].
pub struct GraphBuilder {
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new(schema: StateSchema) -> Self {
        Self { schema, nodes: HashMap::new(), edges: Vec::new() }
    }

    /// All-overwrite schema from bare channel names.
    pub fn with_channels(channels: &[&str]) -> Self {
        Self::new(StateSchema::values(channels))
    }

    pub fn node<N: Node + 'static>(mut self, node: N) -> Self {
        self.nodes.insert(node.name().to_string(), Arc::new(node));
        self
    }

    pub fn node_arc(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(node.name().to_string(), node);
        self
    }

    pub fn node_fn<F, Fut>(self, name: &str, func: F) -> Self
    where
        F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepUpdate>> + Send + 'static,
    {
        self.node(FnNode::new(name, func))
    }

    /// Direct edge. `START` as source sets the entry node; only one entry is
    /// kept (last wins).
    pub fn edge(mut self, source: &str, target: &str) -> Self {
        if source == START {
            self.edges.retain(|e| !matches!(e, Edge::Entry { .. }));
            self.edges.push(Edge::Entry { target: target.to_string() });
        } else {
            self.edges.push(Edge::Direct {
                source: source.to_string(),
                target: EdgeTarget::from(target),
            });
        }
        self
    }

    /// Conditional edge: `router` maps state to a label; `targets` maps
    /// labels to nodes (or `END`).
    pub fn conditional<F, I>(mut self, source: &str, router: F, targets: I) -> Self
    where
        F: Fn(&State) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let targets: HashMap<String, EdgeTarget> =
            targets.into_iter().map(|(label, t)| (label.to_string(), EdgeTarget::from(t))).collect();

        self.edges.push(Edge::Conditional {
            source: source.to_string(),
            router: Arc::new(router) as RouterFn,
            targets,
        });
        self
    }

    pub fn build(self) -> Result<Graph> {
        self.validate()?;
        Ok(Graph {
            schema: self.schema,
            nodes: self.nodes,
            edges: self.edges,
            checkpointer: None,
            default_step_limit: 25,
        })
    }

    fn validate(&self) -> Result<()> {
        let entry = self.edges.iter().find_map(|e| match e {
            Edge::Entry { target } => Some(target),
            _ => None,
        });
        let Some(entry) = entry else {
            return Err(GraphError::NoEntryPoint);
        };
        if !self.nodes.contains_key(entry) {
            return Err(GraphError::EdgeTargetNotFound(entry.clone()));
        }

        for edge in &self.edges {
            match edge {
                Edge::Direct { source, target } => {
                    if !self.nodes.contains_key(source) {
                        return Err(GraphError::NodeNotFound(source.clone()));
                    }
                    if let EdgeTarget::Node(name) = target {
                        if !self.nodes.contains_key(name) {
                            return Err(GraphError::EdgeTargetNotFound(name.clone()));
                        }
                    }
                }
                Edge::Conditional { source, targets, .. } => {
                    if !self.nodes.contains_key(source) {
                        return Err(GraphError::NodeNotFound(source.clone()));
                    }
                    for target in targets.values() {
                        if let EdgeTarget::Node(name) = target {
                            if !self.nodes.contains_key(name) {
                                return Err(GraphError::EdgeTargetNotFound(name.clone()));
                            }
                        }
                    }
                }
                Edge::Entry { .. } => {}
            }
        }
        Ok(())
    }
}

/// A validated graph, ready to run.
pub struct Graph {
    pub(crate) schema: StateSchema,
    pub(crate) nodes: HashMap<String, Arc<dyn Node>>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer>>,
    pub(crate) default_step_limit: usize,
}

impl Graph {
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.default_step_limit = limit;
        self
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref()
    }

    pub(crate) fn entry_nodes(&self) -> Vec<String> {
        self.edges
            .iter()
            .find_map(|e| match e {
                Edge::Entry { target } => Some(vec![target.clone()]),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Nodes to run after `executed`, given the current state. Routes whose
    /// label is absent from the target map, and `END` targets, terminate
    /// that path.
    pub(crate) fn next_nodes(&self, executed: &[String], state: &State) -> Vec<String> {
        let mut next: Vec<String> = Vec::new();

        for edge in &self.edges {
            match edge {
                Edge::Direct { source, target: EdgeTarget::Node(name) }
                    if executed.contains(source) =>
                {
                    if !next.contains(name) {
                        next.push(name.clone());
                    }
                }
                Edge::Conditional { source, router, targets } if executed.contains(source) => {
                    let label = router(state);
                    if let Some(EdgeTarget::Node(name)) = targets.get(&label) {
                        if !next.contains(name) {
                            next.push(name.clone());
                        }
                    }
                }
                _ => {}
            }
        }

        next
    }
}
