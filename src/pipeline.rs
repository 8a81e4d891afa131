use crate::node::Node;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque handle to a node in a [`Pipeline`] graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    /// The underlying sequence number, mostly useful in logs.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Deferred computation graph. Transforms on a [`PCollection`](crate::PCollection)
/// only add nodes; nothing runs until a collect call hands the graph to a
/// [`Runner`](crate::Runner).
///
/// A pipeline is cheap to clone; clones share the same graph.
#[derive(Clone, Default)]
pub struct Pipeline {
    inner: Arc<Mutex<PipelineInner>>,
}

#[derive(Default)]
struct PipelineInner {
    next_id: u64,
    nodes: HashMap<NodeId, Node>,
    edges: Vec<(NodeId, NodeId)>,
}

impl Pipeline {
    // A panic while holding the lock cannot leave the graph half-written:
    // every mutation below is a single insert or push.
    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.lock();
        let id = NodeId(g.next_id);
        g.next_id += 1;
        g.nodes.insert(id, node);
        id
    }

    pub(crate) fn connect(&self, from: NodeId, to: NodeId) {
        self.lock().edges.push((from, to));
    }

    /// Copy of the current nodes and edges. The runner plans from this copy so
    /// execution never holds the graph lock.
    pub(crate) fn snapshot_graph(&self) -> (HashMap<NodeId, Node>, Vec<(NodeId, NodeId)>) {
        let g = self.lock();
        (g.nodes.clone(), g.edges.clone())
    }

    /// Node count and edge list, for inspecting what a chain of transforms built.
    pub fn snapshot(&self) -> (usize, Vec<(NodeId, NodeId)>) {
        let g = self.lock();
        (g.nodes.len(), g.edges.clone())
    }
}
