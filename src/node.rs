//! Graph nodes and the type-erased partition plumbing the runner moves between them.
//!
//! A [`Node`] is one step of a pipeline. Element types are erased at this level:
//! every stage consumes and produces a [`Partition`] (a boxed `Vec<T>` or an
//! accumulator) and downcasts it back with [`downcast_partition`]. Source nodes
//! carry a [`VecOps`] so the runner can size and split them without knowing `T`.

use crate::runner::Reduction;
use anyhow::{Result, anyhow};
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A partition buffer carried between nodes at runtime.
pub type Partition = Box<dyn Any + Send + Sync>;

/// Per-partition transform used by barrier nodes.
pub type PartitionFn = Arc<dyn Fn(Partition) -> Result<Partition> + Send + Sync>;

/// Folds the outputs of several partitions into one.
pub type MergeFn = Arc<dyn Fn(Vec<Partition>) -> Result<Partition> + Send + Sync>;

/// Downcast a partition to the concrete payload a stage expects.
///
/// # Errors
/// Fails with the stage name and the expected type if the payload differs.
pub fn downcast_partition<T: 'static>(p: Partition, stage: &str) -> Result<T> {
    p.downcast::<T>()
        .map(|b| *b)
        .map_err(|_| anyhow!("{stage}: expected partition of type {}", type_name::<T>()))
}

/// Type-erased helpers over the `Vec<T>` held by a source node.
pub trait VecOps: Send + Sync {
    /// Number of elements, or `None` if `data` is not the expected `Vec<T>`.
    fn len(&self, data: &dyn Any) -> Option<usize>;

    /// Split into at most `n` contiguous, order-preserving partitions.
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>>;

    /// Clone the whole vector as a single partition.
    fn clone_any(&self, data: &dyn Any) -> Option<Partition>;
}

struct VecOpsImpl<T>(PhantomData<T>);

impl<T: Clone + Send + Sync + 'static> VecOps for VecOpsImpl<T> {
    fn len(&self, data: &dyn Any) -> Option<usize> {
        data.downcast_ref::<Vec<T>>().map(Vec::len)
    }

    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>> {
        let v = data.downcast_ref::<Vec<T>>()?;
        if n <= 1 || v.len() <= 1 {
            return Some(vec![Box::new(v.clone())]);
        }
        let chunk = v.len().div_ceil(n);
        Some(
            v.chunks(chunk)
                .map(|c| Box::new(c.to_vec()) as Partition)
                .collect(),
        )
    }

    fn clone_any(&self, data: &dyn Any) -> Option<Partition> {
        data.downcast_ref::<Vec<T>>()
            .map(|v| Box::new(v.clone()) as Partition)
    }
}

/// Build the [`VecOps`] for `Vec<T>`.
pub fn vec_ops_for<T: Clone + Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<T>(PhantomData))
}

/// An element-wise operation. Consecutive ones are fused into a single stage.
pub trait DynOp: Send + Sync {
    /// Apply the operation to a whole partition.
    ///
    /// # Errors
    /// Fails if the partition does not carry the expected element type.
    fn apply(&self, input: Partition) -> Result<Partition>;

    /// Short label used in logs and plan descriptions.
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub enum Node {
    /// In-memory `Vec<T>` with the helpers needed to partition it.
    Source {
        payload: Arc<dyn Any + Send + Sync>,
        vec_ops: Arc<dyn VecOps>,
        elem_type: &'static str,
    },

    /// Element-wise ops, applied independently to every partition.
    Stateless(Vec<Arc<dyn DynOp>>),

    /// Keyed combine barrier.
    /// - `local`: `Vec<(K, V)>` → `HashMap<K, A>`
    /// - `merge`: `Vec<HashMap<K, A>>` → `Vec<(K, O)>`
    CombineValues { local: PartitionFn, merge: MergeFn },

    /// Global combine barrier folding every element into one output.
    /// - `coalesce`: `Vec<Vec<T>>` → `Vec<T>`, used to pin the fold to one instance
    /// - `local`: `Vec<T>` → `A`
    /// - `merge`: `Vec<A>` → `A`
    /// - `finish`: `A` → `Vec<O>` (singleton)
    CombineGlobal {
        coalesce: MergeFn,
        local: PartitionFn,
        merge: MergeFn,
        finish: PartitionFn,
        reduction: Reduction,
    },
}

impl Node {
    /// Barrier nodes need every partition of their input before producing output.
    pub fn is_barrier(&self) -> bool {
        matches!(self, Node::CombineValues { .. } | Node::CombineGlobal { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Node::Source { elem_type, .. } => format!("Source<{elem_type}>"),
            Node::Stateless(ops) => {
                let names: Vec<&str> = ops.iter().map(|op| op.name()).collect();
                format!("Stateless[{}]", names.join(" -> "))
            }
            Node::CombineValues { .. } => "CombineValues".to_string(),
            Node::CombineGlobal { reduction, .. } => format!("CombineGlobal({reduction:?})"),
        }
    }
}
