//! [`PCollection`], the typed handle users build pipelines with, and the
//! [`CombineFn`] contract that barrier stages fold through.

use crate::node::{DynOp, MergeFn, Node, Partition, PartitionFn, downcast_partition, vec_ops_for};
use crate::pipeline::{NodeId, Pipeline};
use crate::runner::{ExecMode, Reduction, Runner};
use anyhow::Result;
use std::any::type_name;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Bound every element type flowing through a pipeline must satisfy.
pub trait ElemBound: 'static + Send + Sync + Clone {}
impl<T> ElemBound for T where T: 'static + Send + Sync + Clone {}

/// A lazily evaluated collection of `T` attached to a [`Pipeline`].
#[derive(Clone)]
pub struct PCollection<T> {
    pipeline: Pipeline,
    id: NodeId,
    _t: PhantomData<T>,
}

/// Attach an in-memory vector as a source.
pub fn from_vec<T: ElemBound>(p: &Pipeline, data: Vec<T>) -> PCollection<T> {
    let id = p.insert_node(Node::Source {
        payload: Arc::new(data),
        vec_ops: vec_ops_for::<T>(),
        elem_type: type_name::<T>(),
    });
    PCollection {
        pipeline: p.clone(),
        id,
        _t: PhantomData,
    }
}

/// Aggregation contract for barrier stages.
///
/// The runner calls `create` once per reduction instance, `add_input` once per
/// element routed to it, `merge` when partition-local accumulators are folded
/// together and `finish` exactly once at the end. An accumulator is never
/// reused across runs.
pub trait CombineFn<V, A, O>: Send + Sync + 'static {
    fn create(&self) -> A;

    /// # Errors
    /// Implementations reject inputs that would corrupt the accumulator.
    fn add_input(&self, acc: &mut A, v: V) -> Result<()>;

    /// # Errors
    /// Implementations fail if either side is no longer usable.
    fn merge(&self, acc: &mut A, other: A) -> Result<()>;

    /// # Errors
    /// Implementations fail if the accumulator was already finished.
    fn finish(&self, acc: A) -> Result<O>;
}

struct MapOp<I, O, F>(F, PhantomData<fn(I) -> O>);

impl<I, O, F> DynOp for MapOp<I, O, F>
where
    I: ElemBound,
    O: ElemBound,
    F: Fn(&I) -> O + Send + Sync + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v: Vec<I> = downcast_partition(input, "map")?;
        Ok(Box::new(v.iter().map(|i| self.0(i)).collect::<Vec<O>>()))
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

impl<T: ElemBound> PCollection<T> {
    fn then<O>(self, node: Node) -> PCollection<O> {
        let id = self.pipeline.insert_node(node);
        self.pipeline.connect(self.id, id);
        PCollection {
            pipeline: self.pipeline,
            id,
            _t: PhantomData,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn map<O, F>(self, f: F) -> PCollection<O>
    where
        O: ElemBound,
        F: Fn(&T) -> O + Send + Sync + 'static,
    {
        let op: Arc<dyn DynOp> = Arc::new(MapOp::<T, O, F>(f, PhantomData));
        self.then(Node::Stateless(vec![op]))
    }

    /// Fold every element into a single output with `comb`.
    ///
    /// The collection produced has exactly one element, even for empty input
    /// (`finish(create())`). `reduction` decides whether the fold is pinned to a
    /// single accumulator or runs one accumulator per partition followed by a
    /// merge; see [`Reduction`].
    pub fn combine_globally<C, A, O>(self, comb: C, reduction: Reduction) -> PCollection<O>
    where
        C: CombineFn<T, A, O>,
        A: Send + Sync + 'static,
        O: ElemBound,
    {
        let comb = Arc::new(comb);

        let coalesce: MergeFn = Arc::new(|parts: Vec<Partition>| -> Result<Partition> {
            let mut all: Vec<T> = Vec::new();
            for p in parts {
                all.extend(downcast_partition::<Vec<T>>(p, "combine_globally coalesce")?);
            }
            Ok(Box::new(all))
        });

        let local: PartitionFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |p: Partition| -> Result<Partition> {
                let rows: Vec<T> = downcast_partition(p, "combine_globally local")?;
                let mut acc = comb.create();
                for v in rows {
                    comb.add_input(&mut acc, v)?;
                }
                Ok(Box::new(acc))
            })
        };

        let merge: MergeFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |parts: Vec<Partition>| -> Result<Partition> {
                let mut it = parts.into_iter();
                let mut acc = match it.next() {
                    Some(first) => downcast_partition::<A>(first, "combine_globally merge")?,
                    None => comb.create(),
                };
                for p in it {
                    comb.merge(&mut acc, downcast_partition::<A>(p, "combine_globally merge")?)?;
                }
                Ok(Box::new(acc))
            })
        };

        let finish: PartitionFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |p: Partition| -> Result<Partition> {
                let acc: A = downcast_partition(p, "combine_globally finish")?;
                Ok(Box::new(vec![comb.finish(acc)?]))
            })
        };

        self.then(Node::CombineGlobal {
            coalesce,
            local,
            merge,
            finish,
            reduction,
        })
    }

    /// Execute with an explicit runner.
    ///
    /// # Errors
    /// Propagates the first failing stage.
    pub fn collect_with(self, runner: &Runner) -> Result<Vec<T>> {
        runner.run_collect::<T>(&self.pipeline, self.id)
    }

    /// Execute on the calling thread with a single partition.
    ///
    /// # Errors
    /// Propagates the first failing stage.
    pub fn collect_seq(self) -> Result<Vec<T>> {
        self.collect_with(&Runner::new(ExecMode::Sequential))
    }
}

impl<K, V> PCollection<(K, V)>
where
    K: ElemBound + Eq + Hash,
    V: ElemBound,
{
    /// Combine all values sharing a key. Every key ends up in exactly one
    /// accumulator, whichever partitions its values started in.
    pub fn combine_values<C, A, O>(self, comb: C) -> PCollection<(K, O)>
    where
        C: CombineFn<V, A, O>,
        A: Send + Sync + 'static,
        O: ElemBound,
    {
        let comb = Arc::new(comb);

        let local: PartitionFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |p: Partition| -> Result<Partition> {
                let kv: Vec<(K, V)> = downcast_partition(p, "combine_values local")?;
                let mut map: HashMap<K, A> = HashMap::new();
                for (k, v) in kv {
                    comb.add_input(map.entry(k).or_insert_with(|| comb.create()), v)?;
                }
                Ok(Box::new(map))
            })
        };

        let merge: MergeFn = {
            let comb = Arc::clone(&comb);
            Arc::new(move |parts: Vec<Partition>| -> Result<Partition> {
                let mut accs: HashMap<K, A> = HashMap::new();
                for p in parts {
                    let m: HashMap<K, A> = downcast_partition(p, "combine_values merge")?;
                    for (k, a) in m {
                        match accs.get_mut(&k) {
                            Some(acc) => comb.merge(acc, a)?,
                            None => {
                                accs.insert(k, a);
                            }
                        }
                    }
                }
                let out = accs
                    .into_iter()
                    .map(|(k, a)| -> Result<(K, O)> { Ok((k, comb.finish(a)?)) })
                    .collect::<Result<Vec<(K, O)>>>()?;
                Ok(Box::new(out))
            })
        };

        self.then(Node::CombineValues { local, merge })
    }
}
