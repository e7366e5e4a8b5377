//! Host emulation of the two fused kernels.
//!
//! Blocks run in parallel on the rayon pool; threads inside a block run one
//! after another, phase by phase, so a `__syncthreads()` becomes the boundary
//! between two loops. Work is assigned to blocks with exactly the index
//! arithmetic of the CUDA source, and each block receives mutable views of the
//! output rows it owns. Vertex ownership is disjoint across blocks, which is
//! what lets the views be split up front without locks.

use graft_core::reference::leaky_relu_exp;
use graft_core::{CsrGraph, FusedGatPlan, LaunchGeometry};
use rayon::prelude::*;

/// Proof that every `exp`/`sum` cell of the score stage has been written.
///
/// Only `score_stage` creates one, and `aggregate_stage` consumes it, so the
/// second stage cannot start before the first has joined.
#[derive(Debug)]
pub(crate) struct ScoreStageComplete(());

/// Output cells of one destination vertex in the score stage.
struct ScoreRow<'a> {
    dst: usize,
    exp: &'a mut [f32],
    sum: &'a mut [f32],
}

/// Output cells of one destination vertex in the aggregate stage.
struct AggregateRow<'a> {
    dst: usize,
    ret: &'a mut [f32],
}

/// Shared-memory `er` cache of one block for one vertex epoch.
///
/// Slot `ty` holds the `er` row of the vertex block row `ty` owns during this
/// epoch. The cache is rebuilt at the start of every epoch and dropped at its
/// end; a lookup for any other vertex is a scheduling bug.
struct ErCache {
    heads: usize,
    owners: Vec<Option<usize>>,
    rows: Vec<f32>,
}

impl ErCache {
    fn acquire(er: &[f32], heads: usize, block_rows: usize, epoch: &[ScoreRow<'_>]) -> Self {
        let mut owners = vec![None; block_rows];
        let mut rows = vec![0.0f32; block_rows * heads];
        for row in epoch {
            let ty = row.dst % block_rows;
            owners[ty] = Some(row.dst);
            rows[ty * heads..(ty + 1) * heads]
                .copy_from_slice(&er[row.dst * heads..(row.dst + 1) * heads]);
        }
        Self {
            heads,
            owners,
            rows,
        }
    }

    fn row(&self, dst: usize) -> &[f32] {
        let ty = dst % self.owners.len();
        debug_assert_eq!(self.owners[ty], Some(dst), "stale er cache slot");
        &self.rows[ty * self.heads..(ty + 1) * self.heads]
    }
}

fn split_rows<'a>(buf: &'a mut [f32], lens: impl Iterator<Item = usize>) -> Vec<&'a mut [f32]> {
    let mut rest = buf;
    let mut out = Vec::new();
    for len in lens {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        out.push(head);
        rest = tail;
    }
    out
}

/// Heads visited by thread `tx` of x-block `bx_idx`.
fn head_indices(
    geometry: &LaunchGeometry,
    bx_idx: u32,
    tx: u32,
    heads: usize,
) -> impl Iterator<Item = usize> {
    let start = (bx_idx * geometry.block.x + tx) as usize;
    let stride = (geometry.block.x * geometry.grid.x) as usize;
    (start..heads).step_by(stride.max(1))
}

pub(crate) fn score_stage(
    plan: &FusedGatPlan,
    graph: &CsrGraph,
    el: &[f32],
    er: &[f32],
    exp: &mut [f32],
    sum: &mut [f32],
) -> ScoreStageComplete {
    let geometry = &plan.score;
    let heads = plan.shapes.e_xlen;
    let slope = plan.params.leaky_relu_slope;
    let n = plan.shapes.n;
    let block_rows = geometry.block.y as usize;
    let grid_rows = geometry.grid.y as usize;
    let vertex_stride = block_rows * grid_rows;

    let exp_rows = split_rows(exp, (0..n).map(|v| graph.in_degree(v) * heads));
    let sum_rows = split_rows(sum, (0..n).map(|_| heads));

    let mut blocks: Vec<Vec<ScoreRow<'_>>> = (0..grid_rows).map(|_| Vec::new()).collect();
    for (dst, (exp, sum)) in exp_rows.into_iter().zip(sum_rows).enumerate() {
        blocks[(dst / block_rows) % grid_rows].push(ScoreRow { dst, exp, sum });
    }

    blocks.into_par_iter().for_each(|mut rows| {
        for epoch in rows.chunk_by_mut(|a, b| a.dst / vertex_stride == b.dst / vertex_stride) {
            let cache = ErCache::acquire(er, heads, block_rows, epoch);
            // __syncthreads()
            for row in epoch.iter_mut() {
                let er_row = cache.row(row.dst);
                let sources = graph.sources(row.dst);
                for bx_idx in 0..geometry.grid.x {
                    for tx in 0..geometry.block.x {
                        for f in head_indices(geometry, bx_idx, tx, heads) {
                            let er_val = er_row[f];
                            let mut acc = 0.0f32;
                            for (local, &src) in sources.iter().enumerate() {
                                let t = leaky_relu_exp(el[src as usize * heads + f] + er_val, slope);
                                row.exp[local * heads + f] = t;
                                acc += t;
                            }
                            row.sum[f] = acc;
                        }
                    }
                }
            }
            // __syncthreads(): the cache goes out of scope before the next epoch.
            drop(cache);
        }
    });

    ScoreStageComplete(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn aggregate_stage(
    _score: ScoreStageComplete,
    plan: &FusedGatPlan,
    graph: &CsrGraph,
    feat_src: &[f32],
    exp: &[f32],
    sum: &[f32],
    ret: &mut [f32],
) {
    let geometry = &plan.aggregate;
    let heads = plan.shapes.e_xlen;
    let hidden = plan.shapes.feat_src_hidden;
    let feat_xlen = plan.shapes.feat_src_xlen;
    let ret_xlen = plan.shapes.ret_xlen;
    let grid_rows = geometry.grid.y as usize;
    let channel_stride = geometry.block.y as usize;

    let ret_rows = split_rows(ret, (0..plan.shapes.n).map(|_| ret_xlen));
    let mut blocks: Vec<Vec<AggregateRow<'_>>> = (0..grid_rows).map(|_| Vec::new()).collect();
    for (dst, ret) in ret_rows.into_iter().enumerate() {
        blocks[dst % grid_rows].push(AggregateRow { dst, ret });
    }

    blocks.into_par_iter().for_each(|rows| {
        for row in rows {
            let edges = graph.in_edges(row.dst);
            let sources = graph.sources(row.dst);
            for bx_idx in 0..geometry.grid.x {
                for tx in 0..geometry.block.x {
                    for h in head_indices(geometry, bx_idx, tx, heads) {
                        let denom = sum[row.dst * heads + h];
                        for ty in 0..channel_stride.min(hidden) {
                            for c in (ty..hidden).step_by(channel_stride) {
                                let col = h * hidden + c;
                                let mut acc = 0.0f32;
                                for (e, &src) in edges.clone().zip(sources) {
                                    acc += exp[e * heads + h] * feat_src[src as usize * feat_xlen + col];
                                }
                                row.ret[col] = acc / denom;
                            }
                        }
                    }
                }
            }
        }
    });
}
