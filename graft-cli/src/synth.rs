//! Random graphs and features for driving the fused layer.

use graft_core::{CsrGraph, Result};
use rand::prelude::*;

/// Inputs of one fused GAT call, in host memory.
#[derive(Debug, Clone)]
pub struct SyntheticLayer {
    pub graph: CsrGraph,
    pub heads: usize,
    pub hidden: usize,
    /// `[V, heads * hidden]`
    pub feat_src: Vec<f32>,
    /// `[V, heads]`
    pub el: Vec<f32>,
    /// `[V, heads]`
    pub er: Vec<f32>,
}

/// Directed graph where every vertex draws its in-degree uniformly from
/// `0..=2 * avg_degree` and its sources uniformly from all vertices.
pub fn random_graph(rng: &mut impl Rng, num_vertices: usize, avg_degree: usize) -> Result<CsrGraph> {
    let mut edges = Vec::with_capacity(num_vertices * avg_degree);
    if num_vertices > 0 {
        for dst in 0..num_vertices as u32 {
            let degree = rng.gen_range(0..=2 * avg_degree);
            for _ in 0..degree {
                let src = rng.gen_range(0..num_vertices as u32);
                edges.push((src, dst));
            }
        }
    }
    CsrGraph::from_edges(num_vertices, &edges)
}

/// Logits are drawn from `[-1, 1)` so `exp` stays well away from overflow.
pub fn random_layer(
    seed: u64,
    num_vertices: usize,
    avg_degree: usize,
    heads: usize,
    hidden: usize,
) -> Result<SyntheticLayer> {
    let mut rng = StdRng::seed_from_u64(seed);
    let graph = random_graph(&mut rng, num_vertices, avg_degree)?;
    let mut fill = |len: usize| -> Vec<f32> { (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect() };
    let feat_src = fill(num_vertices * heads * hidden);
    let el = fill(num_vertices * heads);
    let er = fill(num_vertices * heads);
    Ok(SyntheticLayer {
        graph,
        heads,
        hidden,
        feat_src,
        el,
        er,
    })
}
