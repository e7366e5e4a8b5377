//! Sequential definition of the fused layer, used as a test oracle.

use crate::graph::CsrGraph;

/// `exp(x)` for positive `x`, `exp(slope * x)` otherwise. Not clamped.
#[inline]
pub fn leaky_relu_exp(x: f32, slope: f32) -> f32 {
    if x > 0.0 {
        x.exp()
    } else {
        (slope * x).exp()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatOutputs {
    /// `[E, heads]` unnormalized attention weights.
    pub exp: Vec<f32>,
    /// `[V, heads]` per-vertex denominators.
    pub sum: Vec<f32>,
    /// `[V, heads * hidden]` aggregated features.
    pub ret: Vec<f32>,
}

/// Compute both stages on the host with the kernels' operation order.
///
/// `feat_src` is `[V, heads * hidden]`, `el` and `er` are `[V, heads]`.
pub fn reference_fused_gat(
    graph: &CsrGraph,
    feat_src: &[f32],
    el: &[f32],
    er: &[f32],
    heads: usize,
    hidden: usize,
    slope: f32,
) -> GatOutputs {
    let n = graph.num_vertices();
    let xlen = heads * hidden;
    let mut exp = vec![0.0f32; graph.num_edges() * heads];
    let mut sum = vec![0.0f32; n * heads];
    let mut ret = vec![0.0f32; n * xlen];

    for dst in 0..n {
        let edges = graph.in_edges(dst);
        for h in 0..heads {
            let er_val = er[dst * heads + h];
            let mut acc = 0.0f32;
            for e in edges.clone() {
                let src = graph.column_indices()[e] as usize;
                let t = leaky_relu_exp(el[src * heads + h] + er_val, slope);
                exp[e * heads + h] = t;
                acc += t;
            }
            sum[dst * heads + h] = acc;
        }
    }

    for dst in 0..n {
        let edges = graph.in_edges(dst);
        for h in 0..heads {
            let denom = sum[dst * heads + h];
            for c in 0..hidden {
                let col = h * hidden + c;
                let mut acc = 0.0f32;
                for e in edges.clone() {
                    let src = graph.column_indices()[e] as usize;
                    acc += exp[e * heads + h] * feat_src[src * xlen + col];
                }
                ret[dst * xlen + col] = acc / denom;
            }
        }
    }

    GatOutputs { exp, sum, ret }
}

/// Largest absolute difference between two buffers.
///
/// Positions where both sides are NaN, or both are the same infinity, count
/// as equal; a NaN/Inf on one side only, or a length mismatch, yields
/// `f32::INFINITY`.
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            if x.is_nan() && y.is_nan() {
                0.0
            } else if x.is_infinite() || y.is_infinite() {
                if x == y {
                    0.0
                } else {
                    f32::INFINITY
                }
            } else if x.is_nan() || y.is_nan() {
                f32::INFINITY
            } else {
                (x - y).abs()
            }
        })
        .fold(0.0f32, f32::max)
}
