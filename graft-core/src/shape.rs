//! Shape bookkeeping for the fused attention layer.

use crate::{GraftError, Result};

/// Product of every dimension after the leading vertex/edge axis.
pub fn flattened_width(shape: &[usize]) -> usize {
    shape.iter().skip(1).product()
}

/// Largest power of two no greater than `cap` that does not exceed `width`.
///
/// Always at least 1, so a zero-width axis still gets a one-thread block.
pub fn suggest_threads(width: usize, cap: u32) -> u32 {
    let mut threads = cap.max(1);
    if !threads.is_power_of_two() {
        threads = threads.next_power_of_two() >> 1;
    }
    while threads > 1 && threads as usize > width {
        threads >>= 1;
    }
    threads
}

/// Blocks needed to cover `work` items with `threads` per block, clamped to
/// `[1, cap]`. Grid-stride loops pick up whatever the clamp leaves over.
pub fn suggest_blocks(work: usize, threads: u32, cap: u32) -> u32 {
    let threads = threads.max(1) as usize;
    let needed = work.div_ceil(threads).max(1);
    needed.min(cap.max(1) as usize) as u32
}

/// Every dimension the two kernels need, derived from the array shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatShapes {
    /// Vertex count `V`.
    pub n: usize,
    /// Edge count `E`.
    pub num_edges: usize,
    /// Attention heads (`el`/`er` flattened width).
    pub e_xlen: usize,
    /// Flattened source feature width, `e_xlen * feat_src_hidden`.
    pub feat_src_xlen: usize,
    /// Channels per head.
    pub feat_src_hidden: usize,
    /// Flattened output width; always equals `feat_src_xlen`.
    pub ret_xlen: usize,
}

/// Shapes of the six dense arrays passed to the fused layer.
#[derive(Debug, Clone, Copy)]
pub struct GatArrayShapes<'a> {
    pub feat_src: &'a [usize],
    pub el: &'a [usize],
    pub er: &'a [usize],
    pub sum: &'a [usize],
    pub exp: &'a [usize],
    pub ret: &'a [usize],
}

fn leading(name: &str, shape: &[usize]) -> Result<usize> {
    shape.first().copied().ok_or_else(|| {
        GraftError::InvalidArgument(format!("`{name}` must have at least one dimension"))
    })
}

fn expect_rows(name: &str, shape: &[usize], rows: usize) -> Result<()> {
    let got = leading(name, shape)?;
    if got != rows {
        return Err(GraftError::ShapeMismatch {
            expected: vec![rows, flattened_width(shape)],
            got: shape.to_vec(),
        });
    }
    Ok(())
}

fn expect_width(shape: &[usize], rows: usize, width: usize) -> Result<()> {
    if flattened_width(shape) != width {
        return Err(GraftError::ShapeMismatch {
            expected: vec![rows, width],
            got: shape.to_vec(),
        });
    }
    Ok(())
}

impl GatShapes {
    pub fn derive(num_vertices: usize, num_edges: usize, arrays: GatArrayShapes<'_>) -> Result<Self> {
        let n = num_vertices;
        for (name, shape) in [
            ("feat_src", arrays.feat_src),
            ("el", arrays.el),
            ("er", arrays.er),
            ("sum", arrays.sum),
            ("ret", arrays.ret),
        ] {
            expect_rows(name, shape, n)?;
        }
        expect_rows("exp", arrays.exp, num_edges)?;

        let e_xlen = flattened_width(arrays.el);
        if e_xlen == 0 {
            return Err(GraftError::InvalidArgument(
                "attention logits must have at least one head".into(),
            ));
        }
        expect_width(arrays.er, n, e_xlen)?;
        expect_width(arrays.sum, n, e_xlen)?;
        expect_width(arrays.exp, num_edges, e_xlen)?;

        let feat_src_xlen = flattened_width(arrays.feat_src);
        if feat_src_xlen == 0 || feat_src_xlen % e_xlen != 0 {
            return Err(GraftError::InvalidArgument(format!(
                "feat_src width {feat_src_xlen} is not a positive multiple of {e_xlen} heads"
            )));
        }
        let feat_src_hidden = feat_src_xlen / e_xlen;

        let ret_xlen = flattened_width(arrays.ret);
        expect_width(arrays.ret, n, feat_src_xlen)?;

        for (name, value) in [
            ("vertex count", n),
            ("edge count", num_edges),
            ("feat_src width", feat_src_xlen),
        ] {
            if value > u32::MAX as usize {
                return Err(GraftError::InvalidArgument(format!(
                    "{name} {value} exceeds the u32 kernel index range"
                )));
            }
        }

        Ok(Self {
            n,
            num_edges,
            e_xlen,
            feat_src_xlen,
            feat_src_hidden,
            ret_xlen,
        })
    }
}
