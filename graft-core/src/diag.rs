//! Debug dumps of resident graphs and dense arrays.
//!
//! Each helper copies device memory back to the host synchronously, so these
//! are for inspection only and never run on the steady-state path.

use tracing::info;

use crate::backend::GatBackend;
use crate::shape::flattened_width;
use crate::tensor::{GraphView, Tensor};
use crate::{GraftError, Result};

fn join(values: &[impl std::fmt::Display]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_csr<B: GatBackend>(backend: &B, graph: &B::Graph) -> Result<String> {
    if graph.device() != backend.device() {
        return Err(GraftError::DevicePlacement {
            name: "graph",
            expected: backend.device(),
            got: graph.device(),
        });
    }
    let (row_offsets, column_indices) = backend.download_graph(graph)?;
    Ok(format!(
        "csr: {} vertices, {} edges\nrow_offsets: [{}]\ncolumn_indices: [{}]",
        graph.num_vertices(),
        graph.num_edges(),
        join(&row_offsets),
        join(&column_indices)
    ))
}

/// Dump `tensor` as a `rows x cols` matrix, one row per line.
pub fn format_gdata2d<B: GatBackend>(
    backend: &B,
    tensor: &B::Tensor,
    rows: usize,
    cols: usize,
) -> Result<String> {
    if tensor.device() != backend.device() {
        return Err(GraftError::DevicePlacement {
            name: "tensor",
            expected: backend.device(),
            got: tensor.device(),
        });
    }
    if rows.checked_mul(cols) != Some(tensor.numel()) {
        return Err(GraftError::ShapeMismatch {
            expected: vec![rows, cols],
            got: tensor.shape().to_vec(),
        });
    }
    let data = backend.copy_to_host_f32(tensor)?;
    let mut out = format!("gdata: {rows} x {cols}");
    for (r, row) in data.chunks(cols.max(1)).take(rows).enumerate() {
        out.push_str(&format!("\n[{r}] {}", join(row)));
    }
    Ok(out)
}

/// Dump `tensor` as `[leading dim] x [flattened width]`.
pub fn format_gdata<B: GatBackend>(backend: &B, tensor: &B::Tensor) -> Result<String> {
    let shape = tensor.shape();
    let rows = shape.first().copied().unwrap_or(1);
    format_gdata2d(backend, tensor, rows, flattened_width(shape))
}

pub fn print_csr<B: GatBackend>(backend: &B, graph: &B::Graph) -> Result<()> {
    info!("{}", format_csr(backend, graph)?);
    Ok(())
}

pub fn print_gdata2d<B: GatBackend>(
    backend: &B,
    tensor: &B::Tensor,
    rows: usize,
    cols: usize,
) -> Result<()> {
    info!("{}", format_gdata2d(backend, tensor, rows, cols)?);
    Ok(())
}

pub fn print_gdata<B: GatBackend>(backend: &B, tensor: &B::Tensor) -> Result<()> {
    info!("{}", format_gdata(backend, tensor)?);
    Ok(())
}
