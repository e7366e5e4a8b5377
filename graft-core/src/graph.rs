//! Host-side incoming-edge CSR adjacency.
//!
//! Row `v` lists the edges whose destination is `v`:
//! `row_offsets[v]..row_offsets[v + 1]` indexes into `column_indices`, and
//! `column_indices[e]` is the source vertex of edge `e`. Edge ids are the
//! positions in `column_indices`, so per-edge buffers (`exp`) are laid out in
//! destination-major order.

use std::ops::Range;

use crate::tensor::GraphView;
use crate::{Device, GraftError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrGraph {
    row_offsets: Vec<u32>,
    column_indices: Vec<u32>,
}

impl CsrGraph {
    /// Wrap raw CSR arrays after checking that offsets start at zero, never
    /// decrease, end at the edge count, and that every column id is a vertex.
    pub fn new(row_offsets: Vec<u32>, column_indices: Vec<u32>) -> Result<Self> {
        let Some((&first, _)) = row_offsets.split_first() else {
            return Err(GraftError::InvalidGraph(
                "row_offsets must have at least one entry".into(),
            ));
        };
        if first != 0 {
            return Err(GraftError::InvalidGraph(format!(
                "row_offsets[0] must be 0, got {first}"
            )));
        }
        if let Some(v) = row_offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(GraftError::InvalidGraph(format!(
                "row_offsets decreases at vertex {v} ({} -> {})",
                row_offsets[v],
                row_offsets[v + 1]
            )));
        }
        let last = row_offsets[row_offsets.len() - 1] as usize;
        if last != column_indices.len() {
            return Err(GraftError::InvalidGraph(format!(
                "row_offsets ends at {last} but there are {} column indices",
                column_indices.len()
            )));
        }
        let num_vertices = row_offsets.len() - 1;
        if num_vertices > u32::MAX as usize {
            return Err(GraftError::InvalidGraph(
                "vertex count exceeds u32 index range".into(),
            ));
        }
        if let Some(e) = column_indices
            .iter()
            .position(|&src| src as usize >= num_vertices)
        {
            return Err(GraftError::InvalidGraph(format!(
                "edge {e} has source {} but the graph has {num_vertices} vertices",
                column_indices[e]
            )));
        }
        Ok(Self {
            row_offsets,
            column_indices,
        })
    }

    /// Build the incoming-edge CSR of a directed edge list `(src, dst)`.
    ///
    /// Edges sharing a destination keep their relative order from `edges`.
    pub fn from_edges(num_vertices: usize, edges: &[(u32, u32)]) -> Result<Self> {
        if edges.len() > u32::MAX as usize {
            return Err(GraftError::InvalidGraph(
                "edge count exceeds u32 index range".into(),
            ));
        }
        let mut degree = vec![0u32; num_vertices];
        for (i, &(src, dst)) in edges.iter().enumerate() {
            if src as usize >= num_vertices || dst as usize >= num_vertices {
                return Err(GraftError::InvalidGraph(format!(
                    "edge {i} ({src} -> {dst}) references a vertex >= {num_vertices}"
                )));
            }
            degree[dst as usize] += 1;
        }

        let mut row_offsets = Vec::with_capacity(num_vertices + 1);
        row_offsets.push(0u32);
        let mut running = 0u32;
        for d in &degree {
            running += d;
            row_offsets.push(running);
        }

        // Counting-sort scatter keeps the input order within each row.
        let mut cursor: Vec<u32> = row_offsets[..num_vertices].to_vec();
        let mut column_indices = vec![0u32; edges.len()];
        for &(src, dst) in edges {
            let slot = &mut cursor[dst as usize];
            column_indices[*slot as usize] = src;
            *slot += 1;
        }

        Self::new(row_offsets, column_indices)
    }

    pub fn num_vertices(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn num_edges(&self) -> usize {
        self.column_indices.len()
    }

    pub fn row_offsets(&self) -> &[u32] {
        &self.row_offsets
    }

    pub fn column_indices(&self) -> &[u32] {
        &self.column_indices
    }

    /// Edge-id range of the edges entering `v`.
    pub fn in_edges(&self, v: usize) -> Range<usize> {
        self.row_offsets[v] as usize..self.row_offsets[v + 1] as usize
    }

    pub fn in_degree(&self, v: usize) -> usize {
        self.in_edges(v).len()
    }

    /// Source vertices of the edges entering `v`, in edge order.
    pub fn sources(&self, v: usize) -> &[u32] {
        &self.column_indices[self.in_edges(v)]
    }
}

impl GraphView for CsrGraph {
    fn num_vertices(&self) -> usize {
        CsrGraph::num_vertices(self)
    }

    fn num_edges(&self) -> usize {
        CsrGraph::num_edges(self)
    }

    fn device(&self) -> Device {
        Device::Host
    }
}
