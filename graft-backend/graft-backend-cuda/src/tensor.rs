use cudarc::driver::CudaSlice;
use graft_core::{Device, GraphView, Tensor};

/// Dense f32 array in CUDA global memory.
///
/// Zero-element arrays are backed by a one-element allocation; `shape` is the
/// logical extent and the padding is never read.
#[derive(Debug, Clone)]
pub struct CudaTensor {
    pub(crate) data: CudaSlice<f32>,
    pub(crate) shape: Vec<usize>,
    pub(crate) ordinal: usize,
}

impl CudaTensor {
    pub(crate) fn numel_from_shape(shape: &[usize]) -> usize {
        shape.iter().product()
    }

    pub(crate) fn f32_data(data: CudaSlice<f32>, shape: Vec<usize>, ordinal: usize) -> Self {
        Self {
            data,
            shape,
            ordinal,
        }
    }

    pub(crate) fn len(&self) -> usize {
        Self::numel_from_shape(&self.shape)
    }
}

impl Tensor for CudaTensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn device(&self) -> Device {
        Device::Cuda(self.ordinal)
    }
}

/// Incoming-edge CSR resident in CUDA global memory.
#[derive(Debug, Clone)]
pub struct CudaGraph {
    pub(crate) row_offsets: CudaSlice<u32>,
    pub(crate) column_indices: CudaSlice<u32>,
    pub(crate) num_vertices: usize,
    pub(crate) num_edges: usize,
    pub(crate) ordinal: usize,
}

impl GraphView for CudaGraph {
    fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    fn num_edges(&self) -> usize {
        self.num_edges
    }

    fn device(&self) -> Device {
        Device::Cuda(self.ordinal)
    }
}
