use crate::Device;

/// Dense row-major f32 array owned by a backend.
pub trait Tensor: Clone + Send + Sync + std::fmt::Debug {
    fn shape(&self) -> &[usize];
    fn device(&self) -> Device;
    fn numel(&self) -> usize {
        self.shape().iter().product()
    }
    fn size_bytes(&self) -> usize {
        self.numel() * std::mem::size_of::<f32>()
    }
}

/// Incoming-edge CSR adjacency resident on a backend.
pub trait GraphView: Send + Sync + std::fmt::Debug {
    fn num_vertices(&self) -> usize;
    fn num_edges(&self) -> usize;
    fn device(&self) -> Device;
}
