use crate::graph::CsrGraph;
use crate::tensor::{GraphView, Tensor};
use crate::{Device, Result};

pub trait GatBackend: Send + Sync + 'static {
    type Tensor: Tensor;
    type Graph: GraphView;

    fn name(&self) -> &str;
    fn device(&self) -> Device;

    // Graph transfer
    fn upload_graph(&self, graph: &CsrGraph) -> Result<Self::Graph>;
    /// Copy a resident graph back as `(row_offsets, column_indices)`.
    fn download_graph(&self, graph: &Self::Graph) -> Result<(Vec<u32>, Vec<u32>)>;

    // Dense arrays
    fn allocate_zeros(&self, shape: &[usize]) -> Result<Self::Tensor>;
    fn copy_from_host_f32(&self, data: &[f32], shape: &[usize]) -> Result<Self::Tensor>;
    fn copy_to_host_f32(&self, tensor: &Self::Tensor) -> Result<Vec<f32>>;

    // Synchronization
    fn synchronize(&self) -> Result<()>;

    /// Fused attention-weighted aggregation over the incoming edges of every
    /// vertex.
    ///
    /// Writes `exp[e, h]`, `sum[v, h]` and `ret[v, h * hidden + c]` in place.
    /// `exp`, `sum` and `ret` are fully overwritten; their prior contents do
    /// not matter. Work is enqueued in stream order; call `synchronize` before
    /// reading results through anything other than this backend.
    #[allow(clippy::too_many_arguments)]
    fn fused_gat(
        &self,
        graph: &Self::Graph,
        feat_src: &Self::Tensor,
        el: &Self::Tensor,
        er: &Self::Tensor,
        sum: &mut Self::Tensor,
        exp: &mut Self::Tensor,
        ret: &mut Self::Tensor,
        leaky_relu_slope: f32,
    ) -> Result<()>;
}
