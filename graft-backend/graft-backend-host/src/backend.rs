use graft_core::{
    CsrGraph, Device, FusedGatPlan, GatArrays, GatBackend, GatKernelConfig, Result, Tensor,
};
use tracing::{debug, warn};

use crate::simt::{aggregate_stage, score_stage};
use crate::tensor::HostTensor;

/// Host backend for the fused GAT kernels.
///
/// Arrays live in host memory as `Vec<f32>`. Kernels are executed by the SIMT
/// emulator in `simt`, block by block, with the same launch geometry the CUDA
/// backend would use for the same shapes and config.
#[derive(Clone, Debug, Default)]
pub struct HostBackend {
    config: GatKernelConfig,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GatKernelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GatKernelConfig {
        &self.config
    }
}

impl GatBackend for HostBackend {
    type Tensor = HostTensor;
    type Graph = CsrGraph;

    fn name(&self) -> &str {
        "host"
    }

    fn device(&self) -> Device {
        Device::Host
    }

    // ── Graph transfer ──────────────────────────────────────────

    fn upload_graph(&self, graph: &CsrGraph) -> Result<CsrGraph> {
        Ok(graph.clone())
    }

    fn download_graph(&self, graph: &CsrGraph) -> Result<(Vec<u32>, Vec<u32>)> {
        Ok((
            graph.row_offsets().to_vec(),
            graph.column_indices().to_vec(),
        ))
    }

    // ── Dense arrays ────────────────────────────────────────────

    fn allocate_zeros(&self, shape: &[usize]) -> Result<HostTensor> {
        let numel: usize = shape.iter().product();
        HostTensor::new(vec![0.0; numel], shape.to_vec())
    }

    fn copy_from_host_f32(&self, data: &[f32], shape: &[usize]) -> Result<HostTensor> {
        HostTensor::new(data.to_vec(), shape.to_vec())
    }

    fn copy_to_host_f32(&self, tensor: &HostTensor) -> Result<Vec<f32>> {
        Ok(tensor.data().to_vec())
    }

    // ── Synchronization ─────────────────────────────────────────

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    // ── Fused GAT ──────────────────────────────────────────────

    fn fused_gat(
        &self,
        graph: &CsrGraph,
        feat_src: &HostTensor,
        el: &HostTensor,
        er: &HostTensor,
        sum: &mut HostTensor,
        exp: &mut HostTensor,
        ret: &mut HostTensor,
        leaky_relu_slope: f32,
    ) -> Result<()> {
        let arrays = GatArrays {
            feat_src,
            el,
            er,
            sum: &*sum,
            exp: &*exp,
            ret: &*ret,
        };
        let plan = FusedGatPlan::new(self.device(), graph, arrays, leaky_relu_slope, &self.config)?;
        if plan.is_empty() {
            warn!("fused gat: graph has no vertices, skipping both stages");
            return Ok(());
        }
        debug!(
            "host fused gat: {} vertices, {} edges, {} bytes out",
            plan.shapes.n,
            plan.shapes.num_edges,
            exp.size_bytes() + sum.size_bytes() + ret.size_bytes()
        );

        let score_done = score_stage(&plan, graph, el.data(), er.data(), exp.data_mut(), sum.data_mut());
        aggregate_stage(
            score_done,
            &plan,
            graph,
            feat_src.data(),
            exp.data(),
            sum.data(),
            ret.data_mut(),
        );
        Ok(())
    }
}
