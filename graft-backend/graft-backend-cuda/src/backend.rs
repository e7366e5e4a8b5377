use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, DevicePtr, DevicePtrMut,
    DeviceRepr, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;
use graft_core::{
    CsrGraph, Device, FusedGatParams, FusedGatPlan, GatArrays, GatBackend, GatKernelConfig,
    GraftError, LaunchGeometry, Result, Tensor,
};
use graft_kernels::fused_gat;
use tracing::{debug, warn};

use crate::tensor::{CudaGraph, CudaTensor};

/// Kernel data bundle, passed by value to both launches.
///
/// Mirrors `struct GatData` in `graft_kernels::fused_gat::F32_SRC`: six
/// device pointers followed by the scalar parameters. The pointers borrow
/// buffers owned by the caller's tensors and are only valid for the launches
/// they are built for.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct GatKernelData {
    feat_src: u64,
    el: u64,
    er: u64,
    sum: u64,
    exp: u64,
    ret: u64,
    params: FusedGatParams,
}

// SAFETY: plain-old-data with the same layout as the kernel-side struct.
unsafe impl DeviceRepr for GatKernelData {}

const _: () = assert!(
    std::mem::size_of::<GatKernelData>() == 6 * 8 + 6 * 4,
    "GatKernelData layout must match struct GatData"
);

struct KernelFunctions {
    score: CudaFunction,
    aggregate: CudaFunction,
}

#[derive(Clone)]
pub struct CudaBackend {
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    ordinal: usize,
    config: GatKernelConfig,
    kernels: Arc<KernelFunctions>,
    _module: Arc<CudaModule>,
}

impl CudaBackend {
    pub fn new(ordinal: usize) -> Result<Self> {
        Self::with_config(ordinal, GatKernelConfig::default())
    }

    pub fn with_config(ordinal: usize, config: GatKernelConfig) -> Result<Self> {
        config.validate()?;
        let ctx =
            CudaContext::new(ordinal).map_err(|e| GraftError::Cuda(format!("context: {e}")))?;
        let stream = ctx.default_stream();

        let ptx = compile_ptx(fused_gat::F32_SRC)
            .map_err(|e| GraftError::Cuda(format!("nvrtc: {e}")))?;
        let module = ctx
            .load_module(ptx)
            .map_err(|e| GraftError::Cuda(format!("module load: {e}")))?;

        let load = |name: &str| -> Result<CudaFunction> {
            module
                .load_function(name)
                .map_err(|e| GraftError::Cuda(format!("load {name}: {e}")))
        };

        let kernels = KernelFunctions {
            score: load(fused_gat::SCORE_KERNEL)?,
            aggregate: load(fused_gat::AGGREGATE_KERNEL)?,
        };
        debug!("CUDA backend ready on device {ordinal}");

        Ok(Self {
            _ctx: ctx,
            stream,
            ordinal,
            config,
            kernels: Arc::new(kernels),
            _module: module,
        })
    }

    pub fn config(&self) -> &GatKernelConfig {
        &self.config
    }

    /// Upload `data`, padding an empty slice to one element.
    fn upload<T: DeviceRepr + Default + Copy>(&self, data: &[T]) -> Result<CudaSlice<T>> {
        let pad = [T::default()];
        let result = if data.is_empty() {
            self.stream.memcpy_stod(&pad[..])
        } else {
            self.stream.memcpy_stod(data)
        };
        result.map_err(|e| GraftError::Cuda(e.to_string()))
    }

    fn download<T: DeviceRepr + Default + Clone>(
        &self,
        slice: &CudaSlice<T>,
        len: usize,
    ) -> Result<Vec<T>> {
        let mut host = self
            .stream
            .memcpy_dtov(slice)
            .map_err(|e| GraftError::Transfer(e.to_string()))?;
        host.truncate(len);
        Ok(host)
    }
}

fn validate_shape(data_len: usize, shape: &[usize]) -> Result<()> {
    let expected: usize = shape.iter().product();
    if data_len != expected {
        return Err(GraftError::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![data_len],
        });
    }
    Ok(())
}

fn launch_config(geometry: &LaunchGeometry) -> LaunchConfig {
    LaunchConfig {
        grid_dim: geometry.grid.as_tuple(),
        block_dim: geometry.block.as_tuple(),
        shared_mem_bytes: geometry.shared_mem_bytes,
    }
}

impl GatBackend for CudaBackend {
    type Tensor = CudaTensor;
    type Graph = CudaGraph;

    fn name(&self) -> &str {
        "cuda"
    }

    fn device(&self) -> Device {
        Device::Cuda(self.ordinal)
    }

    fn upload_graph(&self, graph: &CsrGraph) -> Result<CudaGraph> {
        Ok(CudaGraph {
            row_offsets: self.upload(graph.row_offsets())?,
            column_indices: self.upload(graph.column_indices())?,
            num_vertices: graph.num_vertices(),
            num_edges: graph.num_edges(),
            ordinal: self.ordinal,
        })
    }

    fn download_graph(&self, graph: &CudaGraph) -> Result<(Vec<u32>, Vec<u32>)> {
        Ok((
            self.download(&graph.row_offsets, graph.num_vertices + 1)?,
            self.download(&graph.column_indices, graph.num_edges)?,
        ))
    }

    fn allocate_zeros(&self, shape: &[usize]) -> Result<CudaTensor> {
        let numel = CudaTensor::numel_from_shape(shape);
        let data = self
            .stream
            .alloc_zeros::<f32>(numel.max(1))
            .map_err(|e| GraftError::Cuda(e.to_string()))?;
        Ok(CudaTensor::f32_data(data, shape.to_vec(), self.ordinal))
    }

    fn copy_from_host_f32(&self, data: &[f32], shape: &[usize]) -> Result<CudaTensor> {
        validate_shape(data.len(), shape)?;
        let slice = self.upload(data)?;
        Ok(CudaTensor::f32_data(slice, shape.to_vec(), self.ordinal))
    }

    fn copy_to_host_f32(&self, tensor: &CudaTensor) -> Result<Vec<f32>> {
        self.download(&tensor.data, tensor.len())
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| GraftError::Cuda(e.to_string()))
    }

    fn fused_gat(
        &self,
        graph: &CudaGraph,
        feat_src: &CudaTensor,
        el: &CudaTensor,
        er: &CudaTensor,
        sum: &mut CudaTensor,
        exp: &mut CudaTensor,
        ret: &mut CudaTensor,
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
            warn!("fused gat: graph has no vertices, skipping both launches");
            return Ok(());
        }
        debug!(
            "cuda fused gat: {} vertices, {} edges, {} bytes out",
            plan.shapes.n,
            plan.shapes.num_edges,
            exp.size_bytes() + sum.size_bytes() + ret.size_bytes()
        );

        // The guards keep the stream-ordering events alive until both
        // launches are enqueued.
        let stream = &self.stream;
        let (feat_src_ptr, _feat_src_guard) = feat_src.data.device_ptr(stream);
        let (el_ptr, _el_guard) = el.data.device_ptr(stream);
        let (er_ptr, _er_guard) = er.data.device_ptr(stream);
        let (sum_ptr, _sum_guard) = sum.data.device_ptr_mut(stream);
        let (exp_ptr, _exp_guard) = exp.data.device_ptr_mut(stream);
        let (ret_ptr, _ret_guard) = ret.data.device_ptr_mut(stream);

        let gdata = GatKernelData {
            feat_src: feat_src_ptr,
            el: el_ptr,
            er: er_ptr,
            sum: sum_ptr,
            exp: exp_ptr,
            ret: ret_ptr,
            params: plan.params,
        };

        let mut builder = stream.launch_builder(&self.kernels.score);
        builder.arg(&gdata);
        builder.arg(&graph.row_offsets);
        builder.arg(&graph.column_indices);
        unsafe {
            builder
                .launch(launch_config(&plan.score))
                .map_err(|e| GraftError::Cuda(format!("gat_score_sum: {e}")))?;
        }

        // Both launches share one stream, which already orders them. The event
        // marks the stage boundary so the aggregate launch keeps waiting on
        // the score stage if it ever moves to another stream.
        let score_done = stream
            .record_event(None)
            .map_err(|e| GraftError::Cuda(format!("record event: {e}")))?;
        stream
            .wait(&score_done)
            .map_err(|e| GraftError::Cuda(format!("stream wait: {e}")))?;

        let mut builder = stream.launch_builder(&self.kernels.aggregate);
        builder.arg(&gdata);
        builder.arg(&graph.row_offsets);
        builder.arg(&graph.column_indices);
        unsafe {
            builder
                .launch(launch_config(&plan.aggregate))
                .map_err(|e| GraftError::Cuda(format!("gat_aggregate: {e}")))?;
        }

        Ok(())
    }
}
