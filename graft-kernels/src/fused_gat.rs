//! Fused GAT CUDA kernels: gat_score_sum, gat_aggregate.
//!
//! Both kernels take the `GatData` bundle by value plus the incoming-edge CSR
//! (`row_offsets`, `column_indices`). They must run in order: the aggregate
//! kernel reads every `exp`/`sum` cell the score kernel writes, so the host
//! fences between the two launches.
//!
//! gat_score_sum -- Grid: (1, gy), Block: (bx, by)
//!   Block row `threadIdx.y` owns vertex `base + threadIdx.y` for one epoch of
//!   the vertex grid-stride loop. Every thread of the block runs the same
//!   number of epochs (the loop bound depends only on `blockIdx.y`), so the
//!   two barriers per epoch are never divergent.
//!   Shared memory: blockDim.y * e_xlen * sizeof(float), one `er` row per
//!   block row, refilled at the start of every epoch. A block row must not
//!   advance to its next vertex while another row of the same block is still
//!   reading the cache, hence the trailing barrier.
//!
//! gat_aggregate -- Grid: (gx, gy), Block: (bx, by)
//!   Vertices stride by gridDim.y, heads by blockDim.x * gridDim.x, channels by
//!   blockDim.y. The weighted sum is accumulated first and divided by the
//!   denominator once, so a vertex without incoming edges yields 0/0.

pub const SCORE_KERNEL: &str = "gat_score_sum_f32";
pub const AGGREGATE_KERNEL: &str = "gat_aggregate_f32";

pub const F32_SRC: &str = r#"
struct GatData {
    const float* feat_src;
    const float* el;
    const float* er;
    float* sum;
    float* exp;
    float* ret;
    float leaky_relu_slope;
    unsigned int n;
    unsigned int e_xlen;
    unsigned int feat_src_xlen;
    unsigned int feat_src_hidden;
    unsigned int ret_xlen;
};

__device__ __forceinline__ float gat_leaky_relu_exp(float x, float slope) {
    return x > 0.0f ? expf(x) : expf(slope * x);
}

extern "C" __global__ void gat_score_sum_f32(
    GatData gdata,
    const unsigned int* row_offsets,
    const unsigned int* column_indices
) {
    extern __shared__ float er_cache[];

    const unsigned int e_xlen = gdata.e_xlen;
    const unsigned int vertex_stride = blockDim.y * gridDim.y;
    const unsigned int head_start = blockIdx.x * blockDim.x + threadIdx.x;
    const unsigned int head_stride = blockDim.x * gridDim.x;
    float* er_row = er_cache + (size_t)threadIdx.y * e_xlen;

    for (unsigned int base = blockIdx.y * blockDim.y; base < gdata.n; base += vertex_stride) {
        const unsigned int dst = base + threadIdx.y;
        const bool active = dst < gdata.n;

        if (active) {
            for (unsigned int f = threadIdx.x; f < e_xlen; f += blockDim.x)
                er_row[f] = gdata.er[(size_t)dst * e_xlen + f];
        }
        __syncthreads();

        if (active) {
            const unsigned int start = row_offsets[dst];
            const unsigned int end = row_offsets[dst + 1];
            for (unsigned int f = head_start; f < e_xlen; f += head_stride) {
                const float er_val = er_row[f];
                float acc = 0.0f;
                for (unsigned int e = start; e < end; ++e) {
                    const unsigned int src = column_indices[e];
                    const float t = gat_leaky_relu_exp(
                        gdata.el[(size_t)src * e_xlen + f] + er_val,
                        gdata.leaky_relu_slope);
                    gdata.exp[(size_t)e * e_xlen + f] = t;
                    acc += t;
                }
                gdata.sum[(size_t)dst * e_xlen + f] = acc;
            }
        }
        __syncthreads();
    }
}

extern "C" __global__ void gat_aggregate_f32(
    GatData gdata,
    const unsigned int* row_offsets,
    const unsigned int* column_indices
) {
    const unsigned int e_xlen = gdata.e_xlen;
    const unsigned int hidden = gdata.feat_src_hidden;
    const unsigned int vertex_stride = gridDim.y;
    const unsigned int head_stride = blockDim.x * gridDim.x;

    for (unsigned int dst = blockIdx.y; dst < gdata.n; dst += vertex_stride) {
        const unsigned int start = row_offsets[dst];
        const unsigned int end = row_offsets[dst + 1];
        for (unsigned int h = blockIdx.x * blockDim.x + threadIdx.x; h < e_xlen; h += head_stride) {
            const float denom = gdata.sum[(size_t)dst * e_xlen + h];
            for (unsigned int c = threadIdx.y; c < hidden; c += blockDim.y) {
                const unsigned int col = h * hidden + c;
                float acc = 0.0f;
                for (unsigned int e = start; e < end; ++e) {
                    const unsigned int src = column_indices[e];
                    acc += gdata.exp[(size_t)e * e_xlen + h]
                         * gdata.feat_src[(size_t)src * gdata.feat_src_xlen + col];
                }
                gdata.ret[(size_t)dst * gdata.ret_xlen + col] = acc / denom;
            }
        }
    }
}
"#;
