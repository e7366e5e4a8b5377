//! Device tests for the CUDA backend.
//!
//! Run with `cargo test -p graft-backend-cuda -- --ignored` on a machine with
//! a CUDA device.

use graft_backend_cuda::CudaBackend;
use graft_core::reference::{max_abs_diff, reference_fused_gat, GatOutputs};
use graft_core::{CsrGraph, Device, GatBackend, GatKernelConfig, GraftError, Tensor};
use rand::prelude::*;

struct Case {
    graph: CsrGraph,
    heads: usize,
    hidden: usize,
    feat_src: Vec<f32>,
    el: Vec<f32>,
    er: Vec<f32>,
}

fn random_case(seed: u64, n: usize, num_edges: usize, heads: usize, hidden: usize) -> Case {
    let mut rng = StdRng::seed_from_u64(seed);
    let edges: Vec<(u32, u32)> = (0..num_edges)
        .map(|_| (rng.gen_range(0..n as u32), rng.gen_range(0..n as u32)))
        .collect();
    let graph = CsrGraph::from_edges(n, &edges).unwrap();
    let mut fill = |len: usize| -> Vec<f32> { (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect() };
    Case {
        graph,
        heads,
        hidden,
        feat_src: fill(n * heads * hidden),
        el: fill(n * heads),
        er: fill(n * heads),
    }
}

fn run(backend: &CudaBackend, case: &Case, slope: f32) -> GatOutputs {
    let n = case.graph.num_vertices();
    let e = case.graph.num_edges();
    let (heads, hidden) = (case.heads, case.hidden);

    let graph = backend.upload_graph(&case.graph).unwrap();
    let feat_src = backend
        .copy_from_host_f32(&case.feat_src, &[n, heads, hidden])
        .unwrap();
    let el = backend.copy_from_host_f32(&case.el, &[n, heads, 1]).unwrap();
    let er = backend.copy_from_host_f32(&case.er, &[n, heads, 1]).unwrap();
    let mut sum = backend.allocate_zeros(&[n, heads, 1]).unwrap();
    let mut exp = backend.allocate_zeros(&[e, heads, 1]).unwrap();
    let mut ret = backend.allocate_zeros(&[n, heads * hidden]).unwrap();

    backend
        .fused_gat(&graph, &feat_src, &el, &er, &mut sum, &mut exp, &mut ret, slope)
        .unwrap();
    backend.synchronize().unwrap();

    GatOutputs {
        exp: backend.copy_to_host_f32(&exp).unwrap(),
        sum: backend.copy_to_host_f32(&sum).unwrap(),
        ret: backend.copy_to_host_f32(&ret).unwrap(),
    }
}

fn assert_close(case: &Case, out: &GatOutputs, slope: f32) {
    let want = reference_fused_gat(
        &case.graph,
        &case.feat_src,
        &case.el,
        &case.er,
        case.heads,
        case.hidden,
        slope,
    );
    // Device expf differs from the host by a few ulp.
    let exp_err = max_abs_diff(&out.exp, &want.exp);
    let sum_err = max_abs_diff(&out.sum, &want.sum);
    let ret_err = max_abs_diff(&out.ret, &want.ret);
    assert!(exp_err < 1e-5, "exp error {exp_err}");
    assert!(sum_err < 1e-3, "sum error {sum_err}");
    assert!(ret_err < 1e-4, "ret error {ret_err}");
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_graph_roundtrip() {
    let backend = CudaBackend::new(0).unwrap();
    let graph = CsrGraph::from_edges(4, &[(0, 1), (2, 1), (3, 0)]).unwrap();
    let resident = backend.upload_graph(&graph).unwrap();
    let (row_offsets, column_indices) = backend.download_graph(&resident).unwrap();
    assert_eq!(row_offsets, graph.row_offsets());
    assert_eq!(column_indices, graph.column_indices());

    let edgeless = CsrGraph::from_edges(2, &[]).unwrap();
    let resident = backend.upload_graph(&edgeless).unwrap();
    let (row_offsets, column_indices) = backend.download_graph(&resident).unwrap();
    assert_eq!(row_offsets, vec![0, 0, 0]);
    assert!(column_indices.is_empty());
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_chain_graph() {
    let backend = CudaBackend::new(0).unwrap();
    let case = Case {
        graph: CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap(),
        heads: 1,
        hidden: 2,
        feat_src: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        el: vec![0.0; 3],
        er: vec![0.0; 3],
    };
    let out = run(&backend, &case, 0.1);
    assert_eq!(out.exp, vec![1.0, 1.0]);
    assert_eq!(out.sum, vec![0.0, 1.0, 1.0]);
    assert!(out.ret[0].is_nan() && out.ret[1].is_nan(), "{:?}", out.ret);
    assert_eq!(&out.ret[2..], &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_matches_reference() {
    let backend = CudaBackend::new(0).unwrap();
    let case = random_case(21, 2000, 16_000, 8, 16);
    let out = run(&backend, &case, 0.2);
    assert_close(&case, &out, 0.2);
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_small_geometry_strides_over_everything() {
    let config = GatKernelConfig {
        max_threads_per_block: 4,
        max_blocks: 2,
        score_head_threads: 2,
        aggregate_head_threads: 1,
        max_shared_mem_bytes: 16,
    };
    let backend = CudaBackend::with_config(0, config.clone()).unwrap();
    assert_eq!(backend.config(), &config);
    let case = random_case(23, 97, 500, 3, 5);
    let out = run(&backend, &case, 0.2);
    assert_close(&case, &out, 0.2);
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_repeated_calls_are_bit_identical() {
    let backend = CudaBackend::new(0).unwrap();
    let case = random_case(17, 300, 2400, 4, 8);
    let first = run(&backend, &case, 0.2);
    let second = run(&backend, &case, 0.2);
    for (what, a, b) in [
        ("exp", &first.exp, &second.exp),
        ("sum", &first.sum, &second.sum),
        ("ret", &first.ret, &second.ret),
    ] {
        let same = a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits());
        assert!(same, "{what} differs between runs");
    }
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_zero_in_degree_gives_nan() {
    let backend = CudaBackend::new(0).unwrap();
    let mut case = random_case(3, 6, 0, 2, 3);
    case.graph = CsrGraph::from_edges(6, &[(1, 0), (2, 0)]).unwrap();
    let out = run(&backend, &case, 0.2);
    for v in 1..6 {
        assert_eq!(&out.sum[v * 2..v * 2 + 2], &[0.0, 0.0]);
        assert!(out.ret[v * 6..v * 6 + 6].iter().all(|x| x.is_nan()));
    }
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_empty_graph_is_a_no_op() {
    let backend = CudaBackend::new(0).unwrap();
    let case = random_case(1, 0, 0, 2, 3);
    let out = run(&backend, &case, 0.2);
    assert!(out.exp.is_empty() && out.sum.is_empty() && out.ret.is_empty());
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_rejects_mismatched_shapes() {
    let backend = CudaBackend::new(0).unwrap();
    let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
    let graph = backend.upload_graph(&graph).unwrap();
    let feat_src = backend.allocate_zeros(&[3, 2]).unwrap();
    let el = backend.allocate_zeros(&[3, 1]).unwrap();
    let er = backend.allocate_zeros(&[3, 1]).unwrap();
    let mut sum = backend.allocate_zeros(&[3, 1]).unwrap();
    let mut exp = backend.allocate_zeros(&[3, 1]).unwrap();
    let mut ret = backend.allocate_zeros(&[3, 2]).unwrap();
    let err = backend
        .fused_gat(&graph, &feat_src, &el, &er, &mut sum, &mut exp, &mut ret, 0.2)
        .unwrap_err();
    assert!(matches!(err, GraftError::ShapeMismatch { .. }), "{err}");
    assert_eq!(exp.device(), Device::Cuda(0));
}

#[test]
#[ignore = "requires a CUDA device"]
fn test_copy_rejects_wrong_length() {
    let backend = CudaBackend::new(0).unwrap();
    let err = backend
        .copy_from_host_f32(&[1.0, 2.0, 3.0], &[2, 2])
        .unwrap_err();
    assert!(matches!(err, GraftError::ShapeMismatch { .. }), "{err}");
}
