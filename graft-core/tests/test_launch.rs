use graft_core::launch::{aggregate_geometry, score_geometry};
use graft_core::shape::{flattened_width, suggest_blocks, suggest_threads, GatArrayShapes};
use graft_core::{Dim3, GatKernelConfig, GatShapes, GraftError};

fn shapes(n: usize, heads: usize, hidden: usize) -> GatShapes {
    GatShapes {
        n,
        num_edges: 0,
        e_xlen: heads,
        feat_src_xlen: heads * hidden,
        feat_src_hidden: hidden,
        ret_xlen: heads * hidden,
    }
}

#[test]
fn test_flattened_width() {
    assert_eq!(flattened_width(&[5, 4, 2]), 8);
    assert_eq!(flattened_width(&[5, 3]), 3);
    assert_eq!(flattened_width(&[5]), 1);
    assert_eq!(flattened_width(&[5, 0, 2]), 0);
}

#[test]
fn test_suggest_threads() {
    assert_eq!(suggest_threads(3, 32), 2);
    assert_eq!(suggest_threads(32, 32), 32);
    assert_eq!(suggest_threads(100, 32), 32);
    assert_eq!(suggest_threads(0, 32), 1);
    // Non power-of-two caps round down.
    assert_eq!(suggest_threads(1000, 48), 32);
    assert_eq!(suggest_threads(5, 48), 4);
}

#[test]
fn test_suggest_blocks() {
    assert_eq!(suggest_blocks(10, 4, 100), 3);
    assert_eq!(suggest_blocks(0, 4, 100), 1);
    assert_eq!(suggest_blocks(1000, 1, 7), 7);
}

#[test]
fn test_derive_shapes() {
    let s = GatShapes::derive(
        4,
        6,
        GatArrayShapes {
            feat_src: &[4, 2, 3],
            el: &[4, 2, 1],
            er: &[4, 2],
            sum: &[4, 2, 1],
            exp: &[6, 2, 1],
            ret: &[4, 6],
        },
    )
    .unwrap();
    assert_eq!(s.n, 4);
    assert_eq!(s.num_edges, 6);
    assert_eq!(s.e_xlen, 2);
    assert_eq!(s.feat_src_xlen, 6);
    assert_eq!(s.feat_src_hidden, 3);
    assert_eq!(s.ret_xlen, 6);
}

#[test]
fn test_derive_shapes_rejects_bad_inputs() {
    let good = GatArrayShapes {
        feat_src: &[4, 4],
        el: &[4, 2],
        er: &[4, 2],
        sum: &[4, 2],
        exp: &[6, 2],
        ret: &[4, 4],
    };
    assert!(GatShapes::derive(4, 6, good).is_ok());

    let bad_rows = GatArrayShapes { el: &[3, 2], ..good };
    assert!(matches!(
        GatShapes::derive(4, 6, bad_rows),
        Err(GraftError::ShapeMismatch { .. })
    ));

    let bad_exp = GatArrayShapes { exp: &[5, 2], ..good };
    assert!(matches!(
        GatShapes::derive(4, 6, bad_exp),
        Err(GraftError::ShapeMismatch { .. })
    ));

    let bad_er_width = GatArrayShapes { er: &[4, 3], ..good };
    assert!(matches!(
        GatShapes::derive(4, 6, bad_er_width),
        Err(GraftError::ShapeMismatch { .. })
    ));

    let bad_feat = GatArrayShapes { feat_src: &[4, 5], ret: &[4, 5], ..good };
    assert!(matches!(
        GatShapes::derive(4, 6, bad_feat),
        Err(GraftError::InvalidArgument(_))
    ));

    let bad_ret = GatArrayShapes { ret: &[4, 2], ..good };
    assert!(matches!(
        GatShapes::derive(4, 6, bad_ret),
        Err(GraftError::ShapeMismatch { .. })
    ));

    let no_heads = GatArrayShapes {
        el: &[4, 0],
        er: &[4, 0],
        sum: &[4, 0],
        exp: &[6, 0],
        ..good
    };
    assert!(matches!(
        GatShapes::derive(4, 6, no_heads),
        Err(GraftError::InvalidArgument(_))
    ));

    let scalar = GatArrayShapes { sum: &[], ..good };
    assert!(GatShapes::derive(4, 6, scalar).is_err());
}

#[test]
fn test_score_geometry_small_graph() {
    let g = score_geometry(&shapes(3, 1, 2), &GatKernelConfig::default()).unwrap();
    assert_eq!(g.block, Dim3::new(1, 2));
    assert_eq!(g.grid, Dim3::new(1, 2));
    assert_eq!(g.shared_mem_bytes, 2 * 4);
}

#[test]
fn test_score_geometry_respects_thread_cap() {
    let g = score_geometry(&shapes(10_000, 8, 16), &GatKernelConfig::default()).unwrap();
    assert_eq!(g.block.x, 8);
    assert_eq!(g.block.y, 128);
    assert!(g.block.volume() <= 1024);
    assert_eq!(g.grid.y, 10_000u32.div_ceil(128));
    assert_eq!(g.shared_mem_bytes, 128 * 8 * 4);
}

#[test]
fn test_score_geometry_shrinks_rows_to_fit_shared_memory() {
    let g = score_geometry(&shapes(1000, 1000, 1), &GatKernelConfig::default()).unwrap();
    assert_eq!(g.block.x, 32);
    assert_eq!(g.block.y, 8);
    assert_eq!(g.shared_mem_bytes, 8 * 1000 * 4);
}

#[test]
fn test_score_geometry_rejects_oversized_head_row() {
    let err = score_geometry(&shapes(10, 20_000, 1), &GatKernelConfig::default()).unwrap_err();
    assert!(matches!(err, GraftError::InvalidArgument(_)), "{err}");
}

#[test]
fn test_score_geometry_clamps_grid() {
    let config = GatKernelConfig {
        max_threads_per_block: 4,
        max_blocks: 3,
        score_head_threads: 1,
        ..GatKernelConfig::default()
    };
    let g = score_geometry(&shapes(100, 1, 1), &config).unwrap();
    assert_eq!(g.block, Dim3::new(1, 4));
    assert_eq!(g.grid, Dim3::new(1, 3));
}

#[test]
fn test_aggregate_geometry() {
    let g = aggregate_geometry(&shapes(100, 8, 16), &GatKernelConfig::default());
    assert_eq!(g.block, Dim3::new(4, 16));
    assert_eq!(g.grid, Dim3::new(2, 100));
    assert_eq!(g.shared_mem_bytes, 0);
}

#[test]
fn test_aggregate_geometry_clamps_vertices() {
    let config = GatKernelConfig {
        max_blocks: 5,
        ..GatKernelConfig::default()
    };
    let g = aggregate_geometry(&shapes(100, 1, 1), &config);
    assert_eq!(g.grid.y, 5);
    let empty = aggregate_geometry(&shapes(0, 1, 1), &config);
    assert_eq!(empty.grid.y, 1);
}

#[test]
fn test_config_defaults_and_json() {
    let config = GatKernelConfig::default();
    config.validate().unwrap();

    let partial = GatKernelConfig::from_json_str(r#"{"max_blocks": 2}"#).unwrap();
    assert_eq!(partial.max_blocks, 2);
    assert_eq!(partial.max_threads_per_block, config.max_threads_per_block);

    let roundtrip = serde_json::to_string(&config).unwrap();
    assert_eq!(GatKernelConfig::from_json_str(&roundtrip).unwrap(), config);
}

#[test]
fn test_config_rejects_invalid_values() {
    for text in [
        r#"{"score_head_threads": 3}"#,
        r#"{"max_threads_per_block": 0}"#,
        r#"{"max_blocks": 0}"#,
        r#"{"aggregate_head_threads": 2048}"#,
        r#"{"max_shared_mem_bytes": 2}"#,
        r#"{"max_blocks": 65536}"#,
        r#"{"max_shared_mem_bytes": 49153}"#,
    ] {
        let err = GatKernelConfig::from_json_str(text).unwrap_err();
        assert!(matches!(err, GraftError::Config(_)), "{text}: {err}");
    }
    assert!(matches!(
        GatKernelConfig::from_json_str("{not json"),
        Err(GraftError::Json(_))
    ));
}

#[test]
fn test_config_accepts_hardware_limits() {
    let text = r#"{"max_blocks": 65535, "max_shared_mem_bytes": 49152}"#;
    let config = GatKernelConfig::from_json_str(text).unwrap();
    assert_eq!(config.max_blocks, graft_core::config::MAX_GRID_BLOCKS);
    assert_eq!(config.max_shared_mem_bytes, graft_core::config::MAX_SHARED_MEM_BYTES);

    // Every grid axis of a validated config stays launchable.
    let g = aggregate_geometry(&shapes(1_000_000, 1, 1), &config);
    assert_eq!(g.grid.y, 65535);
    let g = score_geometry(&shapes(100_000_000, 1, 1), &config).unwrap();
    assert!(g.grid.y <= 65535);
}
