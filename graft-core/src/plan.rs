//! Host-side orchestration shared by every backend: device checks, shape
//! derivation, the by-value scalar bundle, and both launch geometries.

use tracing::debug;

use crate::config::GatKernelConfig;
use crate::launch::{aggregate_geometry, score_geometry, LaunchGeometry};
use crate::shape::{GatArrayShapes, GatShapes};
use crate::tensor::{GraphView, Tensor};
use crate::{Device, GraftError, Result};

/// Scalar half of the kernel data bundle, passed by value to both launches.
///
/// Layout matches the trailing scalar fields of `GatData` in the kernel source.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedGatParams {
    pub leaky_relu_slope: f32,
    pub n: u32,
    pub e_xlen: u32,
    pub feat_src_xlen: u32,
    pub feat_src_hidden: u32,
    pub ret_xlen: u32,
}

/// Borrowed views of the six dense arrays of one fused call.
#[derive(Debug, Clone, Copy)]
pub struct GatArrays<'a, T> {
    pub feat_src: &'a T,
    pub el: &'a T,
    pub er: &'a T,
    pub sum: &'a T,
    pub exp: &'a T,
    pub ret: &'a T,
}

impl<'a, T: Tensor> GatArrays<'a, T> {
    fn named(&self) -> [(&'static str, &'a T); 6] {
        [
            ("feat_src", self.feat_src),
            ("el", self.el),
            ("er", self.er),
            ("sum", self.sum),
            ("exp", self.exp),
            ("ret", self.ret),
        ]
    }

    fn shapes(&self) -> GatArrayShapes<'a> {
        GatArrayShapes {
            feat_src: self.feat_src.shape(),
            el: self.el.shape(),
            er: self.er.shape(),
            sum: self.sum.shape(),
            exp: self.exp.shape(),
            ret: self.ret.shape(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedGatPlan {
    pub shapes: GatShapes,
    pub params: FusedGatParams,
    pub score: LaunchGeometry,
    pub aggregate: LaunchGeometry,
}

fn check_device(name: &'static str, expected: Device, got: Device) -> Result<()> {
    if got != expected {
        return Err(GraftError::DevicePlacement {
            name,
            expected,
            got,
        });
    }
    Ok(())
}

impl FusedGatPlan {
    pub fn new<G, T>(
        device: Device,
        graph: &G,
        arrays: GatArrays<'_, T>,
        leaky_relu_slope: f32,
        config: &GatKernelConfig,
    ) -> Result<Self>
    where
        G: GraphView,
        T: Tensor,
    {
        check_device("graph", device, graph.device())?;
        for (name, tensor) in arrays.named() {
            check_device(name, device, tensor.device())?;
        }

        let shapes = GatShapes::derive(graph.num_vertices(), graph.num_edges(), arrays.shapes())?;
        debug!(
            n = shapes.n,
            num_edges = shapes.num_edges,
            e_xlen = shapes.e_xlen,
            feat_src_xlen = shapes.feat_src_xlen,
            feat_src_hidden = shapes.feat_src_hidden,
            ret_xlen = shapes.ret_xlen,
            "fused gat shapes"
        );

        let params = FusedGatParams {
            leaky_relu_slope,
            n: shapes.n as u32,
            e_xlen: shapes.e_xlen as u32,
            feat_src_xlen: shapes.feat_src_xlen as u32,
            feat_src_hidden: shapes.feat_src_hidden as u32,
            ret_xlen: shapes.ret_xlen as u32,
        };

        let score = score_geometry(&shapes, config)?;
        let aggregate = aggregate_geometry(&shapes, config);
        debug!("score kernel: {score}");
        debug!("aggregate kernel: {aggregate}");

        Ok(Self {
            shapes,
            params,
            score,
            aggregate,
        })
    }

    /// True when the graph has no vertices and both launches are skipped.
    pub fn is_empty(&self) -> bool {
        self.shapes.n == 0
    }
}
