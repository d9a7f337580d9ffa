use crate::algs::assembly::{AssemblyBackend, ColorBatch, triangle_area, zero_area};
use crate::engine::buffers::{GpuTriangle, Params, read_buffer, storage_init, storage_zeroed, uniform};
use crate::engine::{Engine, to_u32};
use crate::mesh_error::MeshError;
use crate::topology::mesh::Mesh;

/// [`AssemblyBackend`] running the `stiffness` kernel of an [`Engine`].
///
/// The value array lives on the device from `prepare` until `read_back`.
pub struct GpuBackend<'e> {
    engine: &'e Engine,
    values: Option<wgpu::Buffer>,
    len: usize,
}

impl<'e> GpuBackend<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            values: None,
            len: 0,
        }
    }

    fn triangles(&self, batch: &ColorBatch) -> Result<Vec<GpuTriangle>, MeshError> {
        pack_triangles(&self.engine.mesh, self.engine.config.resistivity, batch)
    }
}

/// Host mirrors of the triangles in `batch`.
///
/// Degenerate triangles are rejected here, as the kernel would divide by
/// their zero area.
fn pack_triangles(
    mesh: &Mesh<f32>,
    resistivity: f32,
    batch: &ColorBatch,
) -> Result<Vec<GpuTriangle>, MeshError> {
    let elements = mesh.elements();
    let nodes = mesh.nodes();
    batch
        .iter()
        .map(|(e, slots)| {
            let element = &elements[e];
            if slots.len() != 9 {
                return Err(MeshError::UnsupportedElement {
                    element: e,
                    kind: element.kind(),
                });
            }
            let p = [0, 1, 2].map(|i| {
                let n = &nodes[element.nodes()[i]];
                [f64::from(n.x()), f64::from(n.y())]
            });
            if triangle_area(p) <= f64::EPSILON {
                return Err(zero_area(e));
            }
            let mut t = GpuTriangle {
                resistivity,
                ..GpuTriangle::default()
            };
            for (dst, &v) in t.nodes.iter_mut().zip(element.nodes()) {
                *dst = to_u32(v)?;
            }
            for (dst, &s) in t.indices.iter_mut().zip(slots) {
                *dst = to_u32(s)?;
            }
            Ok(t)
        })
        .collect()
}

impl AssemblyBackend for GpuBackend<'_> {
    fn prepare(&mut self, nonzeros: usize) -> Result<(), MeshError> {
        self.values = Some(storage_zeroed::<f32>(
            &self.engine.gpu.device,
            "tomos stiffness values",
            nonzeros,
        ));
        self.len = nonzeros;
        Ok(())
    }

    fn dispatch(&mut self, batch: &ColorBatch) -> Result<(), MeshError> {
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| MeshError::Dispatch("no value array prepared".into()))?;
        let device = &self.engine.gpu.device;
        let triangles = storage_init(device, "tomos colour batch", &self.triangles(batch)?);
        let params = uniform(device, "tomos colour params", Params::new(to_u32(batch.len())?));
        log::debug!("gpu stiffness: colour {} with {} triangles", batch.color, batch.len());
        self.engine.run(
            &self.engine.pipelines.stiffness,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.engine.nodes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: triangles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: values.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: params.as_entire_binding(),
                },
            ],
            batch.len(),
            "tomos stiffness",
        )
    }

    fn read_back(&mut self) -> Result<Vec<f32>, MeshError> {
        let values = self
            .values
            .take()
            .ok_or_else(|| MeshError::Dispatch("no value array prepared".into()))?;
        read_buffer(
            &self.engine.gpu.device,
            &self.engine.gpu.queue,
            &values,
            self.len,
        )
    }
}
