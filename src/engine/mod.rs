//! wgpu compute engine for per-triangle kernels and colour-scheduled
//! stiffness assembly.
//!
//! The kernel program is WGSL loaded from disk at construction and must
//! export the entry points `area`, `centroid`, `normal` and `stiffness`
//! (see `shaders/tomos.wgsl`). Every dispatch blocks until the device has
//! drained it, so colour batches are strictly ordered.

mod backend;
mod buffers;
mod device;

use std::path::Path;

use bytemuck::Pod;
use num_traits::AsPrimitive;

pub use backend::GpuBackend;
pub use device::DeviceMemory;

use crate::algs::assembly::{AssemblyPlan, assemble_plan};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementType;
use crate::topology::mesh::{Mesh, Node};
use buffers::{Params, read_buffer, storage_init, storage_zeroed, uniform};
use device::Gpu;

/// Entry points the kernel program must export.
pub const ENTRY_POINTS: [&str; 4] = ["area", "centroid", "normal", "stiffness"];

/// Adapter selection and kernel parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub power_preference: wgpu::PowerPreference,
    pub backends: wgpu::Backends,
    /// Invocations per workgroup, substituted into the kernel program.
    pub workgroup_size: u32,
    /// Material coefficient applied to every triangle in `stiffness`.
    pub resistivity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            backends: wgpu::Backends::all(),
            workgroup_size: 64,
            resistivity: 1.0,
        }
    }
}

/// Run `f` inside validation and out-of-memory error scopes.
fn scoped<R>(
    device: &wgpu::Device,
    wrap: fn(String) -> MeshError,
    f: impl FnOnce() -> R,
) -> Result<R, MeshError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let out = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let oom = pollster::block_on(device.pop_error_scope());
    match validation.or(oom) {
        Some(err) => Err(wrap(err.to_string())),
        None => Ok(out),
    }
}

fn to_u32(v: usize) -> Result<u32, MeshError> {
    u32::try_from(v).map_err(|_| MeshError::IndexOverflow(v))
}

struct Pipelines {
    area: wgpu::ComputePipeline,
    centroid: wgpu::ComputePipeline,
    normal: wgpu::ComputePipeline,
    stiffness: wgpu::ComputePipeline,
}

/// A device bound to one triangle mesh.
pub struct Engine {
    gpu: Gpu,
    config: EngineConfig,
    mesh: Mesh<f32>,
    nodes: wgpu::Buffer,
    elements: wgpu::Buffer,
    pipelines: Pipelines,
}

impl Engine {
    /// Open a device, upload `mesh` and build the pipelines of the kernel
    /// program at `kernel_path`.
    ///
    /// Only 3-node triangles can be evaluated; any other element kind is
    /// rejected before a device is requested.
    pub fn new<T>(
        kernel_path: impl AsRef<Path>,
        mesh: &Mesh<T>,
        config: EngineConfig,
    ) -> Result<Self, MeshError>
    where
        T: AsPrimitive<f32>,
    {
        if let Some((element, e)) = mesh
            .elements()
            .iter()
            .enumerate()
            .find(|(_, e)| e.kind() != ElementType::Triangle3)
        {
            return Err(MeshError::UnsupportedElement {
                element,
                kind: e.kind(),
            });
        }
        if config.workgroup_size == 0 {
            return Err(MeshError::KernelBuild("workgroup size must be positive".into()));
        }
        let path = kernel_path.as_ref();
        let program = std::fs::read_to_string(path).map_err(|e| MeshError::KernelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mesh: Mesh<f32> = mesh.cast();
        let points: Vec<[f32; 4]> = mesh
            .nodes()
            .iter()
            .map(|n| [n.x(), n.y(), n.z(), 0.0])
            .collect();
        let mut corners = Vec::with_capacity(3 * mesh.element_count());
        for element in mesh.elements() {
            for &v in element.nodes() {
                corners.push(to_u32(v)?);
            }
        }

        let gpu = device::open(&config)?;
        if config.workgroup_size > gpu.limits.max_compute_workgroup_size_x {
            return Err(MeshError::KernelBuild(format!(
                "workgroup size {} exceeds the device limit {}",
                config.workgroup_size, gpu.limits.max_compute_workgroup_size_x
            )));
        }
        let nodes = storage_init(&gpu.device, "tomos nodes", &points);
        let elements = storage_init(&gpu.device, "tomos elements", &corners);

        let source = format!(
            "const WORKGROUP_SIZE: u32 = {}u;\n{program}",
            config.workgroup_size
        );
        let pipelines = scoped(&gpu.device, MeshError::KernelBuild, || {
            let module = gpu
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("tomos kernels"),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                });
            let build = |entry_point: &str| {
                gpu.device
                    .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                        label: Some(entry_point),
                        layout: None,
                        module: &module,
                        entry_point,
                    })
            };
            Pipelines {
                area: build("area"),
                centroid: build("centroid"),
                normal: build("normal"),
                stiffness: build("stiffness"),
            }
        })?;
        log::info!(
            "engine ready on {}: {} nodes, {} triangles, kernel {path:?}",
            gpu.name,
            mesh.node_count(),
            mesh.element_count()
        );

        Ok(Self {
            gpu,
            config,
            mesh,
            nodes,
            elements,
            pipelines,
        })
    }

    #[inline]
    pub fn memory(&self) -> DeviceMemory {
        self.gpu.memory
    }

    #[inline]
    pub fn adapter_name(&self) -> &str {
        &self.gpu.name
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh<f32> {
        &self.mesh
    }

    /// Area of every triangle.
    pub fn area(&self) -> Result<Vec<f32>, MeshError> {
        self.per_element::<f32>(&self.pipelines.area, 2, "tomos area")
    }

    /// Centroid of every triangle.
    pub fn centroid(&self) -> Result<Vec<Node<f32>>, MeshError> {
        self.per_element_vectors(&self.pipelines.centroid, "tomos centroid")
    }

    /// Unit normal of every triangle, oriented by its node order.
    pub fn normal(&self) -> Result<Vec<Node<f32>>, MeshError> {
        self.per_element_vectors(&self.pipelines.normal, "tomos normal")
    }

    /// Assembled stiffness, one value per structural non-zero.
    pub fn stiffness(&self) -> Result<Vec<f32>, MeshError> {
        let plan = AssemblyPlan::new(&self.mesh)?;
        let mut backend = GpuBackend::new(self);
        assemble_plan(&plan, &mut backend)
    }

    fn per_element_vectors(
        &self,
        pipeline: &wgpu::ComputePipeline,
        label: &str,
    ) -> Result<Vec<Node<f32>>, MeshError> {
        Ok(self
            .per_element::<[f32; 4]>(pipeline, 3, label)?
            .into_iter()
            .map(|[x, y, z, _]| Node::new(x, y, z))
            .collect())
    }

    fn per_element<V: Pod>(
        &self,
        pipeline: &wgpu::ComputePipeline,
        binding: u32,
        label: &str,
    ) -> Result<Vec<V>, MeshError> {
        let count = self.mesh.element_count();
        let out = storage_zeroed::<V>(&self.gpu.device, label, count);
        let params = uniform(&self.gpu.device, label, Params::new(to_u32(count)?));
        self.run(
            pipeline,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.nodes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.elements.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding,
                    resource: out.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: params.as_entire_binding(),
                },
            ],
            count,
            label,
        )?;
        read_buffer(&self.gpu.device, &self.gpu.queue, &out, count)
    }

    fn workgroups(&self, count: usize) -> Result<u32, MeshError> {
        let groups = count.div_ceil(self.config.workgroup_size as usize);
        u32::try_from(groups)
            .ok()
            .filter(|&g| g <= self.gpu.limits.max_compute_workgroups_per_dimension)
            .ok_or(MeshError::DispatchTooLarge(count))
    }

    /// Dispatch `count` invocations of `pipeline` and wait for completion.
    fn run(
        &self,
        pipeline: &wgpu::ComputePipeline,
        entries: &[wgpu::BindGroupEntry<'_>],
        count: usize,
        label: &str,
    ) -> Result<(), MeshError> {
        if count == 0 {
            return Ok(());
        }
        let groups = self.workgroups(count)?;
        let device = &self.gpu.device;
        scoped(device, MeshError::Dispatch, || {
            let layout = pipeline.get_bind_group_layout(0);
            let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layout,
                entries,
            });
            let mut enc = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            });
            {
                let mut pass = enc.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(label),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind, &[]);
                pass.dispatch_workgroups(groups, 1, 1);
            }
            self.gpu.queue.submit(Some(enc.finish()));
            device.poll(wgpu::Maintain::Wait);
        })
    }
}
