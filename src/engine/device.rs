//! Adapter discovery and device limits.

use std::fmt;

use crate::engine::EngineConfig;
use crate::mesh_error::MeshError;

const KIB: u64 = 1024;
const GIB: u64 = KIB * KIB * KIB;

/// Memory a kernel can count on: per-workgroup shared storage (`local`) and
/// the largest single buffer (`global`), both in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceMemory {
    pub local: u64,
    pub global: u64,
}

impl DeviceMemory {
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        Self {
            local: u64::from(limits.max_compute_workgroup_storage_size),
            global: limits.max_buffer_size,
        }
    }
}

impl fmt::Display for DeviceMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} KiB, {} GiB", self.local / KIB, self.global / GIB)
    }
}

/// An opened device with the adapter facts the engine needs.
pub(crate) struct Gpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub limits: wgpu::Limits,
    pub memory: DeviceMemory,
    pub name: String,
}

/// Pick an adapter per `config` and open a device on it.
pub(crate) fn open(config: &EngineConfig) -> Result<Gpu, MeshError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: config.backends,
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: config.power_preference,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or(MeshError::NoAdapter)?;

    let info = adapter.get_info();
    let limits = adapter.limits();
    let memory = DeviceMemory::from_limits(&limits);
    log::info!(
        "compute adapter: {} ({:?}, {:?}), memory {memory}",
        info.name,
        info.backend,
        info.device_type
    );

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("tomos device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
        },
        None,
    ))
    .map_err(|e| MeshError::DeviceRequest(e.to_string()))?;

    Ok(Gpu {
        device,
        queue,
        limits,
        memory,
        name: info.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_reported_in_kib_and_gib() {
        let memory = DeviceMemory {
            local: 48 * KIB,
            global: 4 * GIB + 17,
        };
        assert_eq!(memory.to_string(), "48 KiB, 4 GiB");
    }

    #[test]
    fn default_limits_convert() {
        let limits = wgpu::Limits::default();
        let memory = DeviceMemory::from_limits(&limits);
        assert_eq!(memory.local, u64::from(limits.max_compute_workgroup_storage_size));
        assert_eq!(memory.global, limits.max_buffer_size);
    }
}
