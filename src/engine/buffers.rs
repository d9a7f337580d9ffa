//! Buffer creation and synchronous read-back.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::mesh_error::MeshError;

/// Host mirror of the kernel's `Params` uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub(crate) struct Params {
    pub count: u32,
    pub _pad: [u32; 3],
}

impl Params {
    pub fn new(count: u32) -> Self {
        Self { count, _pad: [0; 3] }
    }
}

/// Host mirror of the kernel's `Triangle`: corner nodes, material value and
/// the 3x3 slot vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuTriangle {
    pub nodes: [u32; 3],
    pub resistivity: f32,
    pub indices: [u32; 9],
}

/// Zero-length bindings are invalid; every storage buffer holds at least
/// one element.
fn padded<V: Pod>(data: &[V]) -> std::borrow::Cow<'_, [V]> {
    if data.is_empty() {
        std::borrow::Cow::Owned(vec![V::zeroed()])
    } else {
        std::borrow::Cow::Borrowed(data)
    }
}

pub(crate) fn storage_init<V: Pod>(device: &wgpu::Device, label: &str, data: &[V]) -> wgpu::Buffer {
    let data = padded(data);
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice::<V, u8>(&*data),
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST,
    })
}

pub(crate) fn storage_zeroed<V: Pod>(device: &wgpu::Device, label: &str, len: usize) -> wgpu::Buffer {
    storage_init(device, label, &vec![V::zeroed(); len])
}

pub(crate) fn uniform(device: &wgpu::Device, label: &str, params: Params) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Copy the first `len` elements of `buffer` to the host, blocking until the
/// queue has drained.
pub(crate) fn read_buffer<V: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    len: usize,
) -> Result<Vec<V>, MeshError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let size = (len * std::mem::size_of::<V>()) as u64;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tomos::read_buffer staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut enc = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tomos::read_buffer"),
    });
    enc.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(Some(enc.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        sender.send(res).ok();
    });
    device.poll(wgpu::Maintain::Wait);
    pollster::block_on(receiver.receive())
        .ok_or(MeshError::GpuMappingFailed)?
        .map_err(|_| MeshError::GpuMappingFailed)?;
    let data = slice.get_mapped_range();
    let out = bytemuck::cast_slice::<u8, V>(&data).to_vec();
    drop(data);
    staging.unmap();
    Ok(out)
}
