use coreshader::UniformBlock;

/// Smallest buffer bound to group 0, used when a program has no uniforms.
const MIN_UNIFORM_BUFFER: u64 = 16;

/// Per-program uniform buffer mirroring a [`UniformBlock`].
pub(crate) struct UniformBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBuffer {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, block_size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform buffer"),
            size: block_size.max(MIN_UNIFORM_BUFFER),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Uploads the block when it changed since the last draw.
    pub fn sync(&self, queue: &wgpu::Queue, block: &UniformBlock) {
        if block.is_empty() || !block.is_dirty() {
            return;
        }
        queue.write_buffer(&self.buffer, 0, block.as_bytes());
    }
}
