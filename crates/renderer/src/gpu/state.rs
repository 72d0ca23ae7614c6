use anyhow::{anyhow, Result};
use coreshader::program::QUAD_VERTICES;
use coreshader::{BlendConfig, GraphicsBackend, LinkedProgram, TextureImage, UniformBlock};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use crate::types::{AdapterProfile, PreviewConfig};

use super::context::GpuContext;
use super::pipeline::{build_pipeline, PipelineLayouts};
use super::texture::TextureResources;
use super::uniforms::UniformBuffer;

/// A pipeline and its uniform buffer. Dropping it frees both.
pub struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBuffer,
}

/// wgpu implementation of [`GraphicsBackend`] drawing into a window surface.
pub struct WgpuBackend {
    context: GpuContext,
    layouts: PipelineLayouts,
    quad: wgpu::Buffer,
    texture: TextureResources,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    pub(crate) fn new<T>(target: &T, initial_size: (u32, u32), config: &PreviewConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, config.color_space, config.gpu_power)?;
        let layouts = PipelineLayouts::new(&context.device);
        let quad = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad vertices"),
                contents: bytemuck::cast_slice(&QUAD_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let texture = TextureResources::new(
            &context.device,
            &context.queue,
            &layouts.texture_layout,
            &TextureImage::white(),
            context.color_space,
        );
        let [r, g, b, a] = config.clear_color;

        Ok(Self {
            context,
            layouts,
            quad,
            texture,
            clear_color: wgpu::Color { r, g, b, a },
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }
}

impl GraphicsBackend for WgpuBackend {
    type Program = GpuProgram;
    type Error = anyhow::Error;

    fn create_program(
        &mut self,
        program: &LinkedProgram,
        blend: Option<BlendConfig>,
    ) -> Result<GpuProgram> {
        let pipeline = build_pipeline(
            &self.context.device,
            &self.layouts,
            program,
            blend,
            self.context.surface_format,
        )?;
        let uniforms = UniformBuffer::new(
            &self.context.device,
            &self.layouts.uniform_layout,
            u64::from(program.interface.uniforms.size()),
        );
        tracing::debug!(
            uniform_bytes = program.interface.uniforms.size(),
            attributes = program.interface.attributes.len(),
            blend = blend.is_some(),
            "created GPU program"
        );
        Ok(GpuProgram { pipeline, uniforms })
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<()> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            return Err(anyhow!(
                "texture payload is {} bytes, expected {expected} for {}x{}",
                image.pixels.len(),
                image.width,
                image.height
            ));
        }
        let max = self.context.adapter_profile.max_texture_dimension;
        if image.width > max || image.height > max {
            return Err(anyhow!(
                "texture is {}x{}, GPU limit is {max}",
                image.width,
                image.height
            ));
        }
        self.texture.replace(
            &self.context.device,
            &self.context.queue,
            &self.layouts.texture_layout,
            image,
        );
        Ok(())
    }

    fn resize(&mut self, size: (u32, u32)) {
        self.context.resize(size);
    }

    fn draw(&mut self, program: &GpuProgram, uniforms: &UniformBlock) -> Result<()> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout; retrying next frame");
                return Ok(());
            }
            Err(err) => return Err(anyhow!("failed to acquire surface texture: {err}")),
        };

        program.uniforms.sync(&self.context.queue, uniforms);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, program.uniforms.bind_group(), &[]);
            render_pass.set_bind_group(1, self.texture.bind_group(), &[]);
            render_pass.set_vertex_buffer(0, self.quad.slice(..));
            render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
