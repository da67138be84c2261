//! `DeviceContext` implemented on top of wgpu.
//!
//! wgpu records work into command buffers while the device context API is
//! immediate. Each draw is encoded into its own render pass and submitted right
//! away; `queue.write_buffer` calls issued before a submit are applied before
//! that submit executes, so a constant-buffer update between two draws only
//! affects the second one.

use std::collections::HashMap;

use anyhow::{Context, Result};

use super::context::DeviceContext;
use super::frame::{FrameSlot, GpuFrame};
use super::gpu::Gpu;
use super::resource::{
    BindTarget, BufferDesc, BufferId, CullMode, FillMode, PrimitiveTopology, RasterizerDesc,
    ShaderPipelineDesc, VertexFormat, Viewport,
};
use super::surface;

pub(crate) struct ShaderState {
    label: &'static str,
    module: wgpu::ShaderModule,
    vs_entry: &'static str,
    ps_entry: &'static str,
    attributes: Vec<wgpu::VertexAttribute>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    topology: PrimitiveTopology,
    stride: u32,
    rasterizer: RasterizerDesc,
}

#[derive(Debug, Copy, Clone)]
struct VertexBinding {
    buffer: BufferId,
    stride: u32,
    offset: u32,
}

/// Bound state and per-frame bookkeeping of the wgpu device context.
#[derive(Default)]
pub(crate) struct BackendState {
    rasterizer: RasterizerDesc,
    shader: Option<ShaderState>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    constant_buffer: Option<BufferId>,
    bind_group: Option<wgpu::BindGroup>,

    vertex_buffer: Option<VertexBinding>,
    topology: Option<PrimitiveTopology>,
    viewport: Option<Viewport>,

    pub(super) frame: FrameSlot<GpuFrame>,
    pending_clear: Option<wgpu::Color>,
}

fn buffer_usages(desc: &BufferDesc) -> wgpu::BufferUsages {
    let bind = match desc.bind {
        BindTarget::Vertex => wgpu::BufferUsages::VERTEX,
        BindTarget::Constant => wgpu::BufferUsages::UNIFORM,
    };
    // Both CPU write paths go through `queue.write_buffer`.
    bind | wgpu::BufferUsages::COPY_DST
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
    }
}

fn primitive_state(key: PipelineKey) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: primitive_topology(key.topology),
        strip_index_format: None,
        // Clockwise front faces, the D3D rasterizer default.
        front_face: wgpu::FrontFace::Cw,
        cull_mode: match key.rasterizer.cull {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        },
        polygon_mode: match key.rasterizer.fill {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wireframe => wgpu::PolygonMode::Line,
        },
        unclipped_depth: false,
        conservative: false,
    }
}

/// Pads `data` to the copy alignment wgpu requires for buffer writes.
fn aligned_bytes(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let len = wgpu::util::align_to(data.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT) as usize;
    if len == data.len() {
        std::borrow::Cow::Borrowed(data)
    } else {
        let mut padded = data.to_vec();
        padded.resize(len, 0);
        std::borrow::Cow::Owned(padded)
    }
}

impl Gpu<'_> {
    fn rebuild_bind_group(&mut self) -> Result<()> {
        self.backend.bind_group = None;

        let (Some(shader), Some(id)) = (self.backend.shader.as_ref(), self.backend.constant_buffer)
        else {
            return Ok(());
        };
        let (buffer, _) = self.buffers.get(id)?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("zeus vs constants"),
            layout: &shader.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.backend.bind_group = Some(bind_group);
        Ok(())
    }

    fn pipeline_key(&self) -> Result<PipelineKey> {
        let binding = self
            .backend
            .vertex_buffer
            .context("draw without a vertex buffer")?;
        let topology = self
            .backend
            .topology
            .context("draw without a primitive topology")?;

        Ok(PipelineKey {
            topology,
            stride: binding.stride,
            rasterizer: self.backend.rasterizer,
        })
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<()> {
        if self.backend.pipelines.contains_key(&key) {
            return Ok(());
        }

        let shader = self
            .backend
            .shader
            .as_ref()
            .context("draw without a shader pipeline")?;

        let vertex_layout = [wgpu::VertexBufferLayout {
            array_stride: key.stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &shader.attributes,
        }];

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(shader.label),
            layout: Some(&shader.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader.module,
                entry_point: Some(shader.vs_entry),
                compilation_options: Default::default(),
                buffers: &vertex_layout,
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader.module,
                entry_point: Some(shader.ps_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: primitive_state(key),
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },

            multiview_mask: None,
            cache: None,
        });

        log::debug!("created render pipeline for {key:?}");
        self.backend.pipelines.insert(key, pipeline);
        Ok(())
    }

    /// Encodes and submits a pass that only clears the back buffer.
    fn submit_clear(&mut self, color: wgpu::Color) -> Result<()> {
        let frame = self.backend.frame.get().context("no back buffer acquired")?;
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&frame.view)),
            None => (&frame.view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zeus clear encoder"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("zeus clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl DeviceContext for Gpu<'_> {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        desc.validate()?;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: wgpu::util::align_to(desc.byte_width as u64, wgpu::COPY_BUFFER_ALIGNMENT),
            usage: buffer_usages(desc),
            mapped_at_creation: false,
        });

        let id = self.buffers.insert(buffer, *desc);
        log::debug!("created buffer `{}` #{} ({} bytes)", desc.label, id.raw(), desc.byte_width);
        Ok(id)
    }

    fn map_write_discard(
        &mut self,
        buffer: BufferId,
        fill: &mut dyn FnMut(&mut [u8]),
    ) -> Result<()> {
        let (target, desc) = self.buffers.get(buffer)?;
        desc.ensure_mappable()?;

        let mut staging = vec![0u8; desc.byte_width as usize];
        fill(&mut staging);
        self.queue.write_buffer(target, 0, &aligned_bytes(&staging));
        Ok(())
    }

    fn update_subresource(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let (target, desc) = self.buffers.get(buffer)?;
        desc.ensure_updatable(data.len())?;

        self.queue.write_buffer(target, 0, &aligned_bytes(data));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) -> Result<()> {
        let (released, desc) = self.buffers.remove(buffer)?;
        released.destroy();

        if self.backend.constant_buffer == Some(buffer) {
            self.backend.constant_buffer = None;
            self.backend.bind_group = None;
        }
        if self.backend.vertex_buffer.is_some_and(|v| v.buffer == buffer) {
            self.backend.vertex_buffer = None;
        }
        log::debug!("released buffer `{}` #{}", desc.label, buffer.raw());
        Ok(())
    }

    fn set_rasterizer_state(&mut self, desc: RasterizerDesc) -> Result<()> {
        if desc.fill == FillMode::Wireframe {
            anyhow::ensure!(
                self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE),
                "wireframe fill requires the POLYGON_MODE_LINE feature"
            );
        }
        self.backend.rasterizer = desc;
        Ok(())
    }

    fn set_shader_pipeline(&mut self, desc: &ShaderPipelineDesc) -> Result<()> {
        anyhow::ensure!(
            !desc.input_layout.is_empty(),
            "shader `{}` has an empty input layout",
            desc.label
        );

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let attributes = desc
            .input_layout
            .iter()
            .enumerate()
            .map(|(location, element)| wgpu::VertexAttribute {
                format: vertex_format(element.format),
                offset: element.offset as u64,
                shader_location: location as u32,
            })
            .collect();

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("zeus vs constants bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let pipeline_layout =
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("zeus pipeline layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

        self.backend.shader = Some(ShaderState {
            label: desc.label,
            module,
            vs_entry: desc.vs_entry,
            ps_entry: desc.ps_entry,
            attributes,
            bind_group_layout,
            pipeline_layout,
        });
        self.backend.pipelines.clear();
        self.rebuild_bind_group()?;

        log::debug!("shader pipeline `{}` bound", desc.label);
        Ok(())
    }

    fn set_vs_constant_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        anyhow::ensure!(slot == 0, "only vertex constant slot 0 is supported (got {slot})");
        let (_, desc) = self.buffers.get(buffer)?;
        anyhow::ensure!(
            desc.bind == BindTarget::Constant,
            "buffer `{}` is not a constant buffer",
            desc.label
        );
        anyhow::ensure!(
            self.backend.shader.is_some(),
            "bind a shader pipeline before its constant buffer"
        );

        self.backend.constant_buffer = Some(buffer);
        self.rebuild_bind_group()
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.backend.viewport = Some(viewport);
    }

    fn set_vertex_buffer(&mut self, _slot: u32, buffer: BufferId, stride: u32, offset: u32) {
        self.backend.vertex_buffer = Some(VertexBinding { buffer, stride, offset });
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.backend.topology = Some(topology);
    }

    fn clear_render_target(&mut self, color: [f32; 4]) -> Result<()> {
        if !self.ensure_frame()? {
            return Ok(());
        }
        let [r, g, b, a] = color.map(f64::from);
        self.backend.pending_clear = Some(wgpu::Color { r, g, b, a });
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) -> Result<()> {
        let key = self.pipeline_key()?;
        self.ensure_pipeline(key)?;
        if !self.ensure_frame()? {
            return Ok(());
        }

        let viewport = match self.backend.viewport {
            Some(vp) => Some(
                surface::clamp_viewport(vp, self.size).context("viewport lies outside the back buffer")?,
            ),
            None => None,
        };
        let load = match self.backend.pending_clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let frame = self.backend.frame.get().context("no back buffer acquired")?;
        let pipeline = self
            .backend
            .pipelines
            .get(&key)
            .context("render pipeline missing")?;
        let bind_group = self
            .backend
            .bind_group
            .as_ref()
            .context("draw without a vertex constant buffer")?;
        let binding = self
            .backend
            .vertex_buffer
            .context("draw without a vertex buffer")?;
        let (vertex_buffer, desc) = self.buffers.get(binding.buffer)?;

        let end = binding.offset as u64
            + (start_vertex as u64 + vertex_count as u64) * binding.stride as u64;
        anyhow::ensure!(
            end <= desc.byte_width as u64,
            "draw of {vertex_count} vertices overruns buffer `{}`",
            desc.label
        );

        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&frame.view)),
            None => (&frame.view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zeus draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("zeus draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(vp) = viewport {
                rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, 0.0, 1.0);
            }
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.set_vertex_buffer(0, vertex_buffer.slice(binding.offset as u64..));
            rpass.draw(start_vertex..start_vertex + vertex_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        // The clear was folded into this pass.
        self.backend.pending_clear = None;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if self.backend.frame.is_skipped() {
            self.backend.frame.finish();
            self.backend.pending_clear = None;
            return Ok(());
        }

        match self.ensure_frame() {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                // Nothing was drawn; the next frame starts from scratch.
                self.backend.frame.finish();
                self.backend.pending_clear = None;
                return Err(e);
            }
        }
        if let Some(color) = self.backend.pending_clear.take() {
            self.submit_clear(color)?;
        }

        let frame = self.backend.frame.finish().context("no back buffer acquired")?;
        self.present_frame(frame);
        Ok(())
    }
}
