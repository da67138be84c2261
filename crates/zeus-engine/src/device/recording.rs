use anyhow::Result;

use super::context::DeviceContext;
use super::resource::{
    BindTarget, BufferDesc, BufferId, PrimitiveTopology, RasterizerDesc, ResourceTable,
    ShaderPipelineDesc, Viewport,
};

/// A command observed by [`RecordingContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer { buffer: BufferId, desc: BufferDesc },
    MapWriteDiscard { buffer: BufferId, data: Vec<u8> },
    UpdateSubresource { buffer: BufferId, data: Vec<u8> },
    ReleaseBuffer { buffer: BufferId },
    SetRasterizerState(RasterizerDesc),
    SetShaderPipeline { label: &'static str },
    SetVsConstantBuffer { slot: u32, buffer: BufferId },
    SetViewport(Viewport),
    SetVertexBuffer { slot: u32, buffer: BufferId, stride: u32, offset: u32 },
    SetPrimitiveTopology(PrimitiveTopology),
    ClearRenderTarget([f32; 4]),
    Draw { vertex_count: u32, start_vertex: u32 },
    Present,
}

#[derive(Debug, Copy, Clone)]
struct VertexBinding {
    buffer: BufferId,
    stride: u32,
    offset: u32,
}

/// In-memory device context.
///
/// Records every command, keeps CPU copies of buffer contents, and enforces the
/// same binding rules a GPU backend would: a draw needs a shader pipeline, a
/// bound vertex buffer large enough for the requested range, and a topology.
///
/// Failure injection makes setup and per-frame error paths reachable without a GPU.
#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: Vec<DeviceCommand>,
    buffers: ResourceTable<Vec<u8>>,
    created: usize,

    shader: Option<&'static str>,
    rasterizer: Option<RasterizerDesc>,
    constant_buffers: Vec<(u32, BufferId)>,
    vertex_buffer: Option<VertexBinding>,
    topology: Option<PrimitiveTopology>,

    fail_creation_at: Option<usize>,
    failing_draws: u32,
    failing_updates: u32,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `index`-th (0-based) `create_buffer` call fail.
    pub fn fail_buffer_creation_at(mut self, index: usize) -> Self {
        self.fail_creation_at = Some(index);
        self
    }

    /// Makes the next `count` draws fail.
    pub fn fail_next_draws(&mut self, count: u32) {
        self.failing_draws = count;
    }

    /// Makes the next `count` `update_subresource` calls fail.
    pub fn fail_next_updates(&mut self, count: u32) {
        self.failing_updates = count;
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drops recorded commands; resources and bindings are kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Current contents of a live buffer.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer).ok().map(|(data, _)| data.as_slice())
    }

    pub fn buffer_desc(&self, buffer: BufferId) -> Option<BufferDesc> {
        self.buffers.get(buffer).ok().map(|(_, desc)| *desc)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn rasterizer_state(&self) -> Option<RasterizerDesc> {
        self.rasterizer
    }

    /// Buffer bound to the vertex stage at `slot`.
    pub fn vs_constant_buffer(&self, slot: u32) -> Option<BufferId> {
        self.constant_buffers
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, b)| *b)
    }

    pub fn draw_calls(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Draw { vertex_count, .. } => Some(*vertex_count),
                _ => None,
            })
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Present))
            .count()
    }

    fn validate_draw(&self, vertex_count: u32, start_vertex: u32) -> Result<()> {
        anyhow::ensure!(self.shader.is_some(), "draw without a shader pipeline");
        anyhow::ensure!(self.topology.is_some(), "draw without a primitive topology");

        let binding = self
            .vertex_buffer
            .ok_or_else(|| anyhow::anyhow!("draw without a vertex buffer"))?;
        let (_, desc) = self.buffers.get(binding.buffer)?;
        anyhow::ensure!(desc.bind == BindTarget::Vertex, "buffer `{}` is not a vertex buffer", desc.label);

        let end = binding.offset as u64
            + (start_vertex as u64 + vertex_count as u64) * binding.stride as u64;
        anyhow::ensure!(
            end <= desc.byte_width as u64,
            "draw reads {} bytes past the end of `{}`",
            end - desc.byte_width as u64,
            desc.label
        );
        Ok(())
    }
}

impl DeviceContext for RecordingContext {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        let index = self.created;
        self.created += 1;
        if self.fail_creation_at == Some(index) {
            anyhow::bail!("injected failure creating buffer `{}`", desc.label);
        }
        desc.validate()?;

        let buffer = self.buffers.insert(vec![0; desc.byte_width as usize], *desc);
        self.commands.push(DeviceCommand::CreateBuffer { buffer, desc: *desc });
        Ok(buffer)
    }

    fn map_write_discard(
        &mut self,
        buffer: BufferId,
        fill: &mut dyn FnMut(&mut [u8]),
    ) -> Result<()> {
        let (data, desc) = self.buffers.get_mut(buffer)?;
        desc.ensure_mappable()?;

        data.fill(0);
        fill(data);
        let data = data.clone();
        self.commands.push(DeviceCommand::MapWriteDiscard { buffer, data });
        Ok(())
    }

    fn update_subresource(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        if self.failing_updates > 0 {
            self.failing_updates -= 1;
            anyhow::bail!("injected update failure");
        }
        let (contents, desc) = self.buffers.get_mut(buffer)?;
        desc.ensure_updatable(data.len())?;

        contents[..data.len()].copy_from_slice(data);
        self.commands.push(DeviceCommand::UpdateSubresource { buffer, data: data.to_vec() });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) -> Result<()> {
        self.buffers.remove(buffer)?;
        self.constant_buffers.retain(|(_, b)| *b != buffer);
        if self.vertex_buffer.is_some_and(|v| v.buffer == buffer) {
            self.vertex_buffer = None;
        }
        self.commands.push(DeviceCommand::ReleaseBuffer { buffer });
        Ok(())
    }

    fn set_rasterizer_state(&mut self, desc: RasterizerDesc) -> Result<()> {
        self.rasterizer = Some(desc);
        self.commands.push(DeviceCommand::SetRasterizerState(desc));
        Ok(())
    }

    fn set_shader_pipeline(&mut self, desc: &ShaderPipelineDesc) -> Result<()> {
        anyhow::ensure!(!desc.input_layout.is_empty(), "shader `{}` has an empty input layout", desc.label);
        self.shader = Some(desc.label);
        self.commands.push(DeviceCommand::SetShaderPipeline { label: desc.label });
        Ok(())
    }

    fn set_vs_constant_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        let (_, desc) = self.buffers.get(buffer)?;
        anyhow::ensure!(desc.bind == BindTarget::Constant, "buffer `{}` is not a constant buffer", desc.label);

        self.constant_buffers.retain(|(s, _)| *s != slot);
        self.constant_buffers.push((slot, buffer));
        self.commands.push(DeviceCommand::SetVsConstantBuffer { slot, buffer });
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, stride: u32, offset: u32) {
        self.vertex_buffer = Some(VertexBinding { buffer, stride, offset });
        self.commands.push(DeviceCommand::SetVertexBuffer { slot, buffer, stride, offset });
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = Some(topology);
        self.commands.push(DeviceCommand::SetPrimitiveTopology(topology));
    }

    fn clear_render_target(&mut self, color: [f32; 4]) -> Result<()> {
        self.commands.push(DeviceCommand::ClearRenderTarget(color));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) -> Result<()> {
        if self.failing_draws > 0 {
            self.failing_draws -= 1;
            anyhow::bail!("injected draw failure");
        }
        self.validate_draw(vertex_count, start_vertex)?;
        self.commands.push(DeviceCommand::Draw { vertex_count, start_vertex });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.commands.push(DeviceCommand::Present);
        Ok(())
    }
}
