use anyhow::Result;

use super::resource::{
    BufferDesc, BufferId, PrimitiveTopology, RasterizerDesc, ShaderPipelineDesc, Viewport,
};

/// Immediate-mode device capability consumed by renderers.
///
/// State set through the `set_*` methods persists until changed. Commands are
/// observed by the GPU in call order: a buffer update issued between two draws
/// is visible to the second draw only.
///
/// Setup methods (`create_buffer`, `set_shader_pipeline`, ...) fail when the
/// resource cannot be created. Per-frame methods (`clear_render_target`,
/// `update_subresource`, `draw`, `present`) fail for transient reasons too;
/// callers are expected to log and keep going.
pub trait DeviceContext {
    /// Allocates a buffer described by `desc`.
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId>;

    /// Maps `buffer` with write-discard semantics, lets `fill` write the whole
    /// mapped range, then unmaps.
    ///
    /// The slice passed to `fill` is exactly `byte_width` long; previous
    /// contents are discarded.
    fn map_write_discard(&mut self, buffer: BufferId, fill: &mut dyn FnMut(&mut [u8]))
        -> Result<()>;

    /// Replaces the contents of a default-usage buffer starting at offset 0.
    fn update_subresource(&mut self, buffer: BufferId, data: &[u8]) -> Result<()>;

    /// Releases `buffer`. Each handle must be released exactly once.
    fn release_buffer(&mut self, buffer: BufferId) -> Result<()>;

    fn set_rasterizer_state(&mut self, desc: RasterizerDesc) -> Result<()>;

    /// Compiles and binds the vertex and pixel stages along with their input layout.
    fn set_shader_pipeline(&mut self, desc: &ShaderPipelineDesc) -> Result<()>;

    /// Binds a constant buffer to the vertex stage.
    fn set_vs_constant_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId, stride: u32, offset: u32);

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Clears the back buffer to `color` (straight RGBA).
    fn clear_render_target(&mut self, color: [f32; 4]) -> Result<()>;

    /// Draws `vertex_count` vertices starting at `start_vertex` from the bound
    /// vertex buffer.
    fn draw(&mut self, vertex_count: u32, start_vertex: u32) -> Result<()>;

    /// Presents the back buffer.
    fn present(&mut self) -> Result<()>;
}
