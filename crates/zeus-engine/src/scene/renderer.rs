use anyhow::{Context, Result};

use crate::device::{BufferDesc, BufferId, DeviceContext, PrimitiveTopology, ShaderPipelineDesc};

use super::camera::CameraMatrices;
use super::config::SceneConfig;
use super::primitive::{Primitive, PrimitiveDesc, TransformUniform};
use super::vertex::Vertex;

/// Vertex + pixel stage shared by every primitive.
pub const SCENE_SHADER: ShaderPipelineDesc = ShaderPipelineDesc {
    label: "scene",
    source: include_str!("shaders/scene.wgsl"),
    vs_entry: "vs_main",
    ps_entry: "fs_main",
    input_layout: &Vertex::LAYOUT,
};

/// Constant-buffer slot the transform is bound to.
pub const TRANSFORM_SLOT: u32 = 0;

/// Draws a list of spinning primitives through a [`DeviceContext`].
///
/// Owns its buffer handles; the context owns the buffers themselves. Call
/// [`SceneRenderer::release`] with the same context before dropping the
/// context.
#[derive(Debug)]
pub struct SceneRenderer {
    matrices: CameraMatrices,
    clear_color: [f32; 4],
    constant_buffer: BufferId,
    primitives: Vec<Primitive>,
}

impl SceneRenderer {
    /// Configures fixed pipeline state and uploads every primitive.
    ///
    /// On failure, buffers created so far are released and the error is returned.
    pub fn new<D: DeviceContext + ?Sized>(ctx: &mut D, config: SceneConfig) -> Result<Self> {
        anyhow::ensure!(
            config.viewport.is_valid(),
            "invalid scene viewport {:?}",
            config.viewport
        );
        anyhow::ensure!(
            config.time_step.is_finite() && config.time_step >= 0.0,
            "invalid animation time step {}",
            config.time_step
        );

        let mut created = Vec::new();
        match Self::setup(ctx, &config, &mut created) {
            Ok((constant_buffer, primitives)) => {
                log::info!(
                    "scene ready: {} primitives, viewport {}x{}",
                    primitives.len(),
                    config.viewport.width,
                    config.viewport.height
                );
                Ok(Self {
                    matrices: config.camera.matrices(config.viewport.aspect()),
                    clear_color: config.clear_color,
                    constant_buffer,
                    primitives,
                })
            }
            Err(e) => {
                for buffer in created.into_iter().rev() {
                    if let Err(release_err) = ctx.release_buffer(buffer) {
                        log::warn!("failed to release buffer during setup cleanup: {release_err:#}");
                    }
                }
                Err(e)
            }
        }
    }

    fn setup<D: DeviceContext + ?Sized>(
        ctx: &mut D,
        config: &SceneConfig,
        created: &mut Vec<BufferId>,
    ) -> Result<(BufferId, Vec<Primitive>)> {
        ctx.set_viewport(config.viewport);
        ctx.set_rasterizer_state(config.rasterizer)
            .context("failed to set rasterizer state")?;
        ctx.set_shader_pipeline(&SCENE_SHADER)
            .context("failed to create scene shader pipeline")?;

        let constant_buffer = ctx
            .create_buffer(&BufferDesc::constant("transform", TransformUniform::SIZE))
            .context("failed to create transform constant buffer")?;
        created.push(constant_buffer);
        ctx.set_vs_constant_buffer(TRANSFORM_SLOT, constant_buffer)
            .context("failed to bind transform constant buffer")?;

        let mut primitives = Vec::with_capacity(config.primitives.len());
        for desc in &config.primitives {
            let buffer = upload(ctx, desc, created)?;
            primitives.push(Primitive::new(desc, buffer, config.time_step));
        }

        Ok((constant_buffer, primitives))
    }

    /// Clears, draws every primitive in order, then presents.
    ///
    /// Each primitive advances its own animation clock by one step. Device
    /// failures are logged and the frame goes on; a primitive whose transform
    /// could not be uploaded is skipped for this frame.
    pub fn render_frame<D: DeviceContext + ?Sized>(&mut self, ctx: &mut D) {
        if let Err(e) = ctx.clear_render_target(self.clear_color) {
            log::warn!("clear failed: {e:#}");
        }

        for primitive in &mut self.primitives {
            primitive.animation.advance();
            let uniform = TransformUniform::from(primitive.final_transform(&self.matrices));

            if let Err(e) = ctx.update_subresource(self.constant_buffer, bytemuck::bytes_of(&uniform)) {
                log::warn!("{}: transform upload failed: {e:#}", primitive.label());
                continue;
            }

            ctx.set_vertex_buffer(0, primitive.vertex_buffer(), Vertex::STRIDE, 0);
            ctx.set_primitive_topology(PrimitiveTopology::TriangleList);
            if let Err(e) = ctx.draw(primitive.vertex_count(), 0) {
                log::warn!("{}: draw failed: {e:#}", primitive.label());
            }
        }

        if let Err(e) = ctx.present() {
            log::warn!("present failed: {e:#}");
        }
    }

    /// Releases every buffer this renderer created.
    pub fn release<D: DeviceContext + ?Sized>(self, ctx: &mut D) {
        let buffers = self
            .primitives
            .iter()
            .map(Primitive::vertex_buffer)
            .chain(std::iter::once(self.constant_buffer));
        for buffer in buffers {
            if let Err(e) = ctx.release_buffer(buffer) {
                log::warn!("failed to release buffer #{}: {e:#}", buffer.raw());
            }
        }
        log::debug!("scene released");
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut [Primitive] {
        &mut self.primitives
    }

    /// View and projection used for every primitive.
    pub fn camera_matrices(&self) -> &CameraMatrices {
        &self.matrices
    }

    pub fn constant_buffer(&self) -> BufferId {
        self.constant_buffer
    }
}

fn upload<D: DeviceContext + ?Sized>(
    ctx: &mut D,
    desc: &PrimitiveDesc,
    created: &mut Vec<BufferId>,
) -> Result<BufferId> {
    anyhow::ensure!(!desc.vertices.is_empty(), "primitive `{}` has no vertices", desc.label);

    let bytes: &[u8] = bytemuck::cast_slice(desc.vertices);
    let width = u32::try_from(bytes.len())
        .with_context(|| format!("primitive `{}` is too large", desc.label))?;

    let buffer = ctx
        .create_buffer(&BufferDesc::vertex(desc.label, width))
        .with_context(|| format!("failed to create vertex buffer for `{}`", desc.label))?;
    created.push(buffer);

    ctx.map_write_discard(buffer, &mut |dst: &mut [u8]| dst.copy_from_slice(bytes))
        .with_context(|| format!("failed to upload vertices for `{}`", desc.label))?;

    log::debug!("{}: uploaded {} vertices ({width} bytes)", desc.label, desc.vertices.len());
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CullMode, DeviceCommand, FillMode, RecordingContext};
    use crate::scene::reference::{self, product, RowMat};
    use crate::scene::vertex::{RECTANGLE_VERTICES, TRIANGLE_VERTICES};

    fn scene(ctx: &mut RecordingContext) -> SceneRenderer {
        SceneRenderer::new(ctx, SceneConfig::default()).unwrap()
    }

    fn reference_view_projection() -> [RowMat; 2] {
        [
            reference::look_at_lh([0.0, 0.0, 4.0], [0.0; 3], [0.0, 1.0, 0.0]),
            reference::perspective_fov_lh(45f32.to_radians(), 800.0 / 600.0, 1.0, 100.0),
        ]
    }

    fn expected_triangle(t: f64) -> RowMat {
        let angle = (t + std::f64::consts::PI) as f32;
        let [view, projection] = reference_view_projection();
        product(&[
            reference::rotation_y(angle),
            reference::rotation_z(angle),
            reference::translation(1.5, 0.5, 0.0),
            view,
            projection,
        ])
    }

    fn expected_rectangle(t: f64) -> RowMat {
        let angle = (t + std::f64::consts::PI) as f32;
        let [view, projection] = reference_view_projection();
        product(&[
            reference::rotation_y(angle),
            reference::translation(-1.5, -0.5, 0.0),
            view,
            projection,
        ])
    }

    fn uploaded_transforms(ctx: &RecordingContext) -> Vec<[[f32; 4]; 4]> {
        ctx.commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::UpdateSubresource { data, .. } => {
                    Some(bytemuck::pod_read_unaligned::<[[f32; 4]; 4]>(data))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn init_uploads_vertices() {
        let mut ctx = RecordingContext::new();
        let renderer = scene(&mut ctx);

        let [tri, rect] = renderer.primitives() else {
            panic!("expected two primitives");
        };
        assert_eq!(tri.vertex_count(), 3);
        assert_eq!(rect.vertex_count(), 6);
        assert_eq!(
            ctx.buffer_contents(tri.vertex_buffer()).unwrap(),
            bytemuck::cast_slice::<Vertex, u8>(&TRIANGLE_VERTICES)
        );
        assert_eq!(
            ctx.buffer_contents(rect.vertex_buffer()).unwrap(),
            bytemuck::cast_slice::<Vertex, u8>(&RECTANGLE_VERTICES)
        );
        assert_eq!(ctx.buffer_desc(tri.vertex_buffer()).unwrap().byte_width, 84);
        assert_eq!(ctx.buffer_desc(rect.vertex_buffer()).unwrap().byte_width, 168);
    }

    #[test]
    fn init_binds_fixed_state_in_order() {
        let mut ctx = RecordingContext::new();
        let renderer = scene(&mut ctx);
        let cb = renderer.constant_buffer();

        assert_eq!(ctx.buffer_desc(cb).unwrap().byte_width, 64);
        assert_eq!(ctx.vs_constant_buffer(0), Some(cb));
        assert_eq!(
            ctx.rasterizer_state().unwrap(),
            crate::device::RasterizerDesc { fill: FillMode::Solid, cull: CullMode::None }
        );

        let kinds: Vec<&'static str> = ctx
            .commands()
            .iter()
            .map(|c| match c {
                DeviceCommand::SetViewport(_) => "viewport",
                DeviceCommand::SetRasterizerState(_) => "rasterizer",
                DeviceCommand::SetShaderPipeline { .. } => "shader",
                DeviceCommand::CreateBuffer { .. } => "create",
                DeviceCommand::SetVsConstantBuffer { .. } => "bind_cb",
                DeviceCommand::MapWriteDiscard { .. } => "map",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            ["viewport", "rasterizer", "shader", "create", "bind_cb", "create", "map", "create", "map"]
        );
        assert_eq!(
            ctx.commands()[0],
            DeviceCommand::SetViewport(crate::device::Viewport::new(800.0, 600.0))
        );
    }

    #[test]
    fn one_frame_command_sequence() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        let cb = renderer.constant_buffer();
        let tri = renderer.primitives()[0].vertex_buffer();
        let rect = renderer.primitives()[1].vertex_buffer();
        ctx.clear_commands();

        renderer.render_frame(&mut ctx);

        let cmds = ctx.commands();
        assert_eq!(cmds.len(), 10);
        assert_eq!(cmds[0], DeviceCommand::ClearRenderTarget([0.0, 0.0, 0.0, 1.0]));
        assert!(matches!(cmds[1], DeviceCommand::UpdateSubresource { buffer, .. } if buffer == cb));
        assert_eq!(
            cmds[2],
            DeviceCommand::SetVertexBuffer { slot: 0, buffer: tri, stride: 28, offset: 0 }
        );
        assert_eq!(cmds[3], DeviceCommand::SetPrimitiveTopology(PrimitiveTopology::TriangleList));
        assert_eq!(cmds[4], DeviceCommand::Draw { vertex_count: 3, start_vertex: 0 });
        assert!(matches!(cmds[5], DeviceCommand::UpdateSubresource { buffer, .. } if buffer == cb));
        assert_eq!(
            cmds[6],
            DeviceCommand::SetVertexBuffer { slot: 0, buffer: rect, stride: 28, offset: 0 }
        );
        assert_eq!(cmds[7], DeviceCommand::SetPrimitiveTopology(PrimitiveTopology::TriangleList));
        assert_eq!(cmds[8], DeviceCommand::Draw { vertex_count: 6, start_vertex: 0 });
        assert_eq!(cmds[9], DeviceCommand::Present);
        assert_eq!(ctx.present_count(), 1);
    }

    #[test]
    fn each_draw_sees_its_own_transform() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        ctx.clear_commands();

        renderer.render_frame(&mut ctx);

        let uploads = uploaded_transforms(&ctx);
        assert_eq!(uploads.len(), 2);
        reference::assert_cols_match(&expected_triangle(0.001), &uploads[0]);
        reference::assert_cols_match(&expected_rectangle(0.001), &uploads[1]);
    }

    #[test]
    fn animation_times_advance_independently() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);

        let frames = 250;
        for _ in 0..frames {
            renderer.render_frame(&mut ctx);
        }

        for p in renderer.primitives() {
            assert!((p.animation.elapsed() - 0.001 * frames as f64).abs() < 1e-9);
        }

        renderer.primitives_mut()[0].animation.set_elapsed(5.0);
        ctx.clear_commands();
        renderer.render_frame(&mut ctx);

        let uploads = uploaded_transforms(&ctx);
        reference::assert_cols_match(&expected_triangle(5.001), &uploads[0]);
        reference::assert_cols_match(&expected_rectangle(0.001 * (frames + 1) as f64), &uploads[1]);
    }

    #[test]
    fn camera_is_shared_and_fixed() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        let before = *renderer.camera_matrices();

        for _ in 0..10 {
            renderer.render_frame(&mut ctx);
        }

        assert_eq!(*renderer.camera_matrices(), before);
        let [view, projection] = reference_view_projection();
        reference::assert_matches(&view, before.view);
        reference::assert_matches(&projection, before.projection);
    }

    #[test]
    fn failed_draw_does_not_stop_rendering() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        ctx.clear_commands();
        ctx.fail_next_draws(1);

        renderer.render_frame(&mut ctx);
        assert_eq!(ctx.draw_calls(), [6]);
        assert_eq!(ctx.present_count(), 1);

        renderer.render_frame(&mut ctx);
        assert_eq!(ctx.draw_calls(), [6, 3, 6]);
        assert_eq!(ctx.present_count(), 2);

        // Time still advanced for the primitive whose draw failed.
        assert!((renderer.primitives()[0].animation.elapsed() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn failed_transform_upload_skips_only_that_primitive() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        ctx.clear_commands();
        ctx.fail_next_updates(1);

        renderer.render_frame(&mut ctx);

        assert_eq!(ctx.draw_calls(), [6]);
        assert_eq!(ctx.present_count(), 1);
        assert_eq!(renderer.primitives()[0].animation.elapsed(), 0.001);

        let uploads = uploaded_transforms(&ctx);
        assert_eq!(uploads.len(), 1);
        reference::assert_cols_match(&expected_rectangle(0.001), &uploads[0]);
    }

    #[test]
    fn setup_failure_releases_created_buffers() {
        for failing in 0..3 {
            let mut ctx = RecordingContext::new().fail_buffer_creation_at(failing);
            let err = SceneRenderer::new(&mut ctx, SceneConfig::default()).unwrap_err();
            assert!(format!("{err:#}").contains("injected"), "{err:#}");
            assert_eq!(ctx.live_buffers(), 0, "leak when creation #{failing} fails");
        }
    }

    #[test]
    fn invalid_viewport_rejected_before_any_command() {
        let mut ctx = RecordingContext::new();
        let config = SceneConfig {
            viewport: crate::device::Viewport::new(0.0, 600.0),
            ..SceneConfig::default()
        };
        assert!(SceneRenderer::new(&mut ctx, config).is_err());
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn invalid_time_step_rejected() {
        for time_step in [f64::NAN, f64::INFINITY, -0.001] {
            let mut ctx = RecordingContext::new();
            let config = SceneConfig { time_step, ..SceneConfig::default() };
            assert!(SceneRenderer::new(&mut ctx, config).is_err(), "time step {time_step}");
            assert_eq!(ctx.live_buffers(), 0);
        }
    }

    #[test]
    fn release_frees_every_buffer_once() {
        let mut ctx = RecordingContext::new();
        let mut renderer = scene(&mut ctx);
        renderer.render_frame(&mut ctx);
        assert_eq!(ctx.live_buffers(), 3);
        ctx.clear_commands();

        renderer.release(&mut ctx);

        assert_eq!(ctx.live_buffers(), 0);
        let releases = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::ReleaseBuffer { .. }))
            .count();
        assert_eq!(releases, 3);
    }
}
