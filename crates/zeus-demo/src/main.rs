use anyhow::Result;

use zeus_engine::core::{App, AppControl, FrameCtx};
use zeus_engine::device::{Gpu, GpuInit};
use zeus_engine::logging::{init_logging, LoggingConfig};
use zeus_engine::scene::{SceneConfig, SceneRenderer, SCENE_HEIGHT, SCENE_WIDTH};
use zeus_engine::window::{Runtime, RuntimeConfig};

use winit::dpi::PhysicalSize;

/// Frames between two frame-rate reports.
const FPS_REPORT_INTERVAL: u64 = 600;

struct SceneApp {
    config: SceneConfig,
    renderer: Option<SceneRenderer>,
    report_seconds: f32,
}

impl SceneApp {
    fn new(config: SceneConfig) -> Self {
        Self {
            config,
            renderer: None,
            report_seconds: 0.0,
        }
    }
}

impl App for SceneApp {
    fn on_init(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        let renderer = SceneRenderer::new(gpu, self.config.clone())?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.gpu.is_lost() {
            log::error!("GPU device lost; exiting");
            return AppControl::Exit;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return AppControl::Exit;
        };

        renderer.render_frame(ctx.gpu);

        self.report_seconds += ctx.time.dt;
        if ctx.time.frame_index > 0 && ctx.time.frame_index % FPS_REPORT_INTERVAL == 0 {
            let fps = FPS_REPORT_INTERVAL as f32 / self.report_seconds.max(f32::EPSILON);
            log::debug!("frame {}: {fps:.1} fps", ctx.time.frame_index);
            self.report_seconds = 0.0;
        }

        AppControl::Continue
    }

    fn on_exit(&mut self, gpu: &mut Gpu<'_>) {
        if let Some(renderer) = self.renderer.take() {
            renderer.release(gpu);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "zeus: spinning primitives".to_string(),
        initial_size: PhysicalSize::new(SCENE_WIDTH, SCENE_HEIGHT),
        ..RuntimeConfig::default()
    };

    Runtime::run(runtime, GpuInit::default(), SceneApp::new(SceneConfig::default()))
}
