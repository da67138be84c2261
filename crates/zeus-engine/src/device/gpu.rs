use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::frame::GpuFrame;
use super::resource::ResourceTable;
use super::surface;
use super::wgpu_backend::BackendState;
use super::{GpuInit, SurfaceErrorAction};

/// Owns wgpu core objects, the surface configuration and every resource
/// created through [`DeviceContext`](super::DeviceContext).
///
/// This is the single owner of device-level state: dropping it releases the
/// device, queue, surface, pipelines and any buffer still alive.
pub struct Gpu<'w> {
    window: &'w Window,

    /// Surface bound to the window.
    surface: wgpu::Surface<'w>,

    pub(super) device: wgpu::Device,
    pub(super) queue: wgpu::Queue,

    /// Active surface configuration.
    pub(super) config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    pub(super) size: PhysicalSize<u32>,

    pub(super) sample_count: u32,
    pub(super) msaa_view: Option<wgpu::TextureView>,

    pub(super) buffers: ResourceTable<wgpu::Buffer>,
    pub(super) backend: BackendState,

    lost: bool,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            sample_count,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("zeus device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let sample_count = surface::supported_sample_count(&adapter, format, sample_count);
        let msaa_view = surface::create_msaa_view(&device, &config, sample_count);
        log::debug!("surface {format:?} {}x{}, {sample_count}x MSAA", size.width, size.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            msaa_view,
            buffers: ResourceTable::default(),
            backend: BackendState::default(),
            lost: false,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Returns `true` once a fatal surface error was observed.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only internal state is updated and configuration is deferred.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        // The old back buffer belongs to the previous configuration.
        self.backend.frame.finish();

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.msaa_view = surface::create_msaa_view(&self.device, &self.config, self.sample_count);
    }

    /// Acquires the back buffer of the frame in progress if needed.
    ///
    /// Returns `Ok(false)` when this frame was skipped after an earlier
    /// acquisition failure; the caller should drop its work for this frame.
    pub(super) fn ensure_frame(&mut self) -> Result<bool> {
        anyhow::ensure!(!self.lost, "GPU surface is lost");
        anyhow::ensure!(
            self.size.width > 0 && self.size.height > 0,
            "surface has zero size"
        );

        let surface = &self.surface;
        let acquired = self.backend.frame.acquire(|| {
            let surface_texture = surface.get_current_texture()?;
            let view = surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            Ok::<_, SurfaceError>(GpuFrame {
                surface_texture,
                view,
            })
        });

        match acquired {
            Ok(held) => Ok(held),
            Err(err) => {
                let reason = err.to_string();
                let action = self.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    self.lost = true;
                }
                anyhow::bail!("failed to acquire back buffer ({reason}): {action:?}")
            }
        }
    }

    /// Presents the acquired frame.
    pub(super) fn present_frame(&mut self, frame: GpuFrame) {
        self.window.pre_present_notify();
        frame.surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
