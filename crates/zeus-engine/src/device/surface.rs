use winit::dpi::PhysicalSize;

use super::resource::Viewport;
use super::SurfaceErrorAction;

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    let preferred: [wgpu::TextureFormat; 2] = if prefer_srgb {
        [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]
    } else {
        [wgpu::TextureFormat::Rgba8Unorm, wgpu::TextureFormat::Bgra8Unorm]
    };

    preferred
        .into_iter()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Returns `requested` if the adapter can multisample `format` that many times, else 1.
pub(crate) fn supported_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    requested: u32,
) -> u32 {
    if requested <= 1 {
        return 1;
    }
    let flags = adapter.get_texture_format_features(format).flags;
    if flags.sample_count_supported(requested) {
        requested
    } else {
        log::warn!("{requested}x MSAA unsupported for {format:?}; rendering without multisampling");
        1
    }
}

pub(crate) fn create_msaa_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count <= 1 {
        return None;
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("zeus msaa color"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.width > 0 && size.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Intersects `viewport` with a `size` render target.
///
/// wgpu rejects viewports that extend past the attachment, which happens when
/// the window is smaller than the configured resolution. Returns `None` when
/// nothing is left to draw.
pub(crate) fn clamp_viewport(viewport: Viewport, size: PhysicalSize<u32>) -> Option<Viewport> {
    let x = viewport.x.max(0.0);
    let y = viewport.y.max(0.0);
    let right = (viewport.x + viewport.width).min(size.width as f32);
    let bottom = (viewport.y + viewport.height).min(size.height as f32);

    let clamped = Viewport {
        x,
        y,
        width: right - x,
        height: bottom - y,
    };
    clamped.is_valid().then_some(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_inside_target_unchanged() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(clamp_viewport(vp, PhysicalSize::new(1024, 768)), Some(vp));
    }

    #[test]
    fn viewport_clamped_to_smaller_target() {
        let vp = Viewport::new(800.0, 600.0);
        let out = clamp_viewport(vp, PhysicalSize::new(640, 480)).unwrap();
        assert_eq!(out.width, 640.0);
        assert_eq!(out.height, 480.0);
    }

    #[test]
    fn negative_origin_clamped() {
        let vp = Viewport { x: -10.0, y: -20.0, width: 100.0, height: 100.0 };
        let out = clamp_viewport(vp, PhysicalSize::new(800, 600)).unwrap();
        assert_eq!((out.x, out.y, out.width, out.height), (0.0, 0.0, 90.0, 80.0));
    }

    #[test]
    fn zero_sized_target_yields_none() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(clamp_viewport(vp, PhysicalSize::new(0, 0)), None);
    }
}
