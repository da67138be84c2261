use crate::device::{CullMode, FillMode, RasterizerDesc, Viewport};
use crate::time::DEFAULT_TIME_STEP;

use super::camera::Camera;
use super::primitive::PrimitiveDesc;

pub const SCENE_WIDTH: u32 = 800;
pub const SCENE_HEIGHT: u32 = 600;

/// Everything a [`SceneRenderer`](super::SceneRenderer) needs to build a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub viewport: Viewport,
    /// Straight RGBA.
    pub clear_color: [f32; 4],
    pub camera: Camera,
    /// Animation time added per frame to every primitive.
    pub time_step: f64,
    pub rasterizer: RasterizerDesc,
    /// Drawn in order.
    pub primitives: Vec<PrimitiveDesc>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(SCENE_WIDTH as f32, SCENE_HEIGHT as f32),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            camera: Camera::default(),
            time_step: DEFAULT_TIME_STEP,
            rasterizer: RasterizerDesc {
                fill: FillMode::Solid,
                cull: CullMode::None,
            },
            primitives: vec![PrimitiveDesc::triangle(), PrimitiveDesc::rectangle()],
        }
    }
}
