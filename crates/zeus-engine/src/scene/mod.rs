//! Spinning-primitive scene drawn through a [`DeviceContext`](crate::device::DeviceContext).

mod camera;
mod config;
mod primitive;
mod renderer;
mod vertex;

#[cfg(test)]
mod reference;

pub use camera::{Camera, CameraMatrices};
pub use config::{SceneConfig, SCENE_HEIGHT, SCENE_WIDTH};
pub use primitive::{Axis, Primitive, PrimitiveDesc, TransformUniform};
pub use renderer::{SceneRenderer, SCENE_SHADER, TRANSFORM_SLOT};
pub use vertex::{Vertex, RECTANGLE_VERTICES, TRIANGLE_VERTICES};
