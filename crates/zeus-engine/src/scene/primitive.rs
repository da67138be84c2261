use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::device::BufferId;
use crate::time::AnimationState;

use super::camera::CameraMatrices;
use super::vertex::{Vertex, RECTANGLE_VERTICES, TRIANGLE_VERTICES};

/// Rotation axis of a spinning primitive.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn rotation(self, angle: f32) -> Mat4 {
        match self {
            Axis::X => Mat4::from_rotation_x(angle),
            Axis::Y => Mat4::from_rotation_y(angle),
            Axis::Z => Mat4::from_rotation_z(angle),
        }
    }
}

/// Static description of a drawable primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveDesc {
    pub label: &'static str,
    pub vertices: &'static [Vertex],
    /// Rotations applied in object space, first axis first. All use the same angle.
    pub spin: &'static [Axis],
    /// Added to the animation time to form the rotation angle (radians).
    pub phase: f32,
    /// Applied after the spin.
    pub translation: Vec3,
}

impl PrimitiveDesc {
    pub fn triangle() -> Self {
        Self {
            label: "triangle",
            vertices: &TRIANGLE_VERTICES,
            spin: &[Axis::Y, Axis::Z],
            phase: PI,
            translation: Vec3::new(1.5, 0.5, 0.0),
        }
    }

    pub fn rectangle() -> Self {
        Self {
            label: "rectangle",
            vertices: &RECTANGLE_VERTICES,
            spin: &[Axis::Y],
            phase: PI,
            translation: Vec3::new(-1.5, -0.5, 0.0),
        }
    }
}

/// A primitive uploaded to the device, with its own animation clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    label: &'static str,
    vertex_buffer: BufferId,
    vertex_count: u32,
    spin: &'static [Axis],
    phase: f32,
    translation: Vec3,
    pub animation: AnimationState,
}

impl Primitive {
    pub(crate) fn new(desc: &PrimitiveDesc, vertex_buffer: BufferId, time_step: f64) -> Self {
        Self {
            label: desc.label,
            vertex_buffer,
            vertex_count: desc.vertices.len() as u32,
            spin: desc.spin,
            phase: desc.phase,
            translation: desc.translation,
            animation: AnimationState::new(time_step),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Current rotation angle in radians.
    pub fn angle(&self) -> f32 {
        (self.animation.elapsed() + self.phase as f64) as f32
    }

    /// Object-to-world transform at the current animation time.
    pub fn model(&self) -> Mat4 {
        let angle = self.angle();
        // Column-vector order: the first axis ends up rightmost.
        let spin = self
            .spin
            .iter()
            .fold(Mat4::IDENTITY, |acc, axis| axis.rotation(angle) * acc);
        Mat4::from_translation(self.translation) * spin
    }

    /// Object-to-clip transform: spin, then translate, then view, then projection.
    pub fn final_transform(&self, camera: &CameraMatrices) -> Mat4 {
        camera.projection * camera.view * self.model()
    }
}

/// Constant-buffer payload: one column-major 4x4 matrix.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub final_transform: [[f32; 4]; 4],
}

impl TransformUniform {
    pub const SIZE: u32 = std::mem::size_of::<TransformUniform>() as u32;
}

impl From<Mat4> for TransformUniform {
    fn from(m: Mat4) -> Self {
        Self {
            final_transform: m.to_cols_array_2d(),
        }
    }
}
