use bytemuck::{Pod, Zeroable};

use crate::device::{InputElement, VertexFormat};

/// Position + straight RGBA color, as laid out in vertex buffers.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Input layout matching the field order: POSITION @ 0, COLOR @ 12.
    pub const LAYOUT: [InputElement; 2] = [
        InputElement {
            semantic: "POSITION",
            format: VertexFormat::Float32x3,
            offset: 0,
        },
        InputElement {
            semantic: "COLOR",
            format: VertexFormat::Float32x4,
            offset: 12,
        },
    ];

    pub const fn new(x: f32, y: f32, z: f32, color: [f32; 4]) -> Self {
        Self { position: [x, y, z], color }
    }
}

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new(0.0, 0.5, 0.0, RED),
    Vertex::new(0.45, -0.5, 0.0, GREEN),
    Vertex::new(-0.45, -0.5, 0.0, BLUE),
];

/// Unit square as two triangles.
pub const RECTANGLE_VERTICES: [Vertex; 6] = [
    Vertex::new(-0.5, 0.5, 0.0, RED),
    Vertex::new(0.5, 0.5, 0.0, GREEN),
    Vertex::new(-0.5, -0.5, 0.0, BLUE),
    Vertex::new(0.5, 0.5, 0.0, GREEN),
    Vertex::new(0.5, -0.5, 0.0, RED),
    Vertex::new(-0.5, -0.5, 0.0, BLUE),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_struct() {
        assert_eq!(Vertex::STRIDE, 28);
        assert_eq!(std::mem::offset_of!(Vertex, position) as u32, Vertex::LAYOUT[0].offset);
        assert_eq!(std::mem::offset_of!(Vertex, color) as u32, Vertex::LAYOUT[1].offset);

        let covered: u32 = Vertex::LAYOUT.iter().map(|e| e.format.size()).sum();
        assert_eq!(covered, Vertex::STRIDE);
    }

    #[test]
    fn rectangle_covers_unit_square() {
        for v in RECTANGLE_VERTICES {
            assert_eq!(v.position[0].abs(), 0.5);
            assert_eq!(v.position[1].abs(), 0.5);
            assert_eq!(v.position[2], 0.0);
            assert_eq!(v.color[3], 1.0);
        }
    }
}
