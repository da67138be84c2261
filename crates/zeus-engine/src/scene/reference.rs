//! Row-vector matrix math used to check the glam-based transforms.
//!
//! Matrices are row-major `[[f32; 4]; 4]` applied as `v * M`, so a product
//! `A * B` applies `A` first. A column-vector glam matrix equals the transpose
//! of its row-vector counterpart, i.e. row `i` here is glam column `i`.

use glam::Mat4;

pub type RowMat = [[f32; 4]; 4];

pub const IDENTITY: RowMat = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

pub fn mul(a: &RowMat, b: &RowMat) -> RowMat {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

pub fn product(ms: &[RowMat]) -> RowMat {
    ms.iter().fold(IDENTITY, |acc, m| mul(&acc, m))
}

pub fn rotation_y(angle: f32) -> RowMat {
    let (s, c) = angle.sin_cos();
    [
        [c, 0.0, -s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn rotation_z(angle: f32) -> RowMat {
    let (s, c) = angle.sin_cos();
    [
        [c, s, 0.0, 0.0],
        [-s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn translation(x: f32, y: f32, z: f32) -> RowMat {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, z, 1.0],
    ]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(a: [f32; 3]) -> [f32; 3] {
    let len = dot(a, a).sqrt();
    [a[0] / len, a[1] / len, a[2] / len]
}

pub fn look_at_lh(eye: [f32; 3], at: [f32; 3], up: [f32; 3]) -> RowMat {
    let z = normalize(sub(at, eye));
    let x = normalize(cross(up, z));
    let y = cross(z, x);
    [
        [x[0], y[0], z[0], 0.0],
        [x[1], y[1], z[1], 0.0],
        [x[2], y[2], z[2], 0.0],
        [-dot(x, eye), -dot(y, eye), -dot(z, eye), 1.0],
    ]
}

pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> RowMat {
    let y_scale = 1.0 / (fov_y / 2.0).tan();
    let x_scale = y_scale / aspect;
    let q = far / (far - near);
    [
        [x_scale, 0.0, 0.0, 0.0],
        [0.0, y_scale, 0.0, 0.0],
        [0.0, 0.0, q, 1.0],
        [0.0, 0.0, -near * q, 0.0],
    ]
}

/// Element-wise comparison against a column-vector matrix, tolerance 1e-5.
#[track_caller]
pub fn assert_matches(expected: &RowMat, actual: Mat4) {
    assert_cols_match(expected, &actual.to_cols_array_2d());
}

/// Same as [`assert_matches`] for a matrix already split into columns.
#[track_caller]
pub fn assert_cols_match(expected: &RowMat, cols: &[[f32; 4]; 4]) {
    for i in 0..4 {
        for j in 0..4 {
            assert!(
                (expected[i][j] - cols[i][j]).abs() < 1e-5,
                "mismatch at [{i}][{j}]: expected {} got {}\nexpected {expected:?}\nactual   {cols:?}",
                expected[i][j],
                cols[i][j]
            );
        }
    }
}
