//! Column-major 4×4 transforms for text draw commands.
//!
//! Every `TextBatch::begin` call captures one of these matrices; the
//! renderer uploads it unchanged into the per-command uniform slot, so
//! whatever convention the caller uses (screen pixels, world units,
//! pre-multiplied camera) flows straight through to the shader.
//!
//! The helpers here cover the common case: an orthographic projection
//! that maps a `width × height` pixel viewport with a top-left origin
//! onto wgpu NDC, Y flipped so text laid out with Y growing downward
//! lands upright on screen.

/// Column-major 4×4 matrix, laid out exactly as WGSL's `mat4x4<f32>`.
pub type Mat4 = [[f32; 4]; 4];

/// The identity transform: positions are passed to the shader unchanged.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Build an orthographic projection for a viewport of `width × height`
/// pixels.
///
/// Maps (0,0) to top-left, (width, height) to bottom-right.
/// This matches the screen convention where Y grows downward.
pub fn orthographic(width: f32, height: f32) -> Mat4 {
    // NDC: x ∈ [-1, 1], y ∈ [-1, 1]
    //
    // ndc_x = world_x * (2 / width) - 1
    // ndc_y = 1 - world_y * (2 / height)
    //
    // Column-major 4×4:
    let sx = 2.0 / width;
    let sy = -2.0 / height; // flip Y for top-left origin
    [
        [sx, 0.0, 0.0, 0.0],
        [0.0, sy, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0, 1.0],
    ]
}

/// `a * b` in the usual matrix sense: applying the result transforms by
/// `b` first, then `a`.
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (col, b_col) in b.iter().enumerate() {
        for row in 0..4 {
            out[col][row] = a[0][row] * b_col[0]
                + a[1][row] * b_col[1]
                + a[2][row] * b_col[2]
                + a[3][row] * b_col[3];
        }
    }
    out
}

/// Translation by `(x, y, z)`.
pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, z, 1.0],
    ]
}

/// Apply `m` to the point `(x, y)` at z = 0, w = 1. Returns `(x', y')`.
///
/// Test helper for checking where screen positions land in NDC; the
/// real transform happens in the vertex shader.
pub fn apply_to_point(m: &Mat4, x: f32, y: f32) -> (f32, f32) {
    let out_x = x * m[0][0] + y * m[1][0] + m[3][0];
    let out_y = x * m[0][1] + y * m[1][1] + m[3][1];
    (out_x, out_y)
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leaves_points_alone() {
        let (x, y) = apply_to_point(&IDENTITY, 12.5, -3.0);
        assert!((x - 12.5).abs() < 1e-6);
        assert!((y - (-3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_orthographic_top_left() {
        let m = orthographic(800.0, 600.0);

        // Top-left (0,0) should map to NDC (-1, 1)
        let (x, y) = apply_to_point(&m, 0.0, 0.0);
        assert!((x - (-1.0)).abs() < 1e-5, "top-left x should be -1, got {x}");
        assert!((y - 1.0).abs() < 1e-5, "top-left y should be 1, got {y}");
    }

    #[test]
    fn test_orthographic_bottom_right() {
        let m = orthographic(800.0, 600.0);

        // Bottom-right (800, 600) should map to NDC (1, -1)
        let (x, y) = apply_to_point(&m, 800.0, 600.0);
        assert!((x - 1.0).abs() < 1e-5, "bottom-right x should be 1, got {x}");
        assert!((y - (-1.0)).abs() < 1e-5, "bottom-right y should be -1, got {y}");
    }

    #[test]
    fn test_orthographic_center() {
        let m = orthographic(800.0, 600.0);

        let (x, y) = apply_to_point(&m, 400.0, 300.0);
        assert!(x.abs() < 1e-5, "center x should be 0, got {x}");
        assert!(y.abs() < 1e-5, "center y should be 0, got {y}");
    }

    #[test]
    fn test_multiply_translation_then_project() {
        // Shift right by 400px, then project: the old origin lands at
        // the horizontal center of an 800px viewport.
        let m = multiply(&orthographic(800.0, 600.0), &translation(400.0, 0.0, 0.0));
        let (x, y) = apply_to_point(&m, 0.0, 0.0);
        assert!(x.abs() < 1e-5, "translated origin x should be 0, got {x}");
        assert!((y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_multiply_identity_is_noop() {
        let m = orthographic(1280.0, 720.0);
        let left = multiply(&IDENTITY, &m);
        let right = multiply(&m, &IDENTITY);
        assert_eq!(left, m);
        assert_eq!(right, m);
    }
}
