//! Projection matrices and stream clipping
//!
//! Matrices use column vectors with view space X right, Y up, Z forward and
//! depth mapped to `[0, 1]`.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::math::Mat4;
use crate::link::ProjectionClipping;

static DEGENERATE_CLIPPING_REPORTED: AtomicBool = AtomicBool::new(false);

/// Clipping with a usable, non-zero area
fn usable_clipping(clipping: &ProjectionClipping) -> ProjectionClipping {
    let width = clipping.right - clipping.left;
    let height = clipping.bottom - clipping.top;
    if width.is_normal() && height.is_normal() {
        return *clipping;
    }
    if !DEGENERATE_CLIPPING_REPORTED.swap(true, Ordering::Relaxed) {
        log::warn!("Ignoring degenerate stream clipping {clipping:?}");
    }
    ProjectionClipping::default()
}

/// Off-axis perspective projection from near-plane extents
pub fn off_axis(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Mat4 {
    let mut result = Mat4::zeros();
    result[(0, 0)] = 2.0 * near / (right - left);
    result[(0, 2)] = -(right + left) / (right - left);
    result[(1, 1)] = 2.0 * near / (top - bottom);
    result[(1, 2)] = -(top + bottom) / (top - bottom);
    result[(2, 2)] = far / (far - near);
    result[(2, 3)] = -(near * far) / (far - near);
    result[(3, 2)] = 1.0;
    result
}

/// Orthographic projection of a centered `width` x `height` view volume
pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
    let mut result = Mat4::identity();
    result[(0, 0)] = 2.0 / width;
    result[(1, 1)] = 2.0 / height;
    result[(2, 2)] = 1.0 / (far - near);
    result[(2, 3)] = -near / (far - near);
    result
}

/// 2D affine transform selecting a stream's sub-region of the full frustum
///
/// `cx`/`cy` are the lens-center offsets of the frame's camera record. With
/// the default clipping `(0, 1, 0, 1)` and zero offsets this is the identity.
///
/// The matrix scales clip-space X/Y by `(1/(r-l), 1/(b-t))` and then shifts by
/// `((1-(r+l)) + cx, (t+b-1) + cy)` times that scale, so the selected rectangle
/// fills the output. A region with zero or non-finite width or height falls
/// back to the full frame.
pub fn clipping_matrix(clipping: &ProjectionClipping, cx: f32, cy: f32) -> Mat4 {
    let clipping = usable_clipping(clipping);
    let scale_x = 1.0 / (clipping.right - clipping.left);
    let scale_y = 1.0 / (clipping.bottom - clipping.top);
    let offset_x = (1.0 - (clipping.right + clipping.left) + cx) * scale_x;
    let offset_y = (-1.0 + (clipping.top + clipping.bottom) + cy) * scale_y;

    let mut result = Mat4::identity();
    result[(0, 0)] = scale_x;
    result[(1, 1)] = scale_y;
    result[(0, 3)] = offset_x;
    result[(1, 3)] = offset_y;
    result
}

/// Apply a stream's clipping to a projection matrix
///
/// Clip-space coordinates carry `w`, so the offset column is scaled by `w`
/// through the homogeneous product.
pub fn apply_clipping(projection: &Mat4, clipping: &ProjectionClipping, cx: f32, cy: f32) -> Mat4 {
    clipping_matrix(clipping, cx, cy) * projection
}
