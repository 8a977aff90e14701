//! 3x3 affine matrix algebra used to place the photo, brush strokes, and
//! object layers in canvas space.
//!
//! Every compose operation mutates the receiver and hands it back so calls can
//! be chained inside per-frame code without allocating. Callers that need an
//! untouched copy start from [`Mat3::identity`] (the type is `Copy`).

use serde::{Deserialize, Serialize};

/// Converts degrees to radians. Rotation helpers only accept radians.
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Column-major 3x3 matrix: `m[col * 3 + row]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [f32; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat3 {
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn from_cols_array(m: [f32; 9]) -> Self {
        Self { m }
    }

    /// Post-multiplies by a translation (`self = self * T(v)`).
    pub fn translate(&mut self, v: [f32; 2]) -> &mut Self {
        let a = self.m;
        let [x, y] = v;
        self.m[6] = x * a[0] + y * a[3] + a[6];
        self.m[7] = x * a[1] + y * a[4] + a[7];
        self.m[8] = x * a[2] + y * a[5] + a[8];
        self
    }

    /// Post-multiplies by a non-uniform scale.
    pub fn scale(&mut self, v: [f32; 2]) -> &mut Self {
        let [x, y] = v;
        self.m[0] *= x;
        self.m[1] *= x;
        self.m[2] *= x;
        self.m[3] *= y;
        self.m[4] *= y;
        self.m[5] *= y;
        self
    }

    /// Post-multiplies by a rotation of `radians`.
    pub fn rotate(&mut self, radians: f32) -> &mut Self {
        let a = self.m;
        let (s, c) = radians.sin_cos();
        self.m[0] = c * a[0] + s * a[3];
        self.m[1] = c * a[1] + s * a[4];
        self.m[2] = c * a[2] + s * a[5];
        self.m[3] = c * a[3] - s * a[0];
        self.m[4] = c * a[4] - s * a[1];
        self.m[5] = c * a[5] - s * a[2];
        self
    }

    /// Inverts in place. A singular matrix is left unchanged, so callers must
    /// not assume a true inverse was produced.
    pub fn invert(&mut self) -> &mut Self {
        let [a00, a01, a02, a10, a11, a12, a20, a21, a22] = self.m;

        let b01 = a22 * a11 - a12 * a21;
        let b11 = -a22 * a10 + a12 * a20;
        let b21 = a21 * a10 - a11 * a20;

        let det = a00 * b01 + a01 * b11 + a02 * b21;
        if det == 0.0 {
            return self;
        }
        let det = 1.0 / det;

        self.m = [
            b01 * det,
            (-a22 * a01 + a02 * a21) * det,
            (a12 * a01 - a02 * a11) * det,
            b11 * det,
            (a22 * a00 - a02 * a20) * det,
            (-a12 * a00 + a02 * a10) * det,
            b21 * det,
            (-a21 * a00 + a01 * a20) * det,
            (a11 * a00 - a01 * a10) * det,
        ];
        self
    }

    /// `self = self * other`.
    pub fn multiply(&mut self, other: &Mat3) -> &mut Self {
        let a = self.m;
        let b = other.m;
        for col in 0..3 {
            let (b0, b1, b2) = (b[col * 3], b[col * 3 + 1], b[col * 3 + 2]);
            for row in 0..3 {
                self.m[col * 3 + row] = b0 * a[row] + b1 * a[3 + row] + b2 * a[6 + row];
            }
        }
        self
    }

    pub fn transform_point(&self, p: [f32; 2]) -> [f32; 2] {
        let [x, y] = p;
        [
            self.m[0] * x + self.m[3] * y + self.m[6],
            self.m[1] * x + self.m[4] * y + self.m[7],
        ]
    }

    /// Columns padded to 16 bytes, matching a std140 `mat3`.
    pub fn to_std140(&self) -> [[f32; 4]; 3] {
        let m = &self.m;
        [
            [m[0], m[1], m[2], 0.0],
            [m[3], m[4], m[5], 0.0],
            [m[6], m[7], m[8], 0.0],
        ]
    }
}

/// View onto the canvas. Purely derived data; the projection-view matrix is
/// rebuilt on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Zoom divisor; larger values shrink the scene.
    pub distance: f32,
    /// Radians.
    pub rotation: f32,
}

impl Camera {
    /// A camera whose world origin sits in the middle of a `width x height`
    /// viewport.
    pub fn centered(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            distance: 1.0,
            rotation: 0.0,
        }
    }

    /// Maps world space (y down, pixels) to clip space.
    pub fn projection_view(&self) -> Mat3 {
        let width = self.width.max(1.0);
        let height = self.height.max(1.0);
        let zoom = if self.distance == 0.0 {
            1.0
        } else {
            1.0 / self.distance
        };
        let mut m = Mat3::identity();
        m.translate([-1.0, 1.0])
            .scale([2.0 / width, -2.0 / height])
            .translate([width * 0.5 + self.x, height * 0.5 + self.y])
            .rotate(self.rotation)
            .scale([zoom, zoom]);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4
    }

    #[test]
    fn compose_chain_applies_last_operation_first() {
        let mut m = Mat3::identity();
        m.translate([10.0, 5.0]).scale([2.0, 3.0]);
        assert!(approx(m.transform_point([1.0, 1.0]), [12.0, 8.0]));
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut m = Mat3::identity();
        m.rotate(deg_to_rad(90.0));
        assert!(approx(m.transform_point([1.0, 0.0]), [0.0, 1.0]));
    }

    #[test]
    fn invert_undoes_transform() {
        let mut m = Mat3::identity();
        m.translate([3.0, -7.0]).rotate(0.4).scale([2.0, 0.5]);
        let point = m.transform_point([4.0, 9.0]);
        let mut inverse = m;
        inverse.invert();
        assert!(approx(inverse.transform_point(point), [4.0, 9.0]));
    }

    #[test]
    fn invert_of_singular_matrix_is_noop() {
        let mut m = Mat3::identity();
        m.scale([0.0, 1.0]);
        let before = m;
        m.invert();
        assert_eq!(m, before);
    }

    #[test]
    fn multiply_matches_chained_compose() {
        let mut chained = Mat3::identity();
        chained.translate([1.0, 2.0]).rotate(1.1);

        let mut rotation = Mat3::identity();
        rotation.rotate(1.1);
        let mut product = Mat3::identity();
        product.translate([1.0, 2.0]).multiply(&rotation);

        for (a, b) in chained.m.iter().zip(product.m.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn centered_camera_maps_origin_to_clip_center() {
        let camera = Camera::centered(800.0, 600.0);
        let pv = camera.projection_view();
        assert!(approx(pv.transform_point([0.0, 0.0]), [0.0, 0.0]));
        assert!(approx(pv.transform_point([-400.0, -300.0]), [-1.0, 1.0]));
        assert!(approx(pv.transform_point([400.0, 300.0]), [1.0, -1.0]));
    }
}
