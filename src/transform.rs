use egui::Vec2;

/// A 4x4 affine transform applied to canvas-space positions.
///
/// Every mutating call post-multiplies, so the most recent call is the first
/// one applied to a point: `t.translate(o); t.scale(s, s)` scales, then translates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Row-major, points are column vectors
    matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a new identity transform
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn translate(&mut self, offset: Vec2) {
        let mut translation = Self::IDENTITY.matrix;
        translation[0][3] = offset.x;
        translation[1][3] = offset.y;
        self.matrix = multiply_matrices(&self.matrix, &translation);
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        let mut scaling = Self::IDENTITY.matrix;
        scaling[0][0] = x;
        scaling[1][1] = y;
        self.matrix = multiply_matrices(&self.matrix, &scaling);
    }

    /// Rotates by `radians` around `origin`
    pub fn rotate(&mut self, radians: f32, origin: Vec2) {
        let (sin, cos) = radians.sin_cos();
        let mut rotation = Self::IDENTITY.matrix;
        rotation[0][0] = cos;
        rotation[0][1] = -sin;
        rotation[1][0] = sin;
        rotation[1][1] = cos;

        self.translate(origin);
        self.matrix = multiply_matrices(&self.matrix, &rotation);
        self.translate(-origin);
    }

    /// Returns `self * other`: applying the result equals applying `other` first, then `self`
    pub fn combine_with(&self, other: &Transform) -> Transform {
        Transform {
            matrix: multiply_matrices(&self.matrix, &other.matrix),
        }
    }

    pub fn apply_to(&self, point: Vec2) -> Vec2 {
        let m = &self.matrix;
        let x = m[0][0] * point.x + m[0][1] * point.y + m[0][3];
        let y = m[1][0] * point.x + m[1][1] * point.y + m[1][3];
        let w = m[3][0] * point.x + m[3][1] * point.y + m[3][3];
        if w == 0.0 || w == 1.0 {
            Vec2::new(x, y)
        } else {
            Vec2::new(x / w, y / w)
        }
    }

    /// Column-major layout expected by `glUniformMatrix4fv` without transposition
    pub fn as_column_major(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for column in 0..4 {
            for row in 0..4 {
                out[column * 4 + row] = self.matrix[row][column];
            }
        }
        out
    }

    pub fn matrix(&self) -> &[[f32; 4]; 4] {
        &self.matrix
    }
}

fn multiply_matrices(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            result[i][j] = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-4, "{:?} != {:?}", a, b);
    }

    fn sample_transforms() -> Vec<Transform> {
        let mut pan = Transform::identity();
        pan.translate(Vec2::new(0.25, -0.1));

        let mut zoom = Transform::identity();
        zoom.translate(Vec2::new(0.5, 0.5));
        zoom.scale(3.0, 3.0);
        zoom.translate(Vec2::new(-0.5, -0.5));

        let mut spin = Transform::identity();
        spin.rotate(0.7, Vec2::new(0.2, 0.3));
        spin.scale(0.5, 2.0);

        vec![Transform::identity(), pan, zoom, spin]
    }

    #[test]
    fn test_identity_leaves_points() {
        let point = Vec2::new(0.3, 0.9);
        assert_eq!(Transform::identity().apply_to(point), point);
    }

    #[test]
    fn test_translate_then_scale_order() {
        let mut transform = Transform::identity();
        transform.translate(Vec2::new(1.0, 2.0));
        transform.scale(2.0, 2.0);
        // Scale applies first, then the translation
        assert_close(transform.apply_to(Vec2::new(1.0, 1.0)), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_rotate_around_origin() {
        let mut transform = Transform::identity();
        transform.rotate(std::f32::consts::FRAC_PI_2, Vec2::new(1.0, 1.0));
        assert_close(transform.apply_to(Vec2::new(2.0, 1.0)), Vec2::new(1.0, 2.0));
        assert_close(transform.apply_to(Vec2::new(1.0, 1.0)), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_composition_is_application() {
        let points = [Vec2::ZERO, Vec2::new(0.5, 0.5), Vec2::new(-3.0, 7.5), Vec2::new(1.0, 0.0)];
        for t1 in sample_transforms() {
            for t2 in sample_transforms() {
                let combined = t1.combine_with(&t2);
                for point in points {
                    assert_close(combined.apply_to(point), t1.apply_to(t2.apply_to(point)));
                }
            }
        }
    }

    #[test]
    fn test_composition_is_associative() {
        let transforms = sample_transforms();
        let (a, b, c) = (transforms[1], transforms[2], transforms[3]);
        let left = a.combine_with(&b).combine_with(&c);
        let right = a.combine_with(&b.combine_with(&c));
        for point in [Vec2::new(0.1, 0.2), Vec2::new(4.0, -2.0)] {
            assert_close(left.apply_to(point), right.apply_to(point));
        }
    }

    #[test]
    fn test_column_major_layout() {
        let mut transform = Transform::identity();
        transform.translate(Vec2::new(3.0, 4.0));
        let columns = transform.as_column_major();
        assert_eq!(columns[12], 3.0);
        assert_eq!(columns[13], 4.0);
        assert_eq!(columns[15], 1.0);
    }

    #[test]
    fn test_reset() {
        let mut transform = Transform::identity();
        transform.scale(4.0, 4.0);
        transform.reset();
        assert_eq!(transform, Transform::IDENTITY);
    }
}
