//! Affine transform wrapper.
//!
//! Every drawable owns exactly one [`Transform`]. Operations compose by
//! right-multiplication, so `t.rotate(..); t.scale(..); t.translate(..)`
//! applies translate first in local space, matching the matrix stack the
//! interaction gizmos are built with.

use cgmath::{Deg, Matrix4, Rad, SquareMatrix, Vector3, Vector4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    /// Translation component of the matrix (world-space position).
    pub fn position(&self) -> Vector3<f32> {
        self.matrix.w.truncate()
    }

    pub fn translate(&mut self, offset: Vector3<f32>) -> &mut Self {
        self.matrix = self.matrix * Matrix4::from_translation(offset);
        self
    }

    pub fn rotate(&mut self, angle: Deg<f32>, axis: Vector3<f32>) -> &mut Self {
        self.matrix = self.matrix * Matrix4::from_axis_angle(axis, Rad::from(angle));
        self
    }

    pub fn scale_uniform(&mut self, factor: f32) -> &mut Self {
        self.matrix = self.matrix * Matrix4::from_scale(factor);
        self
    }

    pub fn scale(&mut self, factors: Vector3<f32>) -> &mut Self {
        self.matrix = self.matrix * Matrix4::from_nonuniform_scale(factors.x, factors.y, factors.z);
        self
    }

    /// Uniform scale about a fixed world-space point: translate the point to
    /// the origin, scale, translate back. Used by the scale gizmo so an actor
    /// grows about its own position.
    pub fn scale_about(&mut self, factor: f32, point: Vector3<f32>) -> &mut Self {
        self.matrix = Matrix4::from_translation(point)
            * Matrix4::from_scale(factor)
            * Matrix4::from_translation(-point)
            * self.matrix;
        self
    }

    /// Offset the world-space position directly, leaving rotation and scale
    /// untouched.
    pub fn translate_world(&mut self, offset: Vector3<f32>) -> &mut Self {
        self.matrix.w += Vector4::new(offset.x, offset.y, offset.z, 0.0);
        self
    }

    pub fn transform_point(&self, point: Vector3<f32>) -> Vector3<f32> {
        let out = self.matrix * Vector4::new(point.x, point.y, point.z, 1.0);
        out.truncate() / out.w
    }

    /// Apply only the linear part (rotation and scale) to a direction;
    /// translation does not contribute.
    pub fn transform_vector(&self, vector: Vector3<f32>) -> Vector3<f32> {
        (self.matrix * Vector4::new(vector.x, vector.y, vector.z, 0.0)).truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn translate_moves_position() {
        let mut t = Transform::identity();
        t.translate(Vector3::new(1.0, 2.0, 3.0));
        assert_close(t.position(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn composition_is_right_multiplied() {
        // scale then translate in local space: the translation is scaled
        let mut t = Transform::identity();
        t.scale_uniform(2.0).translate(Vector3::new(1.0, 0.0, 0.0));
        assert_close(t.position(), Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn scale_about_keeps_the_pivot_fixed() {
        let mut t = Transform::identity();
        t.translate(Vector3::new(3.0, 0.0, 0.0));
        let pivot = t.position();
        t.scale_about(2.0, pivot);
        assert_close(t.position(), pivot);
        // a local offset of 1 now spans 2 world units
        let p = t.transform_point(Vector3::new(1.0, 0.0, 0.0));
        assert_close(p, Vector3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn transform_vector_rotates_but_never_translates() {
        let mut t = Transform::identity();
        t.translate(Vector3::new(5.0, 0.0, 0.0));
        t.rotate(Deg(90.0), Vector3::unit_z());
        let v = t.transform_vector(Vector3::unit_x());
        assert_close(v, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn translate_world_ignores_local_rotation() {
        let mut t = Transform::identity();
        t.rotate(Deg(90.0), Vector3::unit_z());
        t.translate_world(Vector3::new(0.0, 1.0, 0.0));
        assert_close(t.position(), Vector3::new(0.0, 1.0, 0.0));
    }
}
