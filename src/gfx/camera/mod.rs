//! Camera state and projection math.
//!
//! One [`Camera`] per world plus an independent one for the gnomon overlay;
//! the two share rotation but not position. Orientation is quaternion-based
//! and driven by the [`Trackball`](trackball::Trackball).

pub mod trackball;

pub use trackball::Trackball;

use cgmath::{ortho, perspective, InnerSpace, Matrix4, Quaternion, Rad, Rotation, Vector3};

/// wgpu clip space spans z in [0, 1] where OpenGL-style projections produce
/// [-1, 1]; this matrix remaps depth after projection.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    Perspective,
    Orthographic,
}

/// In-memory snapshot of the camera parameters for store/recall.
#[derive(Debug, Clone, Copy)]
pub struct CameraSnapshot {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub lens: Lens,
    pub focal_distance: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    position: Vector3<f32>,
    orientation: Quaternion<f32>,
    lens: Lens,
    focal_distance: f32,
    aspect: f32,
    fovy: Rad<f32>,
    /// Projection height for the orthographic lens.
    height: f32,
    znear: f32,
    zfar: f32,
    home: CameraSnapshot,
    recalled: CameraSnapshot,
}

impl Camera {
    /// Creates a camera at `home_position` looking down -Z with identity
    /// orientation. The construction state doubles as the home snapshot.
    pub fn new(home_position: Vector3<f32>, aspect: f32) -> Self {
        let home = CameraSnapshot {
            position: home_position,
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            lens: Lens::Perspective,
            focal_distance: home_position.magnitude().max(0.1),
            height: 2.25,
        };
        Self {
            position: home.position,
            orientation: home.orientation,
            lens: home.lens,
            focal_distance: home.focal_distance,
            aspect,
            fovy: Rad(std::f32::consts::FRAC_PI_4),
            height: home.height,
            znear: 0.1,
            zfar: 1000.0,
            home,
            recalled: home,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation;
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn set_lens(&mut self, lens: Lens) {
        self.lens = lens;
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    pub fn set_focal_distance(&mut self, distance: f32) {
        self.focal_distance = distance.max(f32::EPSILON);
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = if aspect > 0.0 { aspect } else { 1.0 };
    }

    /// Unit vector the camera looks along.
    pub fn view_direction(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(-Vector3::unit_z())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.orientation.invert()) * Matrix4::from_translation(-self.position)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let proj = match self.lens {
            Lens::Perspective => perspective(self.fovy, self.aspect, self.znear, self.zfar),
            Lens::Orthographic => {
                let half_h = self.height * 0.5;
                let half_w = half_h * self.aspect;
                ortho(-half_w, half_w, -half_h, half_h, self.znear, self.zfar)
            }
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Grow or shrink the orthographic projection height.
    pub fn scale_height(&mut self, factor: f32) {
        self.height *= factor;
    }

    /// Zoom by a scroll delta.
    ///
    /// Perspective lens: the focal distance changes multiplicatively
    /// (`exp(delta)`) and the camera moves along its view direction so the
    /// focal point stays fixed. Orthographic lens: a dolly has no visible
    /// effect, so only the projection height is scaled.
    pub fn zoom(&mut self, delta: f32) {
        let factor = delta.exp();
        match self.lens {
            Lens::Orthographic => self.scale_height(factor),
            Lens::Perspective => {
                let old = self.focal_distance;
                let new = old * factor;
                let direction = self.view_direction();
                self.position += (new - old) * -direction;
                self.focal_distance = new;
            }
        }
    }

    fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position,
            orientation: self.orientation,
            lens: self.lens,
            focal_distance: self.focal_distance,
            height: self.height,
        }
    }

    fn apply(&mut self, snapshot: CameraSnapshot) {
        self.position = snapshot.position;
        self.orientation = snapshot.orientation;
        self.lens = snapshot.lens;
        self.focal_distance = snapshot.focal_distance;
        self.height = snapshot.height;
    }

    /// Store the current parameters for a later [`Camera::recall`].
    pub fn store(&mut self) {
        self.recalled = self.snapshot();
    }

    pub fn recall(&mut self) {
        self.apply(self.recalled);
    }

    pub fn reset(&mut self) {
        self.apply(self.home);
    }
}
