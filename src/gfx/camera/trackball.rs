//! Quaternion trackball.
//!
//! Planar mapping: a drag across the viewport rotates the scene about an axis
//! perpendicular to the drag direction, lying in the view plane. The rotation
//! accumulates in a quaternion that the world camera reads back (inverted)
//! every frame.

use std::time::Instant;

use cgmath::{InnerSpace, Point2, Quaternion, Rad, Rotation, Rotation3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    /// Pressed but not yet moved.
    Pressed(Point2<f32>),
    Dragging(Point2<f32>),
}

#[derive(Debug, Clone)]
pub struct Trackball {
    rotation: Quaternion<f32>,
    state: DragState,
    /// Spin axis of the most recent drag segment, in world space.
    axis: Vector3<f32>,
    /// Degrees per millisecond, measured over the last drag segment.
    angular_velocity: f32,
    last_move: Instant,
    /// While paused the trackball carries no inertial spin after release.
    paused: bool,
}

impl Default for Trackball {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackball {
    pub fn new() -> Self {
        Self {
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            state: DragState::Idle,
            axis: Vector3::unit_y(),
            angular_velocity: 0.0,
            last_move: Instant::now(),
            paused: true,
        }
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    /// Snap to an exact orientation, abandoning any drag in progress.
    pub fn reset(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
        self.state = DragState::Idle;
        self.angular_velocity = 0.0;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn press(&mut self, p: Point2<f32>) {
        self.state = DragState::Pressed(p);
        self.angular_velocity = 0.0;
        self.last_move = Instant::now();
    }

    pub fn move_to(&mut self, p: Point2<f32>) {
        let last = match self.state {
            DragState::Idle => return,
            DragState::Pressed(last) | DragState::Dragging(last) => last,
        };
        self.apply_segment(last, p);
        self.state = DragState::Dragging(p);
    }

    pub fn release(&mut self, p: Point2<f32>) {
        self.move_to(p);
        self.state = DragState::Idle;
    }

    /// Kill any drag and inertial spin immediately.
    pub fn stop(&mut self) {
        self.state = DragState::Idle;
        self.angular_velocity = 0.0;
    }

    /// Apply inertial spin accumulated before the last release. A no-op while
    /// paused, dragging, or at rest.
    pub fn advance(&mut self, elapsed_ms: f32) {
        if self.paused || self.state != DragState::Idle || self.angular_velocity == 0.0 {
            return;
        }
        let angle = cgmath::Deg(self.angular_velocity * elapsed_ms);
        self.rotation = Quaternion::from_axis_angle(self.axis, angle) * self.rotation;
    }

    fn apply_segment(&mut self, from: Point2<f32>, to: Point2<f32>) {
        let delta = to - from;
        let length = delta.magnitude();
        // a drag that returns to its start point contributes nothing
        if length == 0.0 {
            return;
        }

        let now = Instant::now();
        let elapsed_ms = (now - self.last_move).as_secs_f32() * 1000.0;
        self.last_move = now;

        // axis perpendicular to the drag, in the view plane, carried into the
        // already-rotated frame so successive segments compose intuitively
        let axis = Vector3::new(-delta.y, delta.x, 0.0).normalize();
        let axis = self.rotation.rotate_vector(axis);
        let angle = Rad(length);

        self.axis = axis;
        self.angular_velocity = if elapsed_ms > 0.0 {
            cgmath::Deg::from(angle).0 / elapsed_ms
        } else {
            0.0
        };
        self.rotation = Quaternion::from_axis_angle(axis, angle) * self.rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Point2};

    #[test]
    fn zero_length_drag_is_identity() {
        let mut tb = Trackball::new();
        let p = Point2::new(0.3, -0.2);
        tb.press(p);
        tb.move_to(p);
        tb.release(p);
        assert_eq!(tb.rotation(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn reset_returns_the_exact_quaternion() {
        let mut tb = Trackball::new();
        let q = Quaternion::from_axis_angle(Vector3::unit_x(), Deg(25.0))
            * Quaternion::from_axis_angle(Vector3::unit_y(), Deg(-50.0));
        tb.press(Point2::new(0.0, 0.0));
        tb.move_to(Point2::new(0.4, 0.1));
        tb.reset(q);
        assert_eq!(tb.rotation(), q);
    }

    #[test]
    fn horizontal_drag_spins_about_the_vertical_axis() {
        let mut tb = Trackball::new();
        tb.press(Point2::new(0.0, 0.0));
        tb.move_to(Point2::new(0.5, 0.0));
        tb.release(Point2::new(0.5, 0.0));

        let expected = Quaternion::from_axis_angle(Vector3::unit_y(), Rad(0.5));
        let got = tb.rotation();
        assert!((got.s - expected.s).abs() < 1e-5);
        assert!((got.v - expected.v).magnitude() < 1e-5);
    }

    #[test]
    fn move_without_press_does_nothing() {
        let mut tb = Trackball::new();
        tb.move_to(Point2::new(0.9, 0.9));
        assert_eq!(tb.rotation(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn stop_abandons_the_drag() {
        let mut tb = Trackball::new();
        tb.press(Point2::new(0.0, 0.0));
        tb.stop();
        tb.move_to(Point2::new(0.5, 0.5));
        assert_eq!(tb.rotation(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn paused_trackball_carries_no_inertia() {
        let mut tb = Trackball::new();
        tb.press(Point2::new(0.0, 0.0));
        tb.release(Point2::new(0.3, 0.0));
        let settled = tb.rotation();
        tb.advance(100.0);
        assert_eq!(tb.rotation(), settled);
    }
}
