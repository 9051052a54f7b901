//! Orientation gnomon.
//!
//! Three axis arrows drawn after the main scene with their own camera. The
//! overlay camera never translates; it copies the world camera's rotation
//! each frame so the arrows always mirror the scene orientation.

use cgmath::{Deg, Vector3};

use crate::gfx::backend::GpuBackend;
use crate::gfx::camera::Camera;
use crate::gfx::geometry::primitives::{cone, cylinder};
use crate::gfx::material::Material;
use crate::gfx::scene::{Actor, Group, ShapeConfig, World};
use crate::gfx::shaders::ShaderRegistry;

pub const AXIS_X_COLOR: [f32; 3] = [1.0, 0.0, 0.0];
pub const AXIS_Y_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
pub const AXIS_Z_COLOR: [f32; 3] = [0.0, 0.47, 0.78];

const SHAFT_LENGTH: f32 = 0.8;
const SHAFT_RADIUS: f32 = 0.03;
const TIP_LENGTH: f32 = 0.2;
const TIP_RADIUS: f32 = 0.08;
const RESOLUTION: u32 = 12;

pub fn axis_material(color: [f32; 3]) -> Material {
    Material {
        diffuse: color,
        ambient: [color[0] * 0.2, color[1] * 0.2, color[2] * 0.2],
        specular: [0.5, 0.5, 0.5],
        shininess: 76.8,
        ..Material::default()
    }
}

/// Rotation taking the +Y-aligned primitives onto each axis; `None` is the
/// identity for Y itself.
fn axis_rotation(axis: usize) -> Option<(Deg<f32>, Vector3<f32>)> {
    match axis {
        0 => Some((Deg(-90.0), Vector3::unit_z())),
        2 => Some((Deg(90.0), Vector3::unit_x())),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Gnomon {
    camera: Camera,
    axes: Group,
}

impl Gnomon {
    pub fn new() -> Self {
        let mut axes = Group::new();
        let colors = [AXIS_X_COLOR, AXIS_Y_COLOR, AXIS_Z_COLOR];
        for (axis, color) in colors.into_iter().enumerate() {
            let material = axis_material(color);

            let mut shaft = Actor::shape(ShapeConfig {
                mesh: cylinder(SHAFT_RADIUS, SHAFT_LENGTH, RESOLUTION),
                material,
                name: None,
                selectable: false,
            });
            if let Some((angle, about)) = axis_rotation(axis) {
                shaft.transform.rotate(angle, about);
            }
            shaft
                .transform
                .translate(Vector3::new(0.0, SHAFT_LENGTH * 0.5, 0.0));
            axes.add(shaft);

            let mut tip = Actor::shape(ShapeConfig {
                mesh: cone(TIP_RADIUS, TIP_LENGTH, RESOLUTION),
                material,
                name: None,
                selectable: false,
            });
            if let Some((angle, about)) = axis_rotation(axis) {
                tip.transform.rotate(angle, about);
            }
            tip.transform
                .translate(Vector3::new(0.0, SHAFT_LENGTH + TIP_LENGTH * 0.5, 0.0));
            axes.add(tip);
        }

        Self {
            camera: Camera::new(Vector3::new(0.0, 0.0, 3.0), 1.0),
            axes,
        }
    }

    pub fn upload(&mut self, backend: &mut dyn GpuBackend) {
        for actor in self.axes.iter_mut() {
            actor.upload(backend);
        }
    }

    /// Copy the world camera's rotation; the overlay position stays fixed.
    pub fn sync(&mut self, world_camera: &Camera) {
        self.camera.set_orientation(world_camera.orientation());
    }

    pub fn render(&self, world: &World, backend: &mut dyn GpuBackend, registry: &ShaderRegistry) {
        for actor in self.axes.iter() {
            world.render_extra(actor, &self.camera, backend, registry);
        }
    }

    pub fn axes(&self) -> &Group {
        &self.axes
    }
}

impl Default for Gnomon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Quaternion, Rotation3};

    #[test]
    fn gnomon_has_three_arrows() {
        let gnomon = Gnomon::new();
        assert_eq!(gnomon.axes().len(), 6); // shaft + tip per axis
        assert!(gnomon.axes().iter().all(|a| !a.selectable));
    }

    #[test]
    fn tips_sit_on_their_axes() {
        let gnomon = Gnomon::new();
        let tips: Vec<_> = gnomon.axes().iter().skip(1).step_by(2).collect();
        let expected = [
            Vector3::unit_x(),
            Vector3::unit_y(),
            Vector3::unit_z(),
        ];
        for (tip, axis) in tips.iter().zip(expected) {
            let p = tip.position();
            assert!(p.dot(axis) > SHAFT_LENGTH - 1e-4, "{p:?} not along {axis:?}");
            assert!((p - axis * p.dot(axis)).magnitude() < 1e-4);
        }
    }

    #[test]
    fn sync_copies_rotation_but_not_position() {
        let mut gnomon = Gnomon::new();
        let mut world_camera = Camera::new(Vector3::new(1.0, 2.0, 3.0), 1.0);
        world_camera
            .set_orientation(Quaternion::from_axis_angle(Vector3::unit_y(), Deg(40.0)));
        let before = gnomon.camera.position();
        gnomon.sync(&world_camera);
        assert_eq!(gnomon.camera.orientation(), world_camera.orientation());
        assert_eq!(gnomon.camera.position(), before);
    }
}
