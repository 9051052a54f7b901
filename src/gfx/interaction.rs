//! Interaction state machine.
//!
//! One controller owns the whole pointer/keyboard protocol: trackball
//! rotation, pick-based selection, the axis gizmos and their drag gestures,
//! and the discrete camera/view commands. States move
//! `Free -> Selected -> Gizmo` and back; everything that mutates the scene
//! goes through a [`World`] plus a [`GpuBackend`].

use cgmath::{Deg, InnerSpace, Point2, Quaternion, Rotation, Rotation3, Vector3};
use log::debug;

use crate::gfx::backend::GpuBackend;
use crate::gfx::camera::Trackball;
use crate::gfx::geometry::primitives::{cone, cube, cylinder};
use crate::gfx::gnomon::{axis_material, AXIS_X_COLOR, AXIS_Y_COLOR, AXIS_Z_COLOR};
use crate::gfx::picking::screen_to_ray;
use crate::gfx::scene::{Actor, ActorHandle, ManipulationState, ShapeConfig, World};

/// Gizmo part size per unit of target scale.
const AXIS_SCALE: f32 = 2.5;
/// Translate-tip distance per unit of target scale.
const REACH: f32 = 37.5;
const GIZMO_RESOLUTION: u32 = 12;
/// Drag length to gesture amount conversion.
const GESTURE_GAIN: f32 = 3.0;
const PAN_SPEED: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X = 1,
    Y = 2,
    Z = 3,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn direction(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::unit_x(),
            Axis::Y => Vector3::unit_y(),
            Axis::Z => Vector3::unit_z(),
        }
    }

    pub fn color(self) -> [f32; 3] {
        match self {
            Axis::X => AXIS_X_COLOR,
            Axis::Y => AXIS_Y_COLOR,
            Axis::Z => AXIS_Z_COLOR,
        }
    }

    /// Rotation taking +Y-aligned gizmo parts onto this axis.
    fn rotation(self) -> Option<(Deg<f32>, Vector3<f32>)> {
        match self {
            Axis::X => Some((Deg(-90.0), Vector3::unit_z())),
            Axis::Y => None,
            Axis::Z => Some((Deg(90.0), Vector3::unit_x())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoMode {
    Scale,
    Translate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDirection {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
    Home,
}

impl ViewDirection {
    /// Scene rotation for the trackball; the camera applies the inverse.
    pub fn rotation(self) -> Quaternion<f32> {
        let x = Vector3::unit_x();
        let y = Vector3::unit_y();
        match self {
            ViewDirection::Front => Quaternion::new(1.0, 0.0, 0.0, 0.0),
            ViewDirection::Back => Quaternion::from_axis_angle(y, Deg(180.0)),
            ViewDirection::Left => Quaternion::from_axis_angle(y, Deg(-90.0)),
            ViewDirection::Right => Quaternion::from_axis_angle(y, Deg(90.0)),
            ViewDirection::Top => Quaternion::from_axis_angle(x, Deg(90.0)),
            ViewDirection::Bottom => Quaternion::from_axis_angle(x, Deg(-90.0)),
            ViewDirection::Home => {
                Quaternion::from_axis_angle(x, Deg(25.0))
                    * Quaternion::from_axis_angle(y, Deg(-50.0))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Free,
    Selected(ActorHandle),
    Gizmo {
        target: ActorHandle,
        mode: GizmoMode,
        axis: Option<Axis>,
        drag_start: Option<Point2<f32>>,
    },
}

#[derive(Debug)]
pub struct InteractionController {
    state: State,
    pub trackball: Trackball,
    /// Spawned gizmo actors, two per axis (handle then shaft).
    gizmos: Vec<(Axis, ActorHandle)>,
    rotating: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        let mut trackball = Trackball::new();
        trackball.reset(ViewDirection::Home.rotation());
        Self {
            state: State::Free,
            trackball,
            gizmos: Vec::new(),
            rotating: false,
        }
    }

    pub fn selected(&self) -> Option<ActorHandle> {
        match self.state {
            State::Free => None,
            State::Selected(h) => Some(h),
            State::Gizmo { target, .. } => Some(target),
        }
    }

    pub fn active_axis(&self) -> Option<Axis> {
        match self.state {
            State::Gizmo { axis, .. } => axis,
            _ => None,
        }
    }

    /// Push the accumulated trackball rotation onto the world camera. Called
    /// once per frame before rendering.
    pub fn sync_camera(&self, world: &mut World) {
        world.camera.set_orientation(self.trackball.rotation().invert());
    }

    /// If the selection was removed out from under us, abandon any gizmo drag
    /// and fall back to `Free` without applying a partial gesture.
    pub fn revalidate(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        if let Some(target) = self.selected() {
            if !world.scene.contains(target) {
                debug!("selection vanished; abandoning interaction state");
                self.remove_gizmos(world, backend);
                self.state = State::Free;
                world.select(None);
            }
        }
    }

    // ------------------------------------------------------------------
    // pointer protocol

    /// `pick` is true when the pick modifier (shift) is held.
    pub fn pointer_pressed(
        &mut self,
        world: &mut World,
        backend: &mut dyn GpuBackend,
        p: Point2<f32>,
        pick: bool,
    ) {
        if let State::Gizmo {
            axis: Some(_),
            ref mut drag_start,
            ..
        } = self.state
        {
            if !pick {
                *drag_start = Some(p);
                return;
            }
        }

        if pick {
            self.pick_at(world, backend, p);
        } else {
            self.rotating = true;
            self.trackball.press(p);
        }
    }

    pub fn pointer_moved(&mut self, world: &mut World, p: Point2<f32>) {
        if self.rotating {
            self.trackball.move_to(p);
            self.sync_camera(world);
        }
    }

    pub fn pointer_released(
        &mut self,
        world: &mut World,
        backend: &mut dyn GpuBackend,
        p: Point2<f32>,
    ) {
        if self.rotating {
            self.trackball.release(p);
            self.sync_camera(world);
            self.rotating = false;
            return;
        }

        if let State::Gizmo {
            target,
            mode,
            axis: Some(axis),
            drag_start: Some(start),
        } = self.state
        {
            let amount = gesture_amount(start, p);
            self.apply_gesture(world, backend, target, mode, axis, amount);
            if let State::Gizmo { drag_start, .. } = &mut self.state {
                *drag_start = None;
            }
        }
    }

    /// Pan the camera in its view plane (right-button drag).
    pub fn pan(&mut self, world: &mut World, delta: Point2<f32>) {
        let offset = world
            .camera
            .orientation()
            .rotate_vector(Vector3::new(-delta.x, -delta.y, 0.0) * PAN_SPEED);
        let position = world.camera.position() + offset;
        world.camera.set_position(position);
    }

    pub fn scroll(&mut self, world: &mut World, delta: f32) {
        world.camera.zoom(delta);
    }

    fn pick_at(&mut self, world: &mut World, backend: &mut dyn GpuBackend, p: Point2<f32>) {
        let Some(ray) = screen_to_ray(p.x, p.y, &world.camera) else {
            return;
        };
        let hit = world.pick(&ray);

        // a hit on a gizmo part selects its axis instead of changing selection
        if let Some(handle) = hit {
            if let Some(axis) = self.gizmo_axis(handle) {
                self.set_active_axis(world, axis);
                return;
            }
        }

        match hit {
            Some(handle) => {
                self.remove_gizmos(world, backend);
                world.select(Some(handle));
                self.state = State::Selected(handle);
                debug!("selected actor {handle:?}");
            }
            None => {
                self.remove_gizmos(world, backend);
                world.select(None);
                self.state = State::Free;
            }
        }
    }

    fn gizmo_axis(&self, handle: ActorHandle) -> Option<Axis> {
        self.gizmos
            .iter()
            .find(|(_, h)| *h == handle)
            .map(|(a, _)| *a)
    }

    fn set_active_axis(&mut self, world: &mut World, axis: Axis) {
        if let State::Gizmo {
            axis: ref mut active,
            ..
        } = self.state
        {
            *active = Some(axis);
            // brighten the chosen axis, restore the others
            for (a, handle) in &self.gizmos {
                if let Some(actor) = world.scene.get_mut(*handle) {
                    let color = a.color();
                    actor.material = axis_material(color);
                    if *a == axis {
                        actor.material.emission =
                            [color[0] * 0.4, color[1] * 0.4, color[2] * 0.4];
                    }
                }
            }
            debug!("active gizmo axis: {axis:?}");
        }
    }

    // ------------------------------------------------------------------
    // gizmo lifecycle

    /// Choose the active gizmo axis directly (keyboard path). A no-op outside
    /// gizmo mode.
    pub fn select_axis(&mut self, world: &mut World, axis: Axis) {
        self.set_active_axis(world, axis);
    }

    /// Enter scale mode. A no-op without a selection.
    pub fn begin_scale(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        self.begin_gizmo(world, backend, GizmoMode::Scale);
    }

    /// Enter translate mode. A no-op without a selection.
    pub fn begin_translate(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        self.begin_gizmo(world, backend, GizmoMode::Translate);
    }

    fn begin_gizmo(&mut self, world: &mut World, backend: &mut dyn GpuBackend, mode: GizmoMode) {
        let Some(target) = self.selected() else {
            return;
        };
        self.remove_gizmos(world, backend);

        let (scale, position) = match world.scene.get(target) {
            Some(actor) => (actor.scale_factor, actor.position()),
            None => return,
        };
        if let Some(actor) = world.scene.get_mut(target) {
            actor.manipulation = match mode {
                GizmoMode::Scale => ManipulationState::Scaling,
                GizmoMode::Translate => ManipulationState::Translating,
            };
        }

        for axis in Axis::ALL {
            for mut part in gizmo_parts(mode, axis, scale) {
                part.transform.translate_world(position);
                let handle = world.add_actor(part, backend);
                self.gizmos.push((axis, handle));
            }
        }
        self.state = State::Gizmo {
            target,
            mode,
            axis: None,
            drag_start: None,
        };
        debug!("entered {mode:?} mode with {} gizmo parts", self.gizmos.len());
    }

    /// Leave gizmo mode, keeping the selection.
    pub fn finish_manipulation(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        if let State::Gizmo { target, .. } = self.state {
            self.remove_gizmos(world, backend);
            if let Some(actor) = world.scene.get_mut(target) {
                actor.manipulation = ManipulationState::None;
            }
            self.state = State::Selected(target);
        }
    }

    pub fn deselect(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        self.remove_gizmos(world, backend);
        if let Some(target) = self.selected() {
            if let Some(actor) = world.scene.get_mut(target) {
                actor.manipulation = ManipulationState::None;
            }
        }
        world.select(None);
        self.state = State::Free;
    }

    pub fn delete_selected(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        let Some(target) = self.selected() else {
            return;
        };
        self.remove_gizmos(world, backend);
        world.remove_actor(target, backend);
        self.state = State::Free;
    }

    fn remove_gizmos(&mut self, world: &mut World, backend: &mut dyn GpuBackend) {
        for (_, handle) in self.gizmos.drain(..) {
            world.remove_actor(handle, backend);
        }
    }

    fn apply_gesture(
        &mut self,
        world: &mut World,
        backend: &mut dyn GpuBackend,
        target: ActorHandle,
        mode: GizmoMode,
        axis: Axis,
        amount: f32,
    ) {
        match mode {
            GizmoMode::Scale => {
                let factor = if amount < 0.0 { -1.0 / amount } else { amount };
                if factor == 0.0 {
                    return;
                }
                if let Some(actor) = world.scene.get_mut(target) {
                    let pivot = actor.position();
                    actor.transform.scale_about(factor, pivot);
                    actor.scale_factor *= factor;
                    debug!("scaled actor by {factor}");
                }
                // the gizmo is sized by the scale factor; rebuild it
                let previous_axis = self.active_axis();
                self.begin_gizmo(world, backend, GizmoMode::Scale);
                if let Some(axis) = previous_axis {
                    self.set_active_axis(world, axis);
                }
            }
            GizmoMode::Translate => {
                // the gesture offsets along the actor's local axis; the gizmo
                // parts follow by the same world-space displacement
                let Some(offset) = world
                    .scene
                    .get(target)
                    .map(|a| a.transform.transform_vector(axis.direction() * amount))
                else {
                    return;
                };
                if let Some(actor) = world.scene.get_mut(target) {
                    actor.transform.translate_world(offset);
                    debug!("translated actor by {offset:?}");
                }
                for (_, handle) in &self.gizmos {
                    if let Some(actor) = world.scene.get_mut(*handle) {
                        actor.transform.translate_world(offset);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // discrete commands

    /// Snap the trackball to a canonical view and push it onto the camera.
    pub fn set_view(&mut self, world: &mut World, view: ViewDirection) {
        self.trackball.reset(view.rotation());
        self.sync_camera(world);
    }
}

/// Signed gesture amount: proportional to drag length, negative for a
/// leftward drag.
fn gesture_amount(start: Point2<f32>, end: Point2<f32>) -> f32 {
    let amount = GESTURE_GAIN * (end - start).magnitude();
    if start.x > end.x {
        -amount
    } else {
        amount
    }
}

/// The drawable parts of one gizmo axis, in local gizmo space (the target's
/// position is added afterwards). Scale mode gets a cube handle on a short
/// shaft, translate mode a cone tip on a long one.
fn gizmo_parts(mode: GizmoMode, axis: Axis, scale: f32) -> Vec<Actor> {
    let asc = AXIS_SCALE * scale;
    let reach = REACH * scale;
    let material = axis_material(axis.color());

    let part = |mesh, offset: f32, part_scale: Option<f32>| {
        let mut actor = Actor::shape(ShapeConfig {
            mesh,
            material,
            name: None,
            selectable: true,
        });
        if let Some((angle, about)) = axis.rotation() {
            actor.transform.rotate(angle, about);
        }
        actor.transform.translate(Vector3::new(0.0, offset, 0.0));
        if let Some(s) = part_scale {
            actor.transform.scale_uniform(s);
        }
        actor.pick_factor = 1.5;
        actor
    };

    match mode {
        GizmoMode::Scale => vec![
            part(cube(), reach * 0.5, Some(asc)),
            part(
                cylinder(0.1 * asc, reach * 0.5, GIZMO_RESOLUTION),
                reach * 0.25,
                None,
            ),
        ],
        GizmoMode::Translate => vec![
            part(cone(0.5 * asc, 1.5 * asc, GIZMO_RESOLUTION), reach, None),
            part(
                cylinder(0.1 * asc, reach, GIZMO_RESOLUTION),
                reach * 0.5,
                None,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::recording::RecordingBackend;
    use crate::gfx::camera::Camera;
    use crate::gfx::scene::SphereConfig;

    fn setup() -> (World, RecordingBackend, InteractionController) {
        let world = World::new(Camera::new(Vector3::new(0.0, 0.0, 3.5), 1.0));
        (world, RecordingBackend::new(), InteractionController::new())
    }

    fn add_sphere(world: &mut World, backend: &mut RecordingBackend) -> ActorHandle {
        world.add_actor(
            Actor::sphere(SphereConfig::default()).unwrap(),
            backend,
        )
    }

    fn select(
        controller: &mut InteractionController,
        world: &mut World,
        handle: ActorHandle,
    ) {
        world.select(Some(handle));
        controller.state = State::Selected(handle);
    }

    #[test]
    fn gizmo_entry_without_selection_is_a_no_op() {
        let (mut world, mut backend, mut controller) = setup();
        add_sphere(&mut world, &mut backend);
        let before = world.scene.len();
        controller.begin_scale(&mut world, &mut backend);
        controller.begin_translate(&mut world, &mut backend);
        assert_eq!(world.scene.len(), before);
    }

    #[test]
    fn scale_mode_spawns_six_gizmo_parts() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_scale(&mut world, &mut backend);
        assert_eq!(world.scene.len(), 7); // sphere + 2 parts per axis
        assert_eq!(
            world.scene.get(handle).unwrap().manipulation,
            ManipulationState::Scaling
        );
        controller.finish_manipulation(&mut world, &mut backend);
        assert_eq!(world.scene.len(), 1);
        assert_eq!(controller.selected(), Some(handle));
    }

    #[test]
    fn scale_gesture_doubles_and_halves() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_scale(&mut world, &mut backend);

        // pick the X handle directly, then drag right by 2/3: amt = +2
        controller.state = match controller.state {
            State::Gizmo { target, mode, .. } => State::Gizmo {
                target,
                mode,
                axis: Some(Axis::X),
                drag_start: None,
            },
            other => other,
        };
        controller.pointer_pressed(&mut world, &mut backend, Point2::new(0.0, 0.0), false);
        controller.pointer_released(&mut world, &mut backend, Point2::new(2.0 / 3.0, 0.0));
        assert!((world.scene.get(handle).unwrap().scale_factor - 2.0).abs() < 1e-5);

        // drag left by 2/3: amt = -2, so the factor is 1/2
        controller.state = match controller.state {
            State::Gizmo { target, mode, .. } => State::Gizmo {
                target,
                mode,
                axis: Some(Axis::X),
                drag_start: None,
            },
            other => other,
        };
        controller.pointer_pressed(&mut world, &mut backend, Point2::new(2.0 / 3.0, 0.0), false);
        controller.pointer_released(&mut world, &mut backend, Point2::new(0.0, 0.0));
        assert!((world.scene.get(handle).unwrap().scale_factor - 1.0).abs() < 1e-5);
    }

    #[test]
    fn translate_gesture_moves_along_the_chosen_axis() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_translate(&mut world, &mut backend);
        controller.state = match controller.state {
            State::Gizmo { target, mode, .. } => State::Gizmo {
                target,
                mode,
                axis: Some(Axis::Y),
                drag_start: None,
            },
            other => other,
        };
        controller.pointer_pressed(&mut world, &mut backend, Point2::new(0.0, 0.0), false);
        controller.pointer_released(&mut world, &mut backend, Point2::new(1.0 / 3.0, 0.0));

        let p = world.scene.get(handle).unwrap().position();
        assert!((p - Vector3::new(0.0, 1.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn translate_gesture_follows_the_actor_local_axis() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        // local X points along world +Y after this rotation
        world
            .scene
            .get_mut(handle)
            .unwrap()
            .transform
            .rotate(Deg(90.0), Vector3::unit_z());
        select(&mut controller, &mut world, handle);
        controller.begin_translate(&mut world, &mut backend);
        controller.state = match controller.state {
            State::Gizmo { target, mode, .. } => State::Gizmo {
                target,
                mode,
                axis: Some(Axis::X),
                drag_start: None,
            },
            other => other,
        };
        controller.pointer_pressed(&mut world, &mut backend, Point2::new(0.0, 0.0), false);
        controller.pointer_released(&mut world, &mut backend, Point2::new(1.0 / 3.0, 0.0));

        let p = world.scene.get(handle).unwrap().position();
        assert!((p - Vector3::new(0.0, 1.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn external_removal_abandons_the_drag() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_scale(&mut world, &mut backend);
        world.remove_actor(handle, &mut backend);
        controller.revalidate(&mut world, &mut backend);
        assert_eq!(controller.selected(), None);
        assert!(world.scene.is_empty());
    }

    #[test]
    fn delete_selected_removes_actor_and_gizmos() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_translate(&mut world, &mut backend);
        controller.delete_selected(&mut world, &mut backend);
        assert!(world.scene.is_empty());
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn axis_keys_choose_the_active_axis() {
        let (mut world, mut backend, mut controller) = setup();
        let handle = add_sphere(&mut world, &mut backend);
        select(&mut controller, &mut world, handle);
        controller.begin_scale(&mut world, &mut backend);
        controller.select_axis(&mut world, Axis::Z);
        assert_eq!(controller.active_axis(), Some(Axis::Z));

        // ignored once gizmo mode ends
        controller.finish_manipulation(&mut world, &mut backend);
        controller.select_axis(&mut world, Axis::X);
        assert_eq!(controller.active_axis(), None);
    }

    #[test]
    fn home_view_matches_the_canonical_rotation() {
        let (mut world, _backend, mut controller) = setup();
        controller.set_view(&mut world, ViewDirection::Home);
        let expected = Quaternion::from_axis_angle(Vector3::unit_x(), Deg(25.0))
            * Quaternion::from_axis_angle(Vector3::unit_y(), Deg(-50.0));
        assert_eq!(controller.trackball.rotation(), expected);
        assert_eq!(world.camera.orientation(), expected.invert());
    }
}
