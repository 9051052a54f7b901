//! World container and render walk.
//!
//! A [`World`] composes one scene, one camera and one light, tracks the
//! selection, and walks its actors in insertion order emitting backend calls
//! in a fixed sequence: camera uniforms, then per actor the program lookup,
//! transform/material/light uniforms, then the draw.

use log::debug;

use crate::gfx::backend::{BufferHandle, GpuBackend, PrimitiveKind, UniformValue};
use crate::gfx::camera::Camera;
use crate::gfx::material::{Light, Material};
use crate::gfx::picking::Ray;
use crate::gfx::scene::{Actor, ActorHandle, DrawStyle, RenderStrategy, Scene};
use crate::gfx::shaders::{ProgramKey, ShaderRegistry};

/// Edge and point passes render unlit in this dark gray.
const EDGE_MATERIAL: Material = Material {
    emission: [0.0, 0.0, 0.0],
    ambient: [0.0, 0.0, 0.0],
    diffuse: [0.1, 0.1, 0.1],
    specular: [0.0, 0.0, 0.0],
    shininess: 1.0,
};

#[derive(Debug)]
pub struct World {
    pub scene: Scene,
    pub camera: Camera,
    pub light: Light,
    pub lighting: bool,
    selection: Option<ActorHandle>,
}

impl World {
    pub fn new(camera: Camera) -> Self {
        Self {
            scene: Scene::new(),
            camera,
            light: Light::default(),
            lighting: true,
            selection: None,
        }
    }

    /// Upload the actor's buffers and register it for rendering.
    pub fn add_actor(&mut self, mut actor: Actor, backend: &mut dyn GpuBackend) -> ActorHandle {
        actor.upload(backend);
        self.scene.add(actor)
    }

    /// Remove an actor, releasing its GPU buffers. A removed selection is
    /// cleared. Stale handles are a silent no-op.
    pub fn remove_actor(&mut self, handle: ActorHandle, backend: &mut dyn GpuBackend) {
        if let Some(mut actor) = self.scene.remove(handle) {
            actor.release(backend);
            if self.selection == Some(handle) {
                self.selection = None;
            }
        }
    }

    /// Select an actor; `None` deselects. A stale handle clears the selection
    /// rather than storing a dangling one.
    pub fn select(&mut self, handle: Option<ActorHandle>) {
        self.selection = handle.filter(|h| self.scene.contains(*h));
    }

    pub fn selected(&self) -> Option<ActorHandle> {
        // a handle can only dangle if callers bypass remove_actor, but
        // revalidating here keeps the invariant local
        self.selection.filter(|h| self.scene.contains(*h))
    }

    /// Closest selectable actor whose pick-factor-grown bounds the ray hits.
    pub fn pick(&self, ray: &Ray) -> Option<ActorHandle> {
        let mut best: Option<(f32, ActorHandle)> = None;
        for (handle, actor) in self.scene.iter() {
            if !actor.selectable {
                continue;
            }
            let Some(bounds) = actor.pick_bounds() else {
                continue;
            };
            if let Some(t) = bounds.intersect(ray) {
                if best.map_or(true, |(bt, _)| t < bt) {
                    best = Some((t, handle));
                }
            }
        }
        best.map(|(_, h)| h)
    }

    /// Remove every actor and release all buffers.
    pub fn clear(&mut self, backend: &mut dyn GpuBackend) {
        for mut actor in self.scene.drain() {
            actor.release(backend);
        }
        self.selection = None;
        debug!("world cleared");
    }

    /// World-space light position, following the camera for a head light.
    fn light_uniform(&self) -> UniformValue {
        let mut light = self.light;
        if light.head_light {
            let p = self.camera.position();
            light.position = [p.x, p.y, p.z, light.position[3]];
        }
        UniformValue::Light(light.to_uniform())
    }

    pub fn render(&self, backend: &mut dyn GpuBackend, registry: &ShaderRegistry) {
        let view: [[f32; 4]; 4] = self.camera.view_matrix().into();
        let projection: [[f32; 4]; 4] = self.camera.projection_matrix().into();
        let light = self.light_uniform();

        for (_, actor) in self.scene.iter() {
            self.render_actor(actor, backend, registry, view, projection, light);
        }
    }

    /// Render a single foreign actor (overlays) with this world's camera and
    /// light settings.
    pub fn render_extra(
        &self,
        actor: &Actor,
        camera: &Camera,
        backend: &mut dyn GpuBackend,
        registry: &ShaderRegistry,
    ) {
        let view: [[f32; 4]; 4] = camera.view_matrix().into();
        let projection: [[f32; 4]; 4] = camera.projection_matrix().into();
        self.render_actor(actor, backend, registry, view, projection, self.light_uniform());
    }

    fn render_actor(
        &self,
        actor: &Actor,
        backend: &mut dyn GpuBackend,
        registry: &ShaderRegistry,
        view: [[f32; 4]; 4],
        projection: [[f32; 4]; 4],
        light: UniformValue,
    ) {
        let Some(vertices) = actor.vertex_buffer() else {
            return;
        };

        let program = match actor.strategy() {
            RenderStrategy::TessellatedPatches => registry.patch_program(),
            _ => registry.lookup(ProgramKey {
                style: self.scene.draw_style,
                shading: self.scene.shading,
                colored: actor.colored(),
                textured: false,
                lit: self.lighting,
            }),
        };

        let model: [[f32; 4]; 4] = actor.transform.matrix().into();
        backend.set_uniform(program, "view", UniformValue::Mat4(view));
        backend.set_uniform(program, "projection", UniformValue::Mat4(projection));
        backend.set_uniform(program, "model", UniformValue::Mat4(model));
        backend.set_uniform(program, "light", light);

        let primitive = match self.scene.draw_style {
            DrawStyle::Points => PrimitiveKind::Points,
            DrawStyle::Wireframe => PrimitiveKind::Lines,
            DrawStyle::Solid | DrawStyle::SolidWithEdges => PrimitiveKind::Triangles,
        };

        match actor.strategy() {
            RenderStrategy::MultiMaterialRanged => {
                for range in actor.ranges() {
                    let material = actor.range_material(range);
                    backend.set_uniform(
                        program,
                        "material",
                        UniformValue::Material(material.to_uniform()),
                    );
                    backend.draw(program, primitive, vertices, range.start, range.end - range.start);
                }
            }
            RenderStrategy::ProceduralSingleMaterial => {
                backend.set_uniform(
                    program,
                    "material",
                    UniformValue::Material(actor.material.to_uniform()),
                );
                backend.draw(program, primitive, vertices, 0, actor.vertex_count());
            }
            RenderStrategy::ProceduralIndexed => {
                backend.set_uniform(
                    program,
                    "material",
                    UniformValue::Material(actor.material.to_uniform()),
                );
                match actor.index_buffer() {
                    Some(indices) => backend.draw_indexed(
                        program,
                        primitive,
                        vertices,
                        indices,
                        actor.index_count(),
                    ),
                    None => backend.draw(program, primitive, vertices, 0, actor.vertex_count()),
                }
            }
            RenderStrategy::TessellatedPatches => {
                backend.set_uniform(
                    program,
                    "material",
                    UniformValue::Material(actor.material.to_uniform()),
                );
                let levels = actor.levels();
                backend.set_uniform(program, "innerLevel", UniformValue::Int(levels.inner as i32));
                backend.set_uniform(program, "outerLevel", UniformValue::Int(levels.outer as i32));
                match actor.index_buffer() {
                    Some(indices) => backend.draw_indexed(
                        program,
                        PrimitiveKind::Patches,
                        vertices,
                        indices,
                        actor.index_count(),
                    ),
                    None => {
                        backend.draw(program, PrimitiveKind::Patches, vertices, 0, actor.vertex_count())
                    }
                }
            }
        }

        // solid-with-edges gets a second unlit line pass over the same buffers
        if self.scene.draw_style == DrawStyle::SolidWithEdges
            && actor.strategy() != RenderStrategy::TessellatedPatches
        {
            self.render_edges(actor, backend, registry, view, projection, vertices, model);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_edges(
        &self,
        actor: &Actor,
        backend: &mut dyn GpuBackend,
        registry: &ShaderRegistry,
        view: [[f32; 4]; 4],
        projection: [[f32; 4]; 4],
        vertices: BufferHandle,
        model: [[f32; 4]; 4],
    ) {
        let program = registry.lookup(ProgramKey {
            style: DrawStyle::Wireframe,
            shading: self.scene.shading,
            colored: false,
            textured: false,
            lit: false,
        });
        backend.set_uniform(program, "view", UniformValue::Mat4(view));
        backend.set_uniform(program, "projection", UniformValue::Mat4(projection));
        backend.set_uniform(program, "model", UniformValue::Mat4(model));
        backend.set_uniform(
            program,
            "material",
            UniformValue::Material(EDGE_MATERIAL.to_uniform()),
        );
        match (actor.strategy(), actor.index_buffer()) {
            (RenderStrategy::ProceduralIndexed, Some(indices)) => backend.draw_indexed(
                program,
                PrimitiveKind::Lines,
                vertices,
                indices,
                actor.index_count(),
            ),
            _ => backend.draw(program, PrimitiveKind::Lines, vertices, 0, actor.vertex_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::recording::{Call, RecordingBackend};
    use crate::gfx::geometry::primitives::cube;
    use crate::gfx::scene::{ShapeConfig, SphereConfig};
    use crate::gfx::shaders::initialize_shader_registry;
    use cgmath::Vector3;

    fn world() -> World {
        World::new(Camera::new(Vector3::new(0.0, 0.0, 3.5), 1.0))
    }

    fn named_cube(name: &str) -> Actor {
        let mut actor = Actor::shape(ShapeConfig::new(cube()));
        actor.name = Some(name.to_string());
        actor
    }

    #[test]
    fn actors_draw_in_insertion_order() {
        let mut backend = RecordingBackend::new();
        let registry = initialize_shader_registry(&mut backend).unwrap();
        let mut world = world();
        let mut first = named_cube("first");
        first.transform.translate(Vector3::new(-1.0, 0.0, 0.0));
        let a = world.add_actor(first, &mut backend);
        world.add_actor(named_cube("second"), &mut backend);

        backend.calls.clear();
        world.render(&mut backend, &registry);
        let draws: Vec<_> = backend.draw_calls().collect();
        assert_eq!(draws.len(), 2);

        // removing the first leaves only the second
        world.remove_actor(a, &mut backend);
        backend.calls.clear();
        world.render(&mut backend, &registry);
        assert_eq!(backend.draw_calls().count(), 1);
    }

    #[test]
    fn removing_the_selected_actor_clears_the_selection() {
        let mut backend = RecordingBackend::new();
        let mut world = world();
        let handle = world.add_actor(named_cube("a"), &mut backend);
        world.select(Some(handle));
        assert_eq!(world.selected(), Some(handle));
        world.remove_actor(handle, &mut backend);
        assert_eq!(world.selected(), None);
    }

    #[test]
    fn remove_releases_gpu_buffers() {
        let mut backend = RecordingBackend::new();
        let mut world = world();
        let handle = world.add_actor(
            Actor::sphere(SphereConfig::default()).unwrap(),
            &mut backend,
        );
        assert!(!backend.live_buffers.is_empty());
        world.remove_actor(handle, &mut backend);
        assert!(backend.live_buffers.is_empty());
    }

    #[test]
    fn pick_returns_the_closest_selectable_hit() {
        let mut backend = RecordingBackend::new();
        let mut world = world();

        let mut near = named_cube("near");
        near.transform.translate(Vector3::new(0.0, 0.0, 1.0));
        let mut far = named_cube("far");
        far.transform.translate(Vector3::new(0.0, 0.0, -1.0));
        let near_handle = world.add_actor(near, &mut backend);
        world.add_actor(far, &mut backend);

        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(world.pick(&ray), Some(near_handle));
    }

    #[test]
    fn unselectable_actors_never_pick() {
        let mut backend = RecordingBackend::new();
        let mut world = world();
        let mut actor = named_cube("background");
        actor.selectable = false;
        world.add_actor(actor, &mut backend);

        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(world.pick(&ray), None);
    }

    #[test]
    fn ranged_actor_sets_material_before_each_range_draw() {
        let mut backend = RecordingBackend::new();
        let registry = initialize_shader_registry(&mut backend).unwrap();
        let mut world = world();

        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\nusemtl blue\nf 1 3 2\n";
        let dir = std::env::temp_dir().join("polyview-world-test");
        std::fs::create_dir_all(&dir).unwrap();
        let obj_path = dir.join("two_ranges.obj");
        std::fs::write(&obj_path, obj).unwrap();
        let actor = Actor::from_obj(crate::gfx::scene::ObjConfig::new(&obj_path)).unwrap();
        world.add_actor(actor, &mut backend);

        backend.calls.clear();
        world.render(&mut backend, &registry);
        let draws: Vec<_> = backend.draw_calls().collect();
        assert_eq!(draws.len(), 2);
        for call in draws {
            if let Call::Draw { count, .. } = call {
                assert_eq!(*count, 3);
            }
        }
    }
}
