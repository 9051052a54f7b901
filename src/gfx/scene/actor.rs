//! Drawable actors.
//!
//! An [`Actor`] owns one mesh, one transform, its material(s) and the GPU
//! buffers derived from them. Construction goes through per-shape config
//! structs so every default is written down in one place.

use std::collections::HashMap;
use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

use crate::error::Result;
use crate::gfx::backend::{BufferHandle, GpuBackend};
use crate::gfx::geometry::obj::{load_obj, MaterialRange};
use crate::gfx::geometry::sphere::{icosphere_patches, polar_sphere, TessellationLevels};
use crate::gfx::geometry::MeshData;
use crate::gfx::material::Material;
use crate::gfx::picking::Aabb;
use crate::gfx::transform::Transform;

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// How the renderer turns an actor's buffers into draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Flat (non-indexed) vertex buffer, one material for the whole mesh.
    ProceduralSingleMaterial,
    /// Indexed vertex buffer, one material.
    ProceduralIndexed,
    /// Flat buffer partitioned into contiguous per-material vertex ranges.
    MultiMaterialRanged,
    /// Patch control points subdivided on the GPU.
    TessellatedPatches,
}

/// Which manipulation gesture currently targets the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulationState {
    #[default]
    None,
    Scaling,
    Rotating,
    Translating,
}

#[derive(Debug, Clone, Copy)]
struct GpuBuffers {
    vertices: BufferHandle,
    indices: Option<BufferHandle>,
}

/// Indexed polar sphere.
#[derive(Debug, Clone)]
pub struct SphereConfig {
    pub radius: f32,
    pub horizontal_segments: u32,
    pub vertical_segments: u32,
    pub material: Material,
    pub name: Option<String>,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            horizontal_segments: 24,
            vertical_segments: 24,
            material: Material::default(),
            name: None,
        }
    }
}

/// GPU-tessellated icosahedron sphere.
#[derive(Debug, Clone)]
pub struct IcosphereConfig {
    pub radius: f32,
    pub levels: TessellationLevels,
    pub material: Material,
    pub name: Option<String>,
}

impl Default for IcosphereConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            levels: TessellationLevels::new(4, 4),
            material: Material::default(),
            name: None,
        }
    }
}

/// Wavefront OBJ with optional MTL companion.
#[derive(Debug, Clone)]
pub struct ObjConfig {
    pub obj_path: PathBuf,
    pub mtl_path: Option<PathBuf>,
    /// Applied to every position while loading.
    pub scale: f32,
    pub name: Option<String>,
}

impl ObjConfig {
    pub fn new(obj_path: impl Into<PathBuf>) -> Self {
        Self {
            obj_path: obj_path.into(),
            mtl_path: None,
            scale: 1.0,
            name: None,
        }
    }
}

/// Any prebuilt [`MeshData`] (gizmo and gnomon parts use this).
#[derive(Debug, Clone)]
pub struct ShapeConfig {
    pub mesh: MeshData,
    pub material: Material,
    pub name: Option<String>,
    pub selectable: bool,
}

impl ShapeConfig {
    pub fn new(mesh: MeshData) -> Self {
        Self {
            mesh,
            material: Material::default(),
            name: None,
            selectable: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub name: Option<String>,
    mesh: MeshData,
    pub transform: Transform,
    pub material: Material,
    pub selectable: bool,
    /// Bounding-box growth applied during picking.
    pub pick_factor: f32,
    /// Cumulative uniform scale applied by manipulation; sizes the gizmos.
    pub scale_factor: f32,
    pub manipulation: ManipulationState,
    strategy: RenderStrategy,
    ranges: Vec<MaterialRange>,
    materials: HashMap<String, Material>,
    levels: TessellationLevels,
    local_bounds: Option<Aabb>,
    gpu: Option<GpuBuffers>,
}

impl Actor {
    fn from_mesh(mesh: MeshData, material: Material, strategy: RenderStrategy) -> Self {
        let local_bounds = Aabb::from_points(&mesh.positions);
        Self {
            name: None,
            mesh,
            transform: Transform::identity(),
            material,
            selectable: true,
            pick_factor: 1.0,
            scale_factor: 1.0,
            manipulation: ManipulationState::None,
            strategy,
            ranges: Vec::new(),
            materials: HashMap::new(),
            levels: TessellationLevels::new(1, 1),
            local_bounds,
            gpu: None,
        }
    }

    pub fn sphere(config: SphereConfig) -> Result<Self> {
        let mesh = polar_sphere(
            config.radius,
            config.horizontal_segments,
            config.vertical_segments,
        )?;
        let mut actor = Self::from_mesh(mesh, config.material, RenderStrategy::ProceduralIndexed);
        actor.name = config.name;
        Ok(actor)
    }

    pub fn icosphere(config: IcosphereConfig) -> Self {
        let mesh = icosphere_patches(config.radius);
        let mut actor = Self::from_mesh(mesh, config.material, RenderStrategy::TessellatedPatches);
        actor.levels = config.levels;
        actor.name = config.name;
        actor
    }

    pub fn from_obj(config: ObjConfig) -> Result<Self> {
        let loaded = load_obj(&config.obj_path, config.mtl_path.as_deref(), config.scale)?;
        let mut actor = Self::from_mesh(
            loaded.mesh,
            Material::default(),
            RenderStrategy::MultiMaterialRanged,
        );
        actor.ranges = loaded.ranges;
        actor.materials = loaded.materials;
        actor.name = config.name.or_else(|| {
            config
                .obj_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        });
        Ok(actor)
    }

    pub fn shape(config: ShapeConfig) -> Self {
        let mut actor = Self::from_mesh(
            config.mesh,
            config.material,
            RenderStrategy::ProceduralSingleMaterial,
        );
        actor.name = config.name;
        actor.selectable = config.selectable;
        actor
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    pub fn ranges(&self) -> &[MaterialRange] {
        &self.ranges
    }

    /// Material attached to a range, or the actor default when the range is
    /// anonymous or names an unknown material.
    pub fn range_material(&self, range: &MaterialRange) -> Material {
        range
            .name
            .as_deref()
            .and_then(|n| self.materials.get(n))
            .copied()
            .unwrap_or(self.material)
    }

    pub fn levels(&self) -> TessellationLevels {
        self.levels
    }

    pub fn colored(&self) -> bool {
        self.mesh.colors.is_some()
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position()
    }

    /// World-space pick bounds: local AABB through the transform, grown by
    /// the pick factor about its center. `None` for empty meshes.
    pub fn pick_bounds(&self) -> Option<Aabb> {
        let local = self.local_bounds?;
        Some(
            local
                .transformed(&self.transform.matrix())
                .scaled(self.pick_factor),
        )
    }

    /// Interleave positions/normals/colors into the GPU vertex layout. Per-
    /// vertex colors win over the material diffuse when present.
    pub fn build_vertices(&self) -> Vec<Vertex> {
        let fallback = self.material.diffuse;
        self.mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: *p,
                normal: self.mesh.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                color: self
                    .mesh
                    .colors
                    .as_ref()
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or(fallback),
            })
            .collect()
    }

    pub fn upload(&mut self, backend: &mut dyn GpuBackend) {
        if self.gpu.is_some() {
            return;
        }
        let vertices = self.build_vertices();
        let vertex_buffer = backend.upload_buffer(bytemuck::cast_slice(&vertices));
        let index_buffer = match self.strategy {
            RenderStrategy::ProceduralIndexed | RenderStrategy::TessellatedPatches => self
                .mesh
                .indices
                .as_ref()
                .map(|idx| backend.upload_buffer(bytemuck::cast_slice(idx))),
            _ => None,
        };
        self.gpu = Some(GpuBuffers {
            vertices: vertex_buffer,
            indices: index_buffer,
        });
    }

    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(gpu) = self.gpu.take() {
            backend.release_buffer(gpu.vertices);
            if let Some(indices) = gpu.indices {
                backend.release_buffer(indices);
            }
        }
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.gpu.map(|g| g.vertices)
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.gpu.and_then(|g| g.indices)
    }

    pub fn index_count(&self) -> u32 {
        self.mesh.indices.as_ref().map_or(0, |i| i.len() as u32)
    }

    pub fn vertex_count(&self) -> u32 {
        self.mesh.vertex_count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::recording::RecordingBackend;

    #[test]
    fn sphere_actor_is_indexed() {
        let actor = Actor::sphere(SphereConfig::default()).unwrap();
        assert_eq!(actor.strategy(), RenderStrategy::ProceduralIndexed);
        assert!(actor.index_count() > 0);
    }

    #[test]
    fn upload_is_idempotent_and_release_frees_everything() {
        let mut backend = RecordingBackend::new();
        let mut actor = Actor::sphere(SphereConfig::default()).unwrap();
        actor.upload(&mut backend);
        actor.upload(&mut backend);
        assert_eq!(backend.live_buffers.len(), 2); // vertices + indices
        actor.release(&mut backend);
        assert!(backend.live_buffers.is_empty());
    }

    #[test]
    fn vertices_carry_material_diffuse_when_uncolored() {
        let mut config = SphereConfig::default();
        config.material = Material::with_diffuse([0.1, 0.2, 0.3]);
        let actor = Actor::sphere(config).unwrap();
        let vertices = actor.build_vertices();
        assert!(vertices.iter().all(|v| v.color == [0.1, 0.2, 0.3]));
    }

    #[test]
    fn pick_bounds_grow_with_the_pick_factor() {
        let mut actor = Actor::sphere(SphereConfig::default()).unwrap();
        let tight = actor.pick_bounds().unwrap();
        actor.pick_factor = 3.0;
        let grown = actor.pick_bounds().unwrap();
        assert!(grown.max.x > tight.max.x);
        assert_eq!(grown.center(), tight.center());
    }
}
