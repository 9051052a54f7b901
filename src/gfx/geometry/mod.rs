//! # Procedural Geometry
//!
//! CPU-side mesh construction for everything the viewer can draw: gizmo
//! primitives, polar spheres, icosphere tessellation patches and OBJ-derived
//! polyhedra. All generators produce a [`MeshData`] ready for upload through
//! the GPU backend.

pub mod obj;
pub mod primitives;
pub mod sphere;

pub use obj::{load_obj, parse_mtl, triangulate, ObjMesh};
pub use primitives::{cone, cube, cylinder};
pub use sphere::{icosphere_patches, polar_sphere, TessellationLevels};

use crate::error::{Result, SceneError};

/// Geometry buffers produced by a generator or loader.
///
/// Positions and normals are always parallel. Colors, texture coordinates and
/// the index buffer are optional; when present they must satisfy
/// [`MeshData::validate`].
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions (x, y, z).
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals, same length as `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Optional per-vertex colors.
    pub colors: Option<Vec<[f32; 3]>>,
    /// Optional texture coordinates.
    pub texcoords: Option<Vec<[f32; 2]>>,
    /// Optional triangle index buffer, 3 entries per triangle.
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Checks the buffer invariants: parallel attribute lengths and index
    /// references inside the vertex range.
    pub fn validate(&self) -> Result<()> {
        if self.normals.len() != self.positions.len() {
            return Err(SceneError::InvalidParameter {
                what: "normals length",
                value: format!("{} != {}", self.normals.len(), self.positions.len()),
            });
        }
        if let Some(colors) = &self.colors {
            if colors.len() != self.positions.len() {
                return Err(SceneError::InvalidParameter {
                    what: "colors length",
                    value: format!("{} != {}", colors.len(), self.positions.len()),
                });
            }
        }
        if let Some(texcoords) = &self.texcoords {
            if texcoords.len() != self.positions.len() {
                return Err(SceneError::InvalidParameter {
                    what: "texcoords length",
                    value: format!("{} != {}", texcoords.len(), self.positions.len()),
                });
            }
        }
        if let Some(indices) = &self.indices {
            let limit = self.positions.len() as u32;
            if let Some(bad) = indices.iter().find(|&&i| i >= limit) {
                return Err(SceneError::InvalidParameter {
                    what: "index out of range",
                    value: format!("{} >= {}", bad, limit),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_catches_short_normals() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0; 3]; 2],
            ..Default::default()
        };
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn validate_catches_out_of_range_index() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0; 3]; 3],
            indices: Some(vec![0, 1, 3]),
            ..Default::default()
        };
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_mesh() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0; 3]; 3],
            indices: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        assert!(mesh.validate().is_ok());
    }
}
