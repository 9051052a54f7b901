//! Sphere generators.
//!
//! Two constructions: a CPU-triangulated polar (latitude/longitude) sphere,
//! and the 20-patch icosahedron fed to the GPU tessellation path. The polar
//! sphere stitches mirrored latitude bands outward from the poles so odd and
//! even vertical resolutions both close without degenerate cap triangles.

use std::f32::consts::PI;

use super::MeshData;
use crate::error::{Result, SceneError};

/// Subdivision levels consumed by the GPU tessellation stage as the
/// `innerLevel` / `outerLevel` integer uniforms. Levels below 1 are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessellationLevels {
    pub inner: u32,
    pub outer: u32,
}

impl TessellationLevels {
    pub fn new(inner: u32, outer: u32) -> Self {
        Self {
            inner: inner.max(1),
            outer: outer.max(1),
        }
    }
}

/// Generate an indexed polar sphere.
///
/// Vertices are laid out as the north pole, then latitude rings from north to
/// south with `horizontal_segments` vertices each, then the south pole.
/// `horizontal_segments < 3` or `vertical_segments < 2` cannot produce a
/// closed surface and fail with [`SceneError::InvalidParameter`].
pub fn polar_sphere(
    radius: f32,
    horizontal_segments: u32,
    vertical_segments: u32,
) -> Result<MeshData> {
    if horizontal_segments < 3 {
        return Err(SceneError::InvalidParameter {
            what: "horizontal_segments",
            value: horizontal_segments.to_string(),
        });
    }
    if vertical_segments < 2 {
        return Err(SceneError::InvalidParameter {
            what: "vertical_segments",
            value: vertical_segments.to_string(),
        });
    }
    if !(radius > 0.0) {
        return Err(SceneError::InvalidParameter {
            what: "radius",
            value: radius.to_string(),
        });
    }

    let h = horizontal_segments;
    let v = vertical_segments;
    let half = v / 2;
    let odd = v % 2 == 1;

    // Latitude angles, built as mirrored band pairs working in from both
    // poles. For even vertical resolution the innermost northern band lands
    // exactly on the equator and must not be mirrored again.
    let mut thetas = Vec::with_capacity((v - 1) as usize);
    for k in 1..=half {
        thetas.push(PI * k as f32 / v as f32);
    }
    let mirrored = if odd { half } else { half - 1 };
    for k in (1..=mirrored).rev() {
        thetas.push(PI - PI * k as f32 / v as f32);
    }

    let mut data = MeshData::new();
    let push_vertex = |data: &mut MeshData, theta: f32, phi: f32| {
        let (sin_t, cos_t) = theta.sin_cos();
        let dir = [sin_t * phi.cos(), sin_t * phi.sin(), cos_t];
        data.positions
            .push([radius * dir[0], radius * dir[1], radius * dir[2]]);
        data.normals.push(dir);
    };

    // north pole, rings, south pole
    data.positions.push([0.0, 0.0, radius]);
    data.normals.push([0.0, 0.0, 1.0]);
    for &theta in &thetas {
        for i in 0..h {
            push_vertex(&mut data, theta, 2.0 * PI * i as f32 / h as f32);
        }
    }
    let south = data.positions.len() as u32;
    data.positions.push([0.0, 0.0, -radius]);
    data.normals.push([0.0, 0.0, -1.0]);

    let rings = thetas.len() as u32;
    let ring_start = |j: u32| 1 + j * h;
    let mut indices = Vec::new();

    // north cap
    for i in 0..h {
        indices.extend_from_slice(&[0, ring_start(0) + i, ring_start(0) + (i + 1) % h]);
    }
    // latitude bands, quads split into two triangles
    for j in 0..rings.saturating_sub(1) {
        for i in 0..h {
            let a = ring_start(j) + i;
            let b = ring_start(j) + (i + 1) % h;
            let c = ring_start(j + 1) + i;
            let d = ring_start(j + 1) + (i + 1) % h;
            indices.extend_from_slice(&[a, c, d, d, b, a]);
        }
    }
    // south cap
    let last = ring_start(rings - 1);
    for i in 0..h {
        indices.extend_from_slice(&[south, last + (i + 1) % h, last + i]);
    }

    data.indices = Some(indices);
    data.validate()?;
    Ok(data)
}

/// The base icosahedron emitted as twenty 3-control-point patches.
///
/// No CPU subdivision happens here: the mesh is drawn as patch primitives and
/// refined on the GPU according to [`TessellationLevels`].
pub fn icosphere_patches(radius: f32) -> MeshData {
    // golden-ratio construction of the 12 icosahedron vertices
    let t = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let raw: [[f32; 3]; 12] = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];

    let scale = radius / (1.0 + t * t).sqrt();
    let mut data = MeshData::new();
    for p in raw {
        let n = [p[0] * scale / radius, p[1] * scale / radius, p[2] * scale / radius];
        data.positions.push([p[0] * scale, p[1] * scale, p[2] * scale]);
        data.normals.push(n);
    }

    data.indices = Some(vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, //
        1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8, //
        3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, //
        4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
    ]);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(p: [f32; 3]) -> f32 {
        (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
    }

    fn assert_outward_winding(mesh: &MeshData) {
        let idx = mesh.indices.as_ref().unwrap();
        for tri in idx.chunks(3) {
            let a = mesh.positions[tri[0] as usize];
            let b = mesh.positions[tri[1] as usize];
            let c = mesh.positions[tri[2] as usize];
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let n = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            let dot = n[0] * centroid[0] + n[1] * centroid[1] + n[2] * centroid[2];
            assert!(dot > 0.0, "inward-facing triangle {:?}", tri);
        }
    }

    #[test]
    fn polar_sphere_vertices_lie_on_radius() {
        for &(h, v) in &[(3, 2), (7, 7), (12, 15), (40, 40)] {
            let mesh = polar_sphere(2.0, h, v).unwrap();
            for p in &mesh.positions {
                assert!((norm(*p) - 2.0).abs() < 1e-4, "vertex off sphere: {:?}", p);
            }
        }
    }

    #[test]
    fn polar_sphere_normals_point_outward() {
        let mesh = polar_sphere(1.0, 8, 6).unwrap();
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            let dot = p[0] * n[0] + p[1] * n[1] + p[2] * n[2];
            assert!(dot > 0.0);
        }
    }

    #[test]
    fn polar_sphere_winding_consistent_odd_and_even() {
        assert_outward_winding(&polar_sphere(1.0, 5, 4).unwrap());
        assert_outward_winding(&polar_sphere(1.0, 5, 5).unwrap());
    }

    #[test]
    fn polar_sphere_indices_in_range() {
        let mesh = polar_sphere(1.0, 9, 3).unwrap();
        let count = mesh.vertex_count() as u32;
        for &i in mesh.indices.as_ref().unwrap() {
            assert!(i < count);
        }
    }

    #[test]
    fn polar_sphere_triangle_count_closed() {
        // closed surface: h triangles per cap plus 2h per interior band
        let mesh = polar_sphere(1.0, 6, 4).unwrap();
        let rings = 3; // v - 1
        assert_eq!(mesh.triangle_count() as u32, 6 * 2 + (rings - 1) * 12);
    }

    #[test]
    fn polar_sphere_rejects_degenerate_arguments() {
        assert!(polar_sphere(1.0, 2, 5).is_err());
        assert!(polar_sphere(1.0, 5, 1).is_err());
        assert!(polar_sphere(0.0, 5, 5).is_err());
    }

    #[test]
    fn icosphere_patch_list_shape() {
        let mesh = icosphere_patches(1.0);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 20);
        for p in &mesh.positions {
            assert!((norm(*p) - 1.0).abs() < 1e-5);
        }
        assert_outward_winding(&mesh);
    }

    #[test]
    fn tessellation_levels_clamped_to_one() {
        let levels = TessellationLevels::new(0, 5);
        assert_eq!(levels.inner, 1);
        assert_eq!(levels.outer, 5);
    }
}
