//! Primitive shape generators.
//!
//! These are the building blocks for the manipulation gizmos and the axis
//! gnomon: a unit cube plus Y-aligned cylinders and cones. All of them return
//! indexed triangle lists with outward normals.

use std::f32::consts::PI;

use super::MeshData;

/// Generate a unit cube centered at the origin, one quad per face.
pub fn cube() -> MeshData {
    let positions = vec![
        // front (+z)
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
        // back (-z)
        [-0.5, -0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [0.5, 0.5, -0.5],
        [0.5, -0.5, -0.5],
        // left (-x)
        [-0.5, -0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5],
        // right (+x)
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [0.5, 0.5, 0.5],
        // top (+y)
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        // bottom (-y)
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5],
        [-0.5, -0.5, 0.5],
    ];

    let face_normals = [
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
        [-1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
    ];
    let mut normals = Vec::with_capacity(24);
    for n in face_normals {
        for _ in 0..4 {
            normals.push(n);
        }
    }

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData {
        positions,
        normals,
        indices: Some(indices),
        ..Default::default()
    }
}

/// Generate a capped cylinder along the Y axis, centered at the origin.
///
/// `resolution` is clamped to a minimum of 3 segments.
pub fn cylinder(radius: f32, height: f32, resolution: u32) -> MeshData {
    let segs = resolution.max(3);
    let half = height * 0.5;
    let mut data = MeshData::new();
    let mut indices = Vec::new();

    // side wall, one ring of quads
    for i in 0..=segs {
        let angle = i as f32 * 2.0 * PI / segs as f32;
        let (sin_a, cos_a) = angle.sin_cos();
        let x = radius * cos_a;
        let z = radius * sin_a;

        data.positions.push([x, -half, z]);
        data.normals.push([cos_a, 0.0, sin_a]);
        data.positions.push([x, half, z]);
        data.normals.push([cos_a, 0.0, sin_a]);
    }
    for i in 0..segs {
        let bottom = i * 2;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;
        indices.extend_from_slice(&[bottom, next_bottom, top, top, next_bottom, next_top]);
    }

    // caps share a center vertex each
    let bottom_center = data.positions.len() as u32;
    data.positions.push([0.0, -half, 0.0]);
    data.normals.push([0.0, -1.0, 0.0]);
    let top_center = data.positions.len() as u32;
    data.positions.push([0.0, half, 0.0]);
    data.normals.push([0.0, 1.0, 0.0]);

    let bottom_ring = data.positions.len() as u32;
    for i in 0..=segs {
        let angle = i as f32 * 2.0 * PI / segs as f32;
        let (sin_a, cos_a) = angle.sin_cos();
        data.positions.push([radius * cos_a, -half, radius * sin_a]);
        data.normals.push([0.0, -1.0, 0.0]);
        data.positions.push([radius * cos_a, half, radius * sin_a]);
        data.normals.push([0.0, 1.0, 0.0]);
    }
    for i in 0..segs {
        let b0 = bottom_ring + i * 2;
        let b1 = bottom_ring + (i + 1) * 2;
        indices.extend_from_slice(&[bottom_center, b0, b1]);
        indices.extend_from_slice(&[top_center, b1 + 1, b0 + 1]);
    }

    data.indices = Some(indices);
    data
}

/// Generate a cone along the Y axis: apex at `+height/2`, capped base at
/// `-height/2`.
pub fn cone(radius: f32, height: f32, resolution: u32) -> MeshData {
    let segs = resolution.max(3);
    let half = height * 0.5;
    let slant = (height * height + radius * radius).sqrt();
    let cos_n = height / slant;
    let sin_n = radius / slant;

    let mut data = MeshData::new();
    let mut indices = Vec::new();

    // lateral surface: apex vertex duplicated per segment so normals stay flat
    // across the seam
    for i in 0..segs {
        let a0 = i as f32 * 2.0 * PI / segs as f32;
        let a1 = (i + 1) as f32 * 2.0 * PI / segs as f32;
        let mid = (a0 + a1) * 0.5;

        let base = data.positions.len() as u32;
        data.positions.push([0.0, half, 0.0]);
        data.normals.push([mid.cos() * cos_n, sin_n, mid.sin() * cos_n]);

        data.positions.push([radius * a1.cos(), -half, radius * a1.sin()]);
        data.normals.push([a1.cos() * cos_n, sin_n, a1.sin() * cos_n]);

        data.positions.push([radius * a0.cos(), -half, radius * a0.sin()]);
        data.normals.push([a0.cos() * cos_n, sin_n, a0.sin() * cos_n]);

        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    // base cap
    let center = data.positions.len() as u32;
    data.positions.push([0.0, -half, 0.0]);
    data.normals.push([0.0, -1.0, 0.0]);
    let ring = data.positions.len() as u32;
    for i in 0..=segs {
        let angle = i as f32 * 2.0 * PI / segs as f32;
        data.positions
            .push([radius * angle.cos(), -half, radius * angle.sin()]);
        data.normals.push([0.0, -1.0, 0.0]);
    }
    for i in 0..segs {
        indices.extend_from_slice(&[center, ring + i + 1, ring + i]);
    }

    data.indices = Some(indices);
    data
}
