//! Ray casting against axis-aligned bounds.
//!
//! Selection works in three steps: the cursor position becomes a world-space
//! [`Ray`] through the inverse view-projection, each selectable actor offers
//! an [`Aabb`] grown by its pick factor, and the nearest slab-test hit wins.

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3, Vector4};

use crate::gfx::camera::Camera;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Bounds of a point cloud; `None` when empty.
    pub fn from_points<'a, I: IntoIterator<Item = &'a [f32; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = Vector3::from(first);
        let mut max = min;
        for p in iter {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Grow or shrink the box about its own center. The pick factor of an
    /// actor feeds in here so small actors stay clickable.
    pub fn scaled(&self, factor: f32) -> Self {
        let center = self.center();
        let half = (self.max - self.min) * 0.5 * factor;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Transform the eight corners and rebound. Conservative for rotation but
    /// exact for translation and scale, which is what actor transforms use.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = [
            [self.min.x, self.min.y, self.min.z],
            [self.max.x, self.min.y, self.min.z],
            [self.min.x, self.max.y, self.min.z],
            [self.max.x, self.max.y, self.min.z],
            [self.min.x, self.min.y, self.max.z],
            [self.max.x, self.min.y, self.max.z],
            [self.min.x, self.max.y, self.max.z],
            [self.max.x, self.max.y, self.max.z],
        ];
        let transformed = corners.map(|c| {
            let v = matrix * Vector4::new(c[0], c[1], c[2], 1.0);
            [v.x, v.y, v.z]
        });
        // eight corners, never empty
        Self::from_points(transformed.iter()).unwrap_or(*self)
    }

    /// Slab intersection; returns the entry distance along the ray.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let (t0, t1) = if inv >= 0.0 {
                ((lo - origin) * inv, (hi - origin) * inv)
            } else {
                ((hi - origin) * inv, (lo - origin) * inv)
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

/// Build a world-space ray through a cursor position in normalized device
/// coordinates (x, y in [-1, 1], y up).
///
/// The direction comes from a mid-depth unprojection rather than the far
/// plane: with a 0.1..1000 depth range the far plane's clip w collapses to
/// near zero in f32 and the differenced direction is garbage. Both lenses
/// stay well conditioned at depth 0.5.
pub fn screen_to_ray(ndc_x: f32, ndc_y: f32, camera: &Camera) -> Option<Ray> {
    let inverse = camera.view_projection_matrix().invert()?;
    let unproject = |z: f32| {
        let v = inverse * Vector4::new(ndc_x, ndc_y, z, 1.0);
        v.truncate() / v.w
    };
    let near = unproject(0.0);
    let mid = unproject(0.5);
    let direction = mid - near;
    if direction.magnitude2() < f32::EPSILON {
        return None;
    }
    Some(Ray::new(near, direction))
}
