//! # Graphics Module
//!
//! Everything between the scene description and the GPU:
//!
//! - **Geometry** ([`geometry`]) - procedural spheres, gizmo primitives and
//!   the OBJ/MTL loader
//! - **Scene** ([`scene`]) - actors, generational handles and the world
//! - **Camera** ([`camera`]) - quaternion trackball and lens/projection math
//! - **Picking** ([`picking`]) - cursor rays against actor bounds
//! - **Interaction** ([`interaction`]) - selection and gizmo state machine
//! - **Backend** ([`backend`]) - the GPU seam and its wgpu implementation
//! - **Shaders** ([`shaders`]) - the program variant registry

pub mod backend;
pub mod camera;
pub mod geometry;
pub mod gnomon;
pub mod interaction;
pub mod material;
pub mod picking;
pub mod scene;
pub mod shaders;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, Trackball};
pub use scene::{Actor, World};
