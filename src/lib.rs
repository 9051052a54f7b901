// src/lib.rs
//! Polyview
//!
//! An interactive polyhedral mesh viewer built on wgpu and winit: procedural
//! and OBJ-loaded actors, a quaternion trackball camera, pick-based selection
//! and axis-gizmo scale/translate manipulation.

pub mod app;
pub mod error;
pub mod gfx;

// Re-export main types for convenience
pub use app::PolyviewApp;
pub use error::{Result, SceneError};

/// Creates a default Polyview application instance
pub fn default() -> PolyviewApp {
    PolyviewApp::new()
}
