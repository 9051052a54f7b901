//! Shader program registry.
//!
//! Every combination of draw style, shading quality, vertex-color, texture
//! and lighting flags resolves to a compiled program through an immutable
//! table built once at startup. Several keys share a program; the table is
//! total so rendering never compiles lazily or misses a variant.

use std::collections::HashMap;

use log::debug;

use crate::error::Result;
use crate::gfx::backend::{GpuBackend, ProgramHandle, ShaderStage};
use crate::gfx::scene::{DrawStyle, Shading};

const PHONG: &str = include_str!("backend/shaders/phong.wgsl");
const PHONG_FLAT: &str = include_str!("backend/shaders/phong_flat.wgsl");
const PHONG_COLOR: &str = include_str!("backend/shaders/phong_color.wgsl");
const UNLIT: &str = include_str!("backend/shaders/unlit.wgsl");
const UNLIT_COLOR: &str = include_str!("backend/shaders/unlit_color.wgsl");
const SPHERE_PATCH: &str = include_str!("backend/shaders/sphere_patch.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub style: DrawStyle,
    pub shading: Shading,
    pub colored: bool,
    pub textured: bool,
    pub lit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Variant {
    Phong,
    PhongFlat,
    PhongColor,
    Unlit,
    UnlitColor,
}

/// Points and wireframe render unlit in the edge color; solid styles pick a
/// Phong variant by shading quality unless lighting is off. Texturing does
/// not change the program (image decoding stays outside the core).
fn select(key: ProgramKey) -> Variant {
    match key.style {
        DrawStyle::Points | DrawStyle::Wireframe => {
            if key.colored {
                Variant::UnlitColor
            } else {
                Variant::Unlit
            }
        }
        DrawStyle::Solid | DrawStyle::SolidWithEdges => {
            if !key.lit {
                if key.colored {
                    Variant::UnlitColor
                } else {
                    Variant::Unlit
                }
            } else if key.colored {
                Variant::PhongColor
            } else {
                match key.shading {
                    Shading::Low => Variant::PhongFlat,
                    Shading::High => Variant::Phong,
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct ShaderRegistry {
    table: HashMap<ProgramKey, ProgramHandle>,
    patch: ProgramHandle,
    fallback: ProgramHandle,
}

impl ShaderRegistry {
    pub fn lookup(&self, key: ProgramKey) -> ProgramHandle {
        self.table.get(&key).copied().unwrap_or(self.fallback)
    }

    /// Program for the GPU-tessellated sphere path.
    pub fn patch_program(&self) -> ProgramHandle {
        self.patch
    }
}

const STYLES: [DrawStyle; 4] = [
    DrawStyle::Points,
    DrawStyle::Wireframe,
    DrawStyle::Solid,
    DrawStyle::SolidWithEdges,
];

/// Compile every program variant up front. A compile failure is fatal here,
/// before any frame is rendered.
pub fn initialize_shader_registry(backend: &mut dyn GpuBackend) -> Result<ShaderRegistry> {
    let mut compile = |source: &str| {
        backend.compile_program(&[(ShaderStage::Vertex, source), (ShaderStage::Fragment, source)])
    };
    let phong = compile(PHONG)?;
    let phong_flat = compile(PHONG_FLAT)?;
    let phong_color = compile(PHONG_COLOR)?;
    let unlit = compile(UNLIT)?;
    let unlit_color = compile(UNLIT_COLOR)?;

    let patch = backend.compile_program(&[
        (ShaderStage::TessellationControl, SPHERE_PATCH),
        (ShaderStage::TessellationEvaluation, SPHERE_PATCH),
        (ShaderStage::Vertex, SPHERE_PATCH),
        (ShaderStage::Fragment, SPHERE_PATCH),
    ])?;

    let resolve = |variant: Variant| match variant {
        Variant::Phong => phong,
        Variant::PhongFlat => phong_flat,
        Variant::PhongColor => phong_color,
        Variant::Unlit => unlit,
        Variant::UnlitColor => unlit_color,
    };

    let mut table = HashMap::new();
    for style in STYLES {
        for shading in [Shading::Low, Shading::High] {
            for colored in [false, true] {
                for textured in [false, true] {
                    for lit in [false, true] {
                        let key = ProgramKey {
                            style,
                            shading,
                            colored,
                            textured,
                            lit,
                        };
                        table.insert(key, resolve(select(key)));
                    }
                }
            }
        }
    }
    debug!("shader registry built: {} key variants", table.len());

    Ok(ShaderRegistry {
        table,
        patch,
        fallback: unlit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::recording::RecordingBackend;

    #[test]
    fn every_key_combination_resolves() {
        let mut backend = RecordingBackend::new();
        let registry = initialize_shader_registry(&mut backend).unwrap();
        for style in STYLES {
            for shading in [Shading::Low, Shading::High] {
                for colored in [false, true] {
                    for textured in [false, true] {
                        for lit in [false, true] {
                            // lookup never falls through to a missing entry
                            let key = ProgramKey {
                                style,
                                shading,
                                colored,
                                textured,
                                lit,
                            };
                            assert!(registry.table.contains_key(&key));
                            let _ = registry.lookup(key);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn texturing_does_not_change_the_program() {
        let mut backend = RecordingBackend::new();
        let registry = initialize_shader_registry(&mut backend).unwrap();
        let base = ProgramKey {
            style: DrawStyle::Solid,
            shading: Shading::High,
            colored: false,
            textured: false,
            lit: true,
        };
        let textured = ProgramKey {
            textured: true,
            ..base
        };
        assert_eq!(registry.lookup(base), registry.lookup(textured));
    }

    #[test]
    fn unlit_solid_shares_the_wireframe_program() {
        let mut backend = RecordingBackend::new();
        let registry = initialize_shader_registry(&mut backend).unwrap();
        let solid_unlit = ProgramKey {
            style: DrawStyle::Solid,
            shading: Shading::High,
            colored: false,
            textured: false,
            lit: false,
        };
        let wire = ProgramKey {
            style: DrawStyle::Wireframe,
            ..solid_unlit
        };
        assert_eq!(registry.lookup(solid_unlit), registry.lookup(wire));
    }
}
