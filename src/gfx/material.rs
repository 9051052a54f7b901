//! Phong shading coefficients and the scene light.
//!
//! Plain data consumed by shader uniform binding. Each struct has a
//! `#[repr(C)]` mirror laid out for 16-byte uniform alignment, in the same
//! discipline as the camera uniform.

use bytemuck::{Pod, Zeroable};

/// Phong material coefficients. The default is a neutral white-diffuse
/// material, matching what an MTL entry starts from before its fields are
/// filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub emission: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            emission: [0.0, 0.0, 0.0],
            ambient: [0.2, 0.2, 0.2],
            diffuse: [1.0, 1.0, 1.0],
            specular: [0.5, 0.5, 0.5],
            shininess: 12.8,
        }
    }
}

impl Material {
    pub fn with_diffuse(diffuse: [f32; 3]) -> Self {
        Self {
            diffuse,
            ..Default::default()
        }
    }

    pub fn to_uniform(self) -> MaterialUniform {
        MaterialUniform {
            emission: [self.emission[0], self.emission[1], self.emission[2], 0.0],
            ambient: [self.ambient[0], self.ambient[1], self.ambient[2], 0.0],
            diffuse: [self.diffuse[0], self.diffuse[1], self.diffuse[2], 0.0],
            specular: [
                self.specular[0],
                self.specular[1],
                self.specular[2],
                self.shininess,
            ],
        }
    }
}

/// GPU mirror of [`Material`]; shininess rides in `specular.w`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub emission: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

/// The single scene light.
///
/// `position.w` selects the model: 0 makes it directional (direction is the
/// normalized xyz), 1 makes it a point light with quadratic attenuation.
/// A head light follows the camera instead of staying fixed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub position: [f32; 4],
    /// Quadratic attenuation coefficients: constant, linear, quadratic.
    pub attenuation: [f32; 3],
    pub head_light: bool,
    pub directional: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2],
            diffuse: [1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0],
            position: [0.0, 0.0, 5.0, 1.0],
            attenuation: [1.0, 0.02, 0.002],
            head_light: true,
            directional: false,
        }
    }
}

impl Light {
    pub fn set_directional(&mut self, directional: bool) {
        self.directional = directional;
        self.position[3] = if directional { 0.0 } else { 1.0 };
    }

    pub fn set_head_light(&mut self, head_light: bool) {
        self.head_light = head_light;
    }

    pub fn to_uniform(self) -> LightUniform {
        LightUniform {
            ambient: [self.ambient[0], self.ambient[1], self.ambient[2], 0.0],
            diffuse: [self.diffuse[0], self.diffuse[1], self.diffuse[2], 0.0],
            specular: [self.specular[0], self.specular[1], self.specular[2], 0.0],
            position: self.position,
            attenuation: [
                self.attenuation[0],
                self.attenuation[1],
                self.attenuation[2],
                0.0,
            ],
        }
    }
}

/// GPU mirror of [`Light`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 4],
    pub attenuation: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_is_white_diffuse() {
        let m = Material::default();
        assert_eq!(m.diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(m.emission, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn shininess_packs_into_specular_w() {
        let mut m = Material::default();
        m.shininess = 76.8;
        assert_eq!(m.to_uniform().specular[3], 76.8);
    }

    #[test]
    fn uniform_mirrors_support_equality() {
        assert_eq!(Material::default().to_uniform(), Material::default().to_uniform());
        assert_eq!(Light::default().to_uniform(), Light::default().to_uniform());
        let mut m = Material::default();
        m.diffuse = [0.0, 0.0, 1.0];
        assert_ne!(m.to_uniform(), Material::default().to_uniform());
    }

    #[test]
    fn directional_toggle_drives_position_w() {
        let mut light = Light::default();
        assert_eq!(light.position[3], 1.0);
        light.set_directional(true);
        assert_eq!(light.position[3], 0.0);
        light.set_directional(false);
        assert_eq!(light.position[3], 1.0);
    }
}
