use std::sync::Arc;

use crate::color::Color;
use crate::light::Light;
use crate::scene::{Scene, SceneObject};
use crate::shader::{Shader, ShaderArena, ShaderSlot};
use crate::texture::Texture;
use crate::vec::{Mat4x4, Vec3, Vec4};
use crate::vertex::Vertex;

/// The per-pixel lit shader used for most scene objects.
///
/// `prepare` snapshots everything the fragment stage touches: the matrices,
/// the eye, and the subset of scene lights that can reach the object's
/// bounding sphere. The snapshot is what `clone_into` copies for the
/// workers.
#[derive(Clone)]
pub struct LitShader {
    texture: Option<Arc<Texture>>,
    mtx_model: Mat4x4,
    mtx_mvp: Mat4x4,
    mtx_normal: Mat4x4,
    eye_pos: Vec3,
    eye_dir: Vec3,
    lights: Vec<Light>,
    lighting_enabled: bool,
}

impl LitShader {
    pub fn new() -> Self {
        LitShader {
            texture: None,
            mtx_model: Mat4x4::identity(),
            mtx_mvp: Mat4x4::identity(),
            mtx_normal: Mat4x4::identity(),
            eye_pos: Vec3::zero(),
            eye_dir: Vec3::forward(),
            lights: Vec::new(),
            lighting_enabled: true,
        }
    }

    fn snapshot(&mut self, scene: &Scene, object: &SceneObject) {
        self.texture = Some(object.texture.clone());
        self.mtx_model = object.transform.matrix();
        self.mtx_mvp = scene.camera.vp_matrix() * self.mtx_model;
        self.mtx_normal = object.transform.inverse_matrix().transpose();
        self.eye_pos = scene.camera.transform.position();
        self.eye_dir = scene.camera.transform.forward();

        let bounds = object.world_bounding_sphere();
        self.lights.clear();
        self.lights
            .extend(scene.lights.iter().filter(|l| l.can_affect(&bounds)).cloned());
    }

    fn transform_vertex(&self, input: &Vertex) -> Vertex {
        let n = input.normal;
        Vertex {
            position: self.mtx_mvp * input.position,
            normal: (self.mtx_normal * Vec4::from([n.x, n.y, n.z, 0.0])).xyz(),
            texcoord: input.texcoord,
            world_pos: (self.mtx_model * input.position).xyz(),
        }
    }

    fn shade(&self, input: &Vertex, texel: Color) -> Color {
        if !self.lighting_enabled {
            return texel;
        }
        let mut lum = Color::BLACK;
        for light in &self.lights {
            lum += light.apply(input.world_pos, input.normal, self.eye_pos, self.eye_dir);
        }
        let mut out = texel * lum;
        out.a = texel.a;
        out
    }

    fn texel(&self, input: &Vertex, mip_level: f32) -> Color {
        match &self.texture {
            Some(texture) => texture.sample(input.texcoord, mip_level),
            None => Color::WHITE,
        }
    }
}

impl Default for LitShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for LitShader {
    fn prepare(&mut self, scene: &Scene, object: &SceneObject) {
        self.snapshot(scene, object);
    }

    fn vertex(&self, input: &Vertex) -> Vertex {
        self.transform_vertex(input)
    }

    fn fragment(&self, input: &Vertex, mip_level: f32) -> Option<Color> {
        let texel = self.texel(input, mip_level);
        Some(self.shade(input, texel))
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }

    fn set_lighting(&mut self, enabled: bool) {
        self.lighting_enabled = enabled;
    }
}

/// Lit shader that discards fragments whose texel alpha falls below a
/// threshold; used for foliage and other cutout geometry.
#[derive(Clone)]
pub struct LitCutoutShader {
    base: LitShader,
    alpha_threshold: f32,
}

impl LitCutoutShader {
    pub fn new(alpha_threshold: f32) -> Self {
        LitCutoutShader {
            base: LitShader::new(),
            alpha_threshold,
        }
    }
}

impl Shader for LitCutoutShader {
    fn prepare(&mut self, scene: &Scene, object: &SceneObject) {
        self.base.snapshot(scene, object);
    }

    fn vertex(&self, input: &Vertex) -> Vertex {
        self.base.transform_vertex(input)
    }

    fn fragment(&self, input: &Vertex, mip_level: f32) -> Option<Color> {
        let texel = self.base.texel(input, mip_level);
        if texel.a < self.alpha_threshold {
            return None;
        }
        Some(self.base.shade(input, texel))
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }

    fn set_lighting(&mut self, enabled: bool) {
        self.base.lighting_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::AmbientLight;

    fn lit_with_ambient(intensity: f32) -> LitShader {
        let mut shader = LitShader::new();
        shader.lights.push(Light::ambient(
            "a",
            AmbientLight { color: Color::WHITE, intensity },
        ));
        shader
    }

    #[test]
    fn fragment_modulates_texel_by_light_sum() {
        let shader = lit_with_ambient(0.5);
        let vert = Vertex::default();
        let out = shader.fragment(&vert, 0.0).unwrap();
        // no texture bound: white texel times 0.5 ambient
        assert_eq!(out.r, 0.5);
        assert_eq!(out.a, 1.0);
    }

    #[test]
    fn lighting_toggle_passes_texel_through() {
        let mut shader = lit_with_ambient(0.5);
        shader.set_lighting(false);
        let out = shader.fragment(&Vertex::default(), 0.0).unwrap();
        assert_eq!(out.r, 1.0);
    }

    #[test]
    fn cutout_discards_below_threshold() {
        let shader = LitCutoutShader::new(0.5);
        // no texture bound: texel is opaque white, which survives
        assert!(shader.fragment(&Vertex::default(), 0.0).is_some());

        let mut transparent = LitCutoutShader::new(2.0); // nothing passes
        transparent.base.lighting_enabled = false;
        assert!(transparent.fragment(&Vertex::default(), 0.0).is_none());
    }
}
