use std::sync::Arc;

use crate::color::Color;
use crate::scene::{Scene, SceneObject};
use crate::shader::{Shader, ShaderArena, ShaderSlot};
use crate::texture::Texture;
use crate::vec::Mat4x4;
use crate::vertex::Vertex;

/// Self-illuminated shader, used for the sky and other geometry that
/// ignores scene lighting.
#[derive(Clone)]
pub struct UnlitShader {
    texture: Option<Arc<Texture>>,
    mtx_mvp: Mat4x4,
}

impl UnlitShader {
    pub fn new() -> Self {
        UnlitShader {
            texture: None,
            mtx_mvp: Mat4x4::identity(),
        }
    }
}

impl Default for UnlitShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for UnlitShader {
    fn prepare(&mut self, scene: &Scene, object: &SceneObject) {
        self.texture = Some(object.texture.clone());
        self.mtx_mvp = scene.camera.vp_matrix() * object.transform.matrix();
    }

    fn vertex(&self, input: &Vertex) -> Vertex {
        Vertex {
            position: self.mtx_mvp * input.position,
            ..*input
        }
    }

    fn fragment(&self, input: &Vertex, mip_level: f32) -> Option<Color> {
        let texel = match &self.texture {
            Some(texture) => texture.sample(input.texcoord, mip_level),
            None => Color::WHITE,
        };
        Some(texel)
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }
}
