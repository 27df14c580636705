use crate::color::Color;
use crate::scene::{Scene, SceneObject};
use crate::vertex::Vertex;

/// A programmable vertex + fragment stage.
///
/// `prepare` runs once per draw on the main thread and may mutate per-draw
/// state (matrices, light snapshots). `clone_into` then copies that prepared
/// state into the frame's [`ShaderArena`]; workers only ever read the
/// immutable clone, never the live shader.
///
/// `fragment` receives the perspective-corrected vertex and the mip level
/// picked by the rasterizer, and returns `None` to discard the fragment,
/// leaving color and depth untouched.
pub trait Shader: Send + Sync {
    fn prepare(&mut self, scene: &Scene, object: &SceneObject);

    fn vertex(&self, input: &Vertex) -> Vertex;

    fn fragment(&self, input: &Vertex, mip_level: f32) -> Option<Color>;

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot;

    /// Host-facing toggle; shaders without a lighting term ignore it.
    fn set_lighting(&mut self, _enabled: bool) {}
}

/// Stand-in occupying a scene object's shader slot while the live shader is
/// temporarily moved out during the geometry stage. Draws nothing.
pub(crate) struct InertShader;

impl Shader for InertShader {
    fn prepare(&mut self, _scene: &Scene, _object: &SceneObject) {}

    fn vertex(&self, input: &Vertex) -> Vertex {
        *input
    }

    fn fragment(&self, _input: &Vertex, _mip_level: f32) -> Option<Color> {
        None
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(InertShader)
    }
}

/// Frame-local storage for prepared shader snapshots.
///
/// Draw calls reference their snapshot by slot, so the list may grow (and
/// reallocate) freely while draw calls are still being recorded.
#[derive(Default)]
pub struct ShaderArena {
    states: Vec<Box<dyn Shader>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderSlot(usize);

impl ShaderArena {
    pub fn new() -> Self {
        ShaderArena { states: Vec::new() }
    }

    pub fn insert(&mut self, shader: impl Shader + 'static) -> ShaderSlot {
        let slot = ShaderSlot(self.states.len());
        self.states.push(Box::new(shader));
        slot
    }

    pub fn get(&self, slot: ShaderSlot) -> &dyn Shader {
        &*self.states[slot.0]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop this frame's snapshots, keeping the allocation of the list
    /// itself.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
