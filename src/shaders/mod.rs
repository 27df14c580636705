mod lit;
mod unlit;

pub use lit::{LitCutoutShader, LitShader};
pub use unlit::UnlitShader;
