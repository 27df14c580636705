//! End-to-end pipeline scenarios: whole frames rendered through the public
//! surface with small test shaders feeding clip-space geometry straight
//! through the vertex stage.

use std::sync::Arc;

use softrast::shader::{ShaderArena, ShaderSlot};
use softrast::vec::{Vec2, Vec3, Vec4};
use softrast::{
    AntiAliasing, Camera, Color, Color32, CullMode, FilterMode, Mesh, RasterizationMode,
    RenderingContext, Scene, SceneObject, Shader, Texture, Vertex,
};

/// Passes mesh positions through as clip coordinates and shades a constant
/// color, so tests control the screen mapping exactly.
#[derive(Clone)]
struct SolidShader {
    color: Color,
}

impl Shader for SolidShader {
    fn prepare(&mut self, _scene: &Scene, _object: &SceneObject) {}

    fn vertex(&self, input: &Vertex) -> Vertex {
        *input
    }

    fn fragment(&self, _input: &Vertex, _mip_level: f32) -> Option<Color> {
        Some(self.color)
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }
}

/// Shades the interpolated texture coordinate into the red/green channels.
#[derive(Clone)]
struct UvShader;

impl Shader for UvShader {
    fn prepare(&mut self, _scene: &Scene, _object: &SceneObject) {}

    fn vertex(&self, input: &Vertex) -> Vertex {
        *input
    }

    fn fragment(&self, input: &Vertex, _mip_level: f32) -> Option<Color> {
        Some(Color::new(input.texcoord.x, input.texcoord.y, 0.0, 1.0))
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }
}

/// Discards every fragment.
#[derive(Clone)]
struct DiscardShader;

impl Shader for DiscardShader {
    fn prepare(&mut self, _scene: &Scene, _object: &SceneObject) {}

    fn vertex(&self, input: &Vertex) -> Vertex {
        *input
    }

    fn fragment(&self, _input: &Vertex, _mip_level: f32) -> Option<Color> {
        None
    }

    fn clone_into(&self, arena: &mut ShaderArena) -> ShaderSlot {
        arena.insert(self.clone())
    }
}

fn white_texture() -> Arc<Texture> {
    Arc::new(Texture::from_pixels(
        1,
        1,
        3,
        vec![Color32::new(255, 255, 255, 255)],
        FilterMode::Point,
    ))
}

fn vert(pos: [f32; 4], uv: [f32; 2]) -> Vertex {
    Vertex::new(Vec4::from(pos), Vec3::up(), Vec2::from(uv))
}

/// Two triangles covering the whole viewport in clip space, at constant
/// clip `w` (so depth is `1/w` everywhere).
fn fullscreen_quad(w: f32) -> Mesh {
    let lt = vert([-w, w, 0.0, w], [0.0, 0.0]);
    let rt = vert([w, w, 0.0, w], [1.0, 0.0]);
    let lb = vert([-w, -w, 0.0, w], [0.0, 1.0]);
    let rb = vert([w, -w, 0.0, w], [1.0, 1.0]);
    Mesh::new(vec![lt, lb, rb, lt, rb, rt])
}

fn scene_with(objects: Vec<SceneObject>) -> Scene {
    let mut scene = Scene::new(Camera::new(90.0, 1.0, 0.1, 100.0));
    scene.objects = objects;
    scene
}

fn object(name: &str, mesh: Mesh, shader: impl Shader + 'static) -> SceneObject {
    SceneObject::new(name, Arc::new(mesh), white_texture(), Box::new(shader))
        .with_cull_mode(CullMode::None)
}

fn white_quad_scene(w: f32) -> Scene {
    scene_with(vec![object(
        "quad",
        fullscreen_quad(w),
        SolidShader { color: Color::WHITE },
    )])
}

fn solid_bgra(color: Color) -> u32 {
    color.to_bgra()
}

#[test]
fn fullscreen_quad_covers_every_pixel_once() {
    for mode in [RasterizationMode::Halfspace, RasterizationMode::Scanline] {
        let mut ctx = RenderingContext::new(4, 4, 1).unwrap();
        ctx.set_rasterization_mode(mode);
        ctx.clear(true, true);

        let mut scene = white_quad_scene(0.5);
        ctx.draw(&mut scene).unwrap();

        let white = solid_bgra(Color::WHITE);
        for (i, &px) in ctx.color_buffer().iter().enumerate() {
            assert_eq!(px, white, "pixel {i} not covered in {mode:?}");
        }
        for (i, &d) in ctx.depth_buffer().iter().enumerate() {
            assert_eq!(d, 2.0, "depth {i} wrong in {mode:?}");
        }
    }
}

#[test]
fn abutting_triangles_share_edges_without_holes_or_double_writes() {
    // the quad's two triangles share the diagonal at identical depth; a
    // double-covered pixel would keep the first-drawn triangle's color, so
    // reversing the draw order would change the image. The pair runs with
    // both windings: the objects cull nothing, so the reversed pair goes
    // through the back-face coverage test
    let red = SolidShader { color: Color::new(1.0, 0.0, 0.0, 1.0) };
    let green = SolidShader { color: Color::new(0.0, 1.0, 0.0, 1.0) };

    let w = 0.5;
    let lt = vert([-w, w, 0.0, w], [0.0, 0.0]);
    let rt = vert([w, w, 0.0, w], [1.0, 0.0]);
    let lb = vert([-w, -w, 0.0, w], [0.0, 1.0]);
    let rb = vert([w, -w, 0.0, w], [1.0, 1.0]);

    let windings: [[Vec<Vertex>; 2]; 2] = [
        // front-facing pair
        [vec![lt, lb, rb], vec![lt, rb, rt]],
        // the same pair wound the other way, rasterized as back faces
        [vec![rb, lb, lt], vec![rt, rb, lt]],
    ];

    for [tri_a, tri_b] in &windings {
        let render = |first_a: bool| {
            let mut ctx = RenderingContext::new(16, 16, 1).unwrap();
            ctx.set_clear_color(Color::new(0.0, 0.0, 1.0, 1.0));
            ctx.clear(true, true);

            let a = object("a", Mesh::new(tri_a.clone()), red.clone());
            let b = object("b", Mesh::new(tri_b.clone()), green.clone());
            let mut scene = scene_with(if first_a { vec![a, b] } else { vec![b, a] });
            ctx.draw(&mut scene).unwrap();
            ctx.color_buffer().to_vec()
        };

        let ab = render(true);
        let ba = render(false);

        let background = solid_bgra(Color::new(0.0, 0.0, 1.0, 1.0));
        assert!(ab.iter().all(|&px| px != background), "hole in coverage");
        assert_eq!(ab, ba, "a pixel was written by both triangles");
    }
}

#[test]
fn closer_fragment_wins_regardless_of_draw_order() {
    let expected = solid_bgra(Color::new(1.0, 0.0, 0.0, 1.0));
    for near_first in [true, false] {
        let mut ctx = RenderingContext::new(8, 8, 1).unwrap();
        ctx.clear(true, true);
        let near = object("near", fullscreen_quad(0.5), SolidShader {
            // depth 2.0: closer under the reciprocal-w convention
            color: Color::new(1.0, 0.0, 0.0, 1.0),
        });
        let far = object("far", fullscreen_quad(1.0), SolidShader {
            color: Color::new(0.0, 1.0, 0.0, 1.0),
        });
        let mut scene = scene_with(if near_first {
            vec![near, far]
        } else {
            vec![far, near]
        });
        ctx.draw(&mut scene).unwrap();
        assert!(ctx.color_buffer().iter().all(|&px| px == expected));
    }
}

#[test]
fn perspective_correct_uvs_are_nonlinear_in_screen_space() {
    // a quad receding to the right: the right edge is three times as far
    // away, so at the screen midpoint the perspective-correct u is 0.25,
    // not the affine 0.5
    let lt = vert([-1.0, 1.0, 0.0, 1.0], [0.0, 0.0]);
    let lb = vert([-1.0, -1.0, 0.0, 1.0], [0.0, 1.0]);
    let rt = vert([3.0, 3.0, 0.0, 3.0], [1.0, 0.0]);
    let rb = vert([3.0, -3.0, 0.0, 3.0], [1.0, 1.0]);
    let mesh = Mesh::new(vec![lt, lb, rb, lt, rb, rt]);

    let mut ctx = RenderingContext::new(64, 64, 1).unwrap();
    ctx.clear(true, true);
    let mut scene = scene_with(vec![object("tilted", mesh, UvShader)]);
    ctx.draw(&mut scene).unwrap();

    let px = ctx.color_buffer()[32 * 64 + 32];
    let r = ((px >> 16) & 0xff) as f32 / 255.0;
    assert!(
        (r - 0.25).abs() < 0.03,
        "u at the midpoint should be ~0.25 (perspective), got {r}"
    );
}

#[test]
fn ssaa_produces_intermediate_shades_on_edges() {
    // a triangle whose hypotenuse cuts across pixels
    let w = 1.0;
    let mesh = Mesh::new(vec![
        vert([-w, w, 0.0, w], [0.0, 0.0]),
        vert([-w, -w, 0.0, w], [0.0, 1.0]),
        vert([w, -w, 0.0, w], [1.0, 1.0]),
    ]);

    let edge_values = |aa: AntiAliasing| {
        let mut ctx = RenderingContext::new(8, 8, 1).unwrap();
        ctx.set_anti_aliasing(aa);
        ctx.clear(true, true);
        let mut scene = scene_with(vec![object(
            "thin",
            Mesh::new(mesh.vertices().to_vec()),
            SolidShader { color: Color::WHITE },
        )]);
        ctx.draw(&mut scene).unwrap();
        ctx.color_buffer()
            .iter()
            .map(|&px| (px & 0xff) as u32)
            .collect::<Vec<_>>()
    };

    let hard = edge_values(AntiAliasing::Off);
    assert!(hard.iter().all(|&v| v == 0 || v == 255));

    let soft = edge_values(AntiAliasing::Ssaa4x);
    assert!(
        soft.iter().any(|&v| v > 0 && v < 255),
        "SSAA 4x should blend partially covered pixels"
    );
}

#[test]
fn msaa_discard_leaves_samples_untouched() {
    let mut ctx = RenderingContext::new(4, 4, 1).unwrap();
    ctx.set_anti_aliasing(AntiAliasing::Msaa4x);
    ctx.set_clear_color(Color::new(1.0, 0.0, 1.0, 1.0));
    ctx.clear(true, true);

    let mut scene = scene_with(vec![object("cutout", fullscreen_quad(0.5), DiscardShader)]);
    ctx.draw(&mut scene).unwrap();

    let background = solid_bgra(Color::new(1.0, 0.0, 1.0, 1.0));
    assert!(ctx.color_buffer().iter().all(|&px| px == background));
    assert!(ctx.depth_buffer().iter().all(|&d| d == 0.0));
}

#[test]
fn msaa_blends_coverage_on_edges() {
    let w = 1.0;
    let mesh = Mesh::new(vec![
        vert([-w, w, 0.0, w], [0.0, 0.0]),
        vert([-w, -w, 0.0, w], [0.0, 1.0]),
        vert([w, -w, 0.0, w], [1.0, 1.0]),
    ]);

    let mut ctx = RenderingContext::new(8, 8, 1).unwrap();
    ctx.set_anti_aliasing(AntiAliasing::Msaa4x);
    ctx.clear(true, true);
    let mut scene = scene_with(vec![object("thin", mesh, SolidShader { color: Color::WHITE })]);
    ctx.draw(&mut scene).unwrap();

    let shades: Vec<u32> = ctx.color_buffer().iter().map(|&px| px & 0xff).collect();
    assert!(shades.iter().any(|&v| v == 255));
    assert!(
        shades.iter().any(|&v| v > 0 && v < 255),
        "MSAA should blend partially covered pixels"
    );
}

#[test]
fn worker_count_does_not_change_the_image() {
    // several overlapping triangles at varying depths, crossing strip
    // boundaries, rendered under every AA/rasterizer combination
    let build_scene = || {
        let tris = Mesh::new(vec![
            vert([-0.9, 0.8, 0.0, 1.0], [0.0, 0.0]),
            vert([-0.7, -0.9, 0.0, 1.0], [0.0, 1.0]),
            vert([0.8, -0.2, 0.0, 2.0], [1.0, 1.0]),
            vert([0.9, 0.9, 0.0, 0.8], [1.0, 0.0]),
            vert([-0.8, 0.1, 0.0, 1.4], [0.0, 0.0]),
            vert([0.3, -0.9, 0.0, 1.1], [0.5, 1.0]),
        ]);
        scene_with(vec![
            object("tris", tris, UvShader),
            object("floor", fullscreen_quad(2.0), SolidShader {
                color: Color::new(0.2, 0.2, 0.2, 1.0),
            }),
        ])
    };

    for raster in [RasterizationMode::Halfspace, RasterizationMode::Scanline] {
        for aa in [AntiAliasing::Off, AntiAliasing::Msaa4x, AntiAliasing::Ssaa2x] {
            let render = |threads: usize| {
                let mut ctx = RenderingContext::new(64, 64, threads).unwrap();
                ctx.set_rasterization_mode(raster);
                ctx.set_anti_aliasing(aa);
                ctx.clear(true, true);
                let mut scene = build_scene();
                ctx.draw(&mut scene).unwrap();
                ctx.color_buffer().to_vec()
            };

            assert_eq!(
                render(1),
                render(5),
                "1 vs 5 workers diverged for {raster:?}/{aa:?}"
            );
        }
    }
}

#[test]
fn culled_objects_emit_no_fragments() {
    let mut ctx = RenderingContext::new(8, 8, 1).unwrap();
    ctx.clear(true, true);

    let mut quad = object(
        "behind",
        fullscreen_quad(0.5),
        SolidShader { color: Color::WHITE },
    );
    // push the object's bounding sphere far behind the camera
    quad.transform.set_position(Vec3::from([0.0, 0.0, -500.0]));

    let mut scene = scene_with(vec![quad]);
    ctx.draw(&mut scene).unwrap();

    assert_eq!(ctx.frame_stats().objects_culled, 1);
    assert!(ctx.color_buffer().iter().all(|&px| px == 0));
}

#[test]
fn cutout_discard_keeps_depth_for_later_draws() {
    // a discarded front layer must not occlude a farther opaque layer
    let mut ctx = RenderingContext::new(8, 8, 1).unwrap();
    ctx.clear(true, true);

    let mut scene = scene_with(vec![
        object("holes", fullscreen_quad(0.5), DiscardShader),
        object("behind", fullscreen_quad(1.0), SolidShader { color: Color::WHITE }),
    ]);
    ctx.draw(&mut scene).unwrap();

    let white = solid_bgra(Color::WHITE);
    assert!(ctx.color_buffer().iter().all(|&px| px == white));
}
