//! Demo host: a winit window presenting the software rasterizer through
//! the `pixels` crate.
//!
//! Controls:
//!   T:    cycle texture filter (point, bilinear, trilinear)
//!   M:    toggle mipmaps
//!   L:    toggle lighting
//!   F:    cycle anti-aliasing (off, 4x MSAA, 2x SSAA, 4x SSAA)
//!   G:    toggle rasterizer (half-space, scanline)
//!   C:    toggle framerate cap
//!   R:    reload scene_settings.json
//!   Esc:  quit

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use log::{info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use softrast::config::RenderConfig;
use softrast::shaders::{LitCutoutShader, LitShader, UnlitShader};
use softrast::{
    AmbientLight, Camera, Color, Color32, CullMode, DirectionalLight, FilterMode, Light, Mesh,
    PointLight, PresentTarget, RenderingContext, Scene, SceneObject, SpotLight, Texture, Vertex,
};
use softrast::vec::{Vec2, Vec3, Vec4};

const SETTINGS_PATH: &str = "scene_settings.json";

fn main() -> Result<()> {
    env_logger::init();

    let config = match RenderConfig::load_toml("render.toml") {
        Ok(config) => config,
        Err(err) => {
            info!("no render.toml ({err:#}), using defaults");
            RenderConfig::default()
        }
    };

    let width = config.width;
    let height = config.height;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("softrast")
        .with_inner_size(LogicalSize::new(width as f64, height as f64))
        .build(&event_loop)
        .context("failed to create window")?;

    let mut pixels = {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(width as u32, height as u32, surface)?
    };

    let mut context = RenderingContext::new(width, height, config.threads)?;
    context.set_clear_color(config.clear_color);
    context.set_rasterization_mode(config.rasterizer.into());
    context.set_anti_aliasing(config.anti_aliasing.into());
    context.set_mipmaps_enabled(config.mipmaps);

    let mut scene = build_scene(width as f32 / height as f32);
    if let Some(path) = &config.settings_path {
        if let Err(err) = scene.apply_settings(path) {
            warn!("failed to apply {path:?}: {err}");
        }
    }

    let textures: Vec<Arc<Texture>> = scene.objects.iter().map(|o| o.texture.clone()).collect();
    let mut filter_mode = FilterMode::Bilinear;
    let mut lighting = true;
    let mut cap_framerate = config.fps_cap.is_some();
    let min_frame_interval = Duration::from_secs_f32(1.0 / config.fps_cap.unwrap_or(30.0));

    let mut last_frame = Instant::now();
    let mut spin = 0.0f32;
    let mut fps_counter = FpsCounter::new();

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_poll();

        match event {
            Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
                control_flow.set_exit();
            }
            Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
                if pixels.resize_surface(size.width, size.height).is_err() {
                    control_flow.set_exit();
                }
            }
            Event::WindowEvent {
                event:
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(key),
                                ..
                            },
                        ..
                    },
                ..
            } => match key {
                VirtualKeyCode::Escape => control_flow.set_exit(),
                VirtualKeyCode::T => {
                    filter_mode = filter_mode.cycled();
                    for texture in &textures {
                        texture.set_filter_mode(filter_mode);
                    }
                }
                VirtualKeyCode::M => {
                    context.set_mipmaps_enabled(!context.mipmaps_enabled());
                }
                VirtualKeyCode::L => {
                    lighting = !lighting;
                    for object in &mut scene.objects {
                        object.shader.set_lighting(lighting);
                    }
                }
                VirtualKeyCode::F => {
                    context.set_anti_aliasing(context.anti_aliasing().cycled());
                }
                VirtualKeyCode::G => {
                    use softrast::RasterizationMode::*;
                    context.set_rasterization_mode(match context.rasterization_mode() {
                        Halfspace => Scanline,
                        Scanline => Halfspace,
                    });
                }
                VirtualKeyCode::C => cap_framerate = !cap_framerate,
                VirtualKeyCode::R => {
                    if let Err(err) = scene.apply_settings(SETTINGS_PATH) {
                        warn!("failed to reload {SETTINGS_PATH}: {err}");
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                let dt = last_frame.elapsed();
                if cap_framerate && dt < min_frame_interval {
                    std::thread::sleep(min_frame_interval - dt);
                }
                let dt = last_frame.elapsed();
                last_frame = Instant::now();

                spin += dt.as_secs_f32() * 30.0;
                if let Some(obj) = scene.find_object_mut("crate") {
                    obj.transform.set_rotation(Vec3::from([0.0, spin, 0.0]));
                }

                context.clear(true, true);
                if let Err(err) = context.draw(&mut scene) {
                    warn!("frame dropped: {err}");
                }
                context.present(&mut PixelsTarget(pixels.frame_mut()));

                if let Some(fps) = fps_counter.tick() {
                    window.set_title(&format!(
                        "softrast {}x{} - filter: {} - mipmaps: {} - aa: {} - {} - {fps} fps",
                        context.width(),
                        context.height(),
                        filter_mode.name(),
                        if context.mipmaps_enabled() { "on" } else { "off" },
                        context.anti_aliasing().name(),
                        context.rasterization_mode().name(),
                    ));
                }
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                if pixels.render().is_err() {
                    control_flow.set_exit();
                }
            }
            _ => {}
        }
    });
}

/// Adapter copying the context's BGRA buffer into the RGBA frame of the
/// `pixels` surface.
struct PixelsTarget<'a>(&'a mut [u8]);

impl PresentTarget for PixelsTarget<'_> {
    fn blit(&mut self, pixels: &[u32], width: usize, height: usize) {
        let count = (width * height).min(self.0.len() / 4);
        for (src, dst) in pixels[..count].iter().zip(self.0.chunks_exact_mut(4)) {
            let [b, g, r, a] = src.to_le_bytes();
            dst.copy_from_slice(&[r, g, b, a]);
        }
    }
}

struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        FpsCounter { frames: 0, since: Instant::now() }
    }

    fn tick(&mut self) -> Option<u32> {
        self.frames += 1;
        if self.since.elapsed() >= Duration::from_secs(1) {
            let fps = self.frames;
            self.frames = 0;
            self.since = Instant::now();
            return Some(fps);
        }
        None
    }
}

fn build_scene(aspect: f32) -> Scene {
    let mut camera = Camera::new(60.0, aspect, 0.1, 300.0);
    camera.transform.set_position(Vec3::from([0.0, 2.0, -6.0]));
    camera.transform.set_rotation(Vec3::from([12.0, 0.0, 0.0]));

    let mut scene = Scene::new(camera);

    let checker = Arc::new(checkerboard_texture(256, 32));
    let crate_tex = Arc::new(panel_texture(128));
    let fence_tex = Arc::new(fence_texture(128));

    let mut terrain = SceneObject::new(
        "terrain",
        Arc::new(plane_mesh(30.0, 10.0)),
        checker,
        Box::new(LitShader::new()),
    );
    terrain.transform.set_position(Vec3::from([0.0, -1.0, 0.0]));
    scene.objects.push(terrain);

    let mut spinner = SceneObject::new(
        "crate",
        Arc::new(cube_mesh(1.0)),
        crate_tex,
        Box::new(LitShader::new()),
    );
    spinner.transform.set_position(Vec3::from([0.0, 0.0, 0.0]));
    scene.objects.push(spinner);

    let mut fence = SceneObject::new(
        "fence",
        Arc::new(wall_mesh(4.0, 1.5)),
        fence_tex,
        Box::new(LitCutoutShader::new(0.5)),
    )
    .with_cull_mode(CullMode::None);
    fence.transform.set_position(Vec3::from([0.0, -0.25, 2.5]));
    scene.objects.push(fence);

    let mut sky = SceneObject::new(
        "sky",
        Arc::new(cube_mesh(200.0)),
        Arc::new(sky_texture(64)),
        Box::new(UnlitShader::new()),
    )
    .with_cull_mode(CullMode::Front);
    sky.transform.set_position(Vec3::from([0.0, 0.0, 0.0]));
    scene.objects.push(sky);

    scene.lights.push(Light::ambient(
        "ambient_light",
        AmbientLight { color: Color::new(0.46, 0.68, 0.85, 1.0), intensity: 0.4 },
    ));
    scene.lights.push(Light::directional(
        "direct_light",
        DirectionalLight {
            color: Color::new(1.0, 0.96, 0.88, 1.0),
            intensity: 0.8,
            direction: Vec3::from([0.4, -1.0, 0.3]).normalized(),
        },
    ));
    scene.lights.push(Light::point(
        "lamp_light",
        PointLight {
            color: Color::new(1.0, 0.85, 0.5, 1.0),
            intensity: 1.2,
            position: Vec3::from([2.0, 1.5, -1.0]),
            dist_atten_min: 2.0,
            dist_atten_max: 6.0,
        },
    ));
    let mut headlight = SpotLight::default();
    headlight.intensity = 1.5;
    headlight.position = Vec3::from([-3.0, 1.0, -3.0]);
    headlight.direction = Vec3::from([0.7, -0.3, 0.7]).normalized();
    scene.lights.push(Light::spot("headlight", headlight));

    scene
}

fn vert(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex::new(
        Vec4::from([pos[0], pos[1], pos[2], 1.0]),
        Vec3::from(normal),
        Vec2::from(uv),
    )
}

/// A ground quad in the xz plane, facing up, with tiled UVs.
fn plane_mesh(size: f32, uv_tiles: f32) -> Mesh {
    let s = size * 0.5;
    let t = uv_tiles;
    let up = [0.0, 1.0, 0.0];
    Mesh::new(vec![
        vert([-s, 0.0, -s], up, [0.0, 0.0]),
        vert([-s, 0.0, s], up, [0.0, t]),
        vert([s, 0.0, s], up, [t, t]),
        vert([-s, 0.0, -s], up, [0.0, 0.0]),
        vert([s, 0.0, s], up, [t, t]),
        vert([s, 0.0, -s], up, [t, 0.0]),
    ])
}

/// A vertical quad in the xy plane facing -z.
fn wall_mesh(width: f32, height: f32) -> Mesh {
    let w = width * 0.5;
    let n = [0.0, 0.0, -1.0];
    Mesh::new(vec![
        vert([-w, 0.0, 0.0], n, [0.0, 1.0]),
        vert([-w, height, 0.0], n, [0.0, 0.0]),
        vert([w, height, 0.0], n, [1.0, 0.0]),
        vert([-w, 0.0, 0.0], n, [0.0, 1.0]),
        vert([w, height, 0.0], n, [1.0, 0.0]),
        vert([w, 0.0, 0.0], n, [1.0, 1.0]),
    ])
}

fn cube_mesh(size: f32) -> Mesh {
    let s = size * 0.5;
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // (normal, u axis, v axis)
        ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ];

    let mut verts = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let n = Vec3::from(normal);
        let u = Vec3::from(u_axis);
        let v = Vec3::from(v_axis);
        let corner = |du: f32, dv: f32| {
            let p = n * s + u * (du - 0.5) * size + v * (dv - 0.5) * size;
            vert(p.to_array(), normal, [du, 1.0 - dv])
        };
        // two triangles, counter-clockwise seen from outside
        verts.push(corner(0.0, 0.0));
        verts.push(corner(0.0, 1.0));
        verts.push(corner(1.0, 1.0));
        verts.push(corner(0.0, 0.0));
        verts.push(corner(1.0, 1.0));
        verts.push(corner(1.0, 0.0));
    }
    Mesh::new(verts)
}

fn checkerboard_texture(size: usize, cell: usize) -> Texture {
    let a = Color32::new(190, 185, 170, 255);
    let b = Color32::new(90, 95, 105, 255);
    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            pixels.push(if (x / cell + y / cell) % 2 == 0 { a } else { b });
        }
    }
    Texture::from_pixels(size, size, 3, pixels, FilterMode::Bilinear)
}

fn panel_texture(size: usize) -> Texture {
    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let edge = x < 4 || y < 4 || x >= size - 4 || y >= size - 4;
            let shade = 140 + ((x * 37 + y * 57) % 41) as u8;
            pixels.push(if edge {
                Color32::new(70, 50, 30, 255)
            } else {
                Color32::new(shade, shade / 2 + 50, 40, 255)
            });
        }
    }
    Texture::from_pixels(size, size, 3, pixels, FilterMode::Bilinear)
}

/// Vertical slats with transparent gaps, for the cutout shader.
fn fence_texture(size: usize) -> Texture {
    let mut pixels = Vec::with_capacity(size * size);
    for _y in 0..size {
        for x in 0..size {
            let slat = (x / (size / 8)) % 2 == 0;
            pixels.push(if slat {
                Color32::new(120, 90, 60, 255)
            } else {
                Color32::new(0, 0, 0, 0)
            });
        }
    }
    Texture::from_pixels(size, size, 4, pixels, FilterMode::Bilinear)
}

fn sky_texture(size: usize) -> Texture {
    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        let t = y as f32 / size as f32;
        let r = (60.0 + 80.0 * t) as u8;
        let g = (110.0 + 70.0 * t) as u8;
        let b = (200.0 + 40.0 * t) as u8;
        for _x in 0..size {
            pixels.push(Color32::new(r, g, b.min(255), 255));
        }
    }
    Texture::from_pixels(size, size, 3, pixels, FilterMode::Bilinear)
}
