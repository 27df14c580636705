use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::warn;
use serde::Deserialize;

use crate::camera::Camera;
use crate::color::Color;
use crate::error::SettingsError;
use crate::light::{Light, LightKind};
use crate::math::Sphere;
use crate::mesh::Mesh;
use crate::shader::Shader;
use crate::texture::Texture;
use crate::transform::Transform;
use crate::vec::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub mesh: Arc<Mesh>,
    pub texture: Arc<Texture>,
    pub shader: Box<dyn Shader>,
    pub cull_mode: CullMode,
}

impl SceneObject {
    pub fn new(
        name: impl Into<String>,
        mesh: Arc<Mesh>,
        texture: Arc<Texture>,
        shader: Box<dyn Shader>,
    ) -> Self {
        SceneObject {
            name: name.into(),
            transform: Transform::new(),
            mesh,
            texture,
            shader,
            cull_mode: CullMode::Back,
        }
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Model bounding sphere carried into world space. Non-uniform scale is
    /// handled conservatively by the largest axis factor.
    pub fn world_bounding_sphere(&self) -> Sphere {
        let sphere = self.mesh.bounding_sphere();
        let center = (self.transform.matrix() * sphere.center.to_hom()).xyz();
        let scale = self.transform.scale();
        let max_scale = scale.x.abs().max(scale.y.abs()).max(scale.z.abs());
        Sphere::new(center, sphere.radius * max_scale)
    }
}

/// All state drawn in one frame: a camera, objects and lights. Mutable from
/// the host between frames, read-only while a frame is in flight.
pub struct Scene {
    pub camera: Camera,
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Scene {
            camera,
            objects: Vec::new(),
            lights: Vec::new(),
        }
    }

    pub fn find_object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.name == name)
    }

    pub fn find_object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.name == name)
    }

    pub fn find_light(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|light| light.name == name)
    }

    pub fn find_light_mut(&mut self, name: &str) -> Option<&mut Light> {
        self.lights.iter_mut().find(|light| light.name == name)
    }

    /// Apply a settings file: one JSON mapping keyed by object or light
    /// name. Entries naming nothing in the scene are ignored with a
    /// warning; the shape of each entry decides what it configures.
    pub fn apply_settings(&mut self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: BTreeMap<String, SettingsEntry> = serde_json::from_str(&contents)?;

        for (name, entry) in settings {
            match entry {
                SettingsEntry::Object { pos, rot } => {
                    if let Some(obj) = self.find_object_mut(&name) {
                        obj.transform.set_position(Vec3::from(pos));
                        obj.transform.set_rotation(Vec3::from(rot));
                    } else {
                        warn!("settings entry {name:?} matches no scene object");
                    }
                }
                light_entry => {
                    if let Some(light) = self.find_light_mut(&name) {
                        apply_light_entry(light, light_entry, &name);
                    } else {
                        warn!("settings entry {name:?} matches no light");
                    }
                }
            }
        }
        Ok(())
    }
}

fn color_from(rgba: [f32; 4]) -> Color {
    Color::new(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn apply_light_entry(light: &mut Light, entry: SettingsEntry, name: &str) {
    match (&mut light.kind, entry) {
        (
            LightKind::Ambient(ambient),
            SettingsEntry::Ambient { color, multiplier },
        ) => {
            ambient.color = color_from(color);
            ambient.intensity = multiplier;
        }
        (
            LightKind::Directional(directional),
            SettingsEntry::Directional { color, multiplier, dir },
        ) => {
            directional.color = color_from(color);
            directional.intensity = multiplier;
            directional.direction = Vec3::from(dir);
        }
        (
            LightKind::Point(point),
            SettingsEntry::Point { color, multiplier, pos, dist_atten_min, dist_atten_max },
        ) => {
            point.color = color_from(color);
            point.intensity = multiplier;
            point.position = Vec3::from(pos);
            point.dist_atten_min = dist_atten_min;
            point.dist_atten_max = dist_atten_max;
        }
        (
            LightKind::Spot(spot),
            SettingsEntry::Spot {
                color,
                multiplier,
                pos,
                dir,
                ang_atten_min,
                ang_atten_max,
                dist_atten_min,
                dist_atten_max,
            },
        ) => {
            spot.color = color_from(color);
            spot.intensity = multiplier;
            spot.position = Vec3::from(pos);
            spot.direction = Vec3::from(dir);
            spot.ang_atten_min = ang_atten_min;
            spot.ang_atten_max = ang_atten_max;
            spot.dist_atten_min = dist_atten_min;
            spot.dist_atten_max = dist_atten_max;
        }
        _ => warn!("settings entry {name:?} does not match the light's kind"),
    }
}

/// The recognized value shapes, tried most specific first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SettingsEntry {
    Spot {
        color: [f32; 4],
        multiplier: f32,
        pos: [f32; 3],
        dir: [f32; 3],
        #[serde(rename = "angAttenMin")]
        ang_atten_min: f32,
        #[serde(rename = "angAttenMax")]
        ang_atten_max: f32,
        #[serde(rename = "distAttenMin")]
        dist_atten_min: f32,
        #[serde(rename = "distAttenMax")]
        dist_atten_max: f32,
    },
    Point {
        color: [f32; 4],
        multiplier: f32,
        pos: [f32; 3],
        #[serde(rename = "distAttenMin")]
        dist_atten_min: f32,
        #[serde(rename = "distAttenMax")]
        dist_atten_max: f32,
    },
    Directional {
        color: [f32; 4],
        multiplier: f32,
        dir: [f32; 3],
    },
    Ambient {
        color: [f32; 4],
        multiplier: f32,
    },
    Object {
        pos: [f32; 3],
        rot: [f32; 3],
    },
}
