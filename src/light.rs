use crate::color::Color;
use crate::math::{extract_frustum, look_toward, normalized_clamp, Plane, Sphere};
use crate::vec::{Mat4x4, Vec3};

/// A named scene light. Lights contribute additively; every variant answers
/// `apply` with the color it adds at a surface point.
///
/// [`Light::update`] runs once per frame before drawing so that variants can
/// precompute derived state (the spot light builds its culling frustum
/// there).
#[derive(Clone, Debug)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
}

#[derive(Clone, Debug)]
pub enum LightKind {
    Ambient(AmbientLight),
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

#[derive(Clone, Debug)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        AmbientLight { color: Color::WHITE, intensity: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        DirectionalLight {
            color: Color::WHITE,
            intensity: 1.0,
            direction: Vec3::forward(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub dist_atten_min: f32,
    pub dist_atten_max: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        PointLight {
            color: Color::WHITE,
            intensity: 1.0,
            position: Vec3::zero(),
            dist_atten_min: 4.0,
            dist_atten_max: 5.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub direction: Vec3,
    /// Cone angles in degrees; attenuation ramps between the two.
    pub ang_atten_min: f32,
    pub ang_atten_max: f32,
    pub dist_atten_min: f32,
    pub dist_atten_max: f32,
    frustum: [Plane; 6],
}

impl Default for SpotLight {
    fn default() -> Self {
        SpotLight {
            color: Color::WHITE,
            intensity: 1.0,
            position: Vec3::zero(),
            direction: Vec3::forward(),
            ang_atten_min: 40.0,
            ang_atten_max: 45.0,
            dist_atten_min: 8.0,
            dist_atten_max: 10.0,
            frustum: [Plane::default(); 6],
        }
    }
}

impl SpotLight {
    /// Rebuild the 6-plane cone frustum from the current parameters. The
    /// square cross-section circumscribes the cone, so the test is
    /// conservative: nothing the cone reaches is ever culled.
    fn update_frustum(&mut self) {
        let view = look_toward(self.position, self.direction);
        let proj = Mat4x4::perspective(self.ang_atten_max, 1.0, 0.01, self.dist_atten_max);
        self.frustum = extract_frustum(&(proj * view));
    }

    fn contains(&self, point: Vec3) -> bool {
        self.frustum.iter().all(|plane| plane.distance(point) >= 0.0)
    }
}

impl Light {
    pub fn ambient(name: impl Into<String>, light: AmbientLight) -> Self {
        Light { name: name.into(), kind: LightKind::Ambient(light) }
    }

    pub fn directional(name: impl Into<String>, light: DirectionalLight) -> Self {
        Light { name: name.into(), kind: LightKind::Directional(light) }
    }

    pub fn point(name: impl Into<String>, light: PointLight) -> Self {
        Light { name: name.into(), kind: LightKind::Point(light) }
    }

    pub fn spot(name: impl Into<String>, light: SpotLight) -> Self {
        let mut light = light;
        light.update_frustum();
        Light { name: name.into(), kind: LightKind::Spot(light) }
    }

    /// Per-frame precompute, called before any shader is prepared.
    pub fn update(&mut self) {
        if let LightKind::Spot(spot) = &mut self.kind {
            spot.update_frustum();
        }
    }

    /// Whether this light can contribute anything inside `bounds`. Used to
    /// trim the light list snapshotted per draw call.
    pub fn can_affect(&self, bounds: &Sphere) -> bool {
        match &self.kind {
            LightKind::Ambient(_) | LightKind::Directional(_) => true,
            LightKind::Point(point) => {
                let reach = point.dist_atten_max + bounds.radius;
                (bounds.center - point.position).mag_sq() <= reach * reach
            }
            LightKind::Spot(spot) => spot.frustum.iter().all(|plane| !plane.in_back(bounds)),
        }
    }

    /// Color contributed at a surface point. `eye_pos`/`eye_dir` are part of
    /// the lighting contract even though the stock models ignore them.
    pub fn apply(&self, surf_pos: Vec3, surf_norm: Vec3, _eye_pos: Vec3, _eye_dir: Vec3) -> Color {
        match &self.kind {
            LightKind::Ambient(ambient) => ambient.color * ambient.intensity,

            LightKind::Directional(directional) => {
                let cn = surf_norm.dot(-directional.direction);
                if cn < 0.0 {
                    return Color::CLEAR;
                }
                directional.color * (cn * directional.intensity)
            }

            LightKind::Point(point) => {
                let light_vec = surf_pos - point.position;
                let len_sq = light_vec.mag_sq();
                if len_sq > point.dist_atten_max * point.dist_atten_max {
                    return Color::CLEAR;
                }

                let dist = len_sq.sqrt();
                let light_dir = light_vec / dist;
                let cn = surf_norm.dot(-light_dir);
                if cn < 0.0 {
                    return Color::CLEAR;
                }

                let cd = normalized_clamp(dist, point.dist_atten_min, point.dist_atten_max);
                let cd = 1.0 - cd * cd;
                point.color * (cd * cn * point.intensity)
            }

            LightKind::Spot(spot) => {
                if !spot.contains(surf_pos) {
                    return Color::CLEAR;
                }

                let light_vec = surf_pos - spot.position;
                let len_sq = light_vec.mag_sq();
                if len_sq > spot.dist_atten_max * spot.dist_atten_max {
                    return Color::CLEAR;
                }
                if surf_norm.dot(-light_vec) < 0.0 {
                    return Color::CLEAR;
                }

                let dist = len_sq.sqrt();
                let light_dir = light_vec / dist;
                let cn = surf_norm.dot(-light_dir);

                let half_ang_min = spot.ang_atten_min.to_radians() * 0.5;
                let half_ang_max = spot.ang_atten_max.to_radians() * 0.5;
                let ang = spot.direction.dot(light_dir).max(0.0).min(1.0).acos();
                if ang > half_ang_max {
                    return Color::CLEAR;
                }

                let ca = normalized_clamp(ang, half_ang_min, half_ang_max);
                let ca = 1.0 - ca * ca;
                let cd = normalized_clamp(dist, spot.dist_atten_min, spot.dist_atten_max);
                let cd = 1.0 - cd * cd;
                spot.color * (ca * cd * cn * spot.intensity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_ignores_geometry() {
        let light = Light::ambient("a", AmbientLight { color: Color::WHITE, intensity: 0.25 });
        let c = light.apply(Vec3::zero(), Vec3::up(), Vec3::zero(), Vec3::forward());
        assert_eq!(c.r, 0.25);
    }

    #[test]
    fn directional_clamps_backfacing_surfaces() {
        let light = Light::directional(
            "sun",
            DirectionalLight {
                direction: Vec3::from([0.0, -1.0, 0.0]),
                ..Default::default()
            },
        );
        let lit = light.apply(Vec3::zero(), Vec3::up(), Vec3::zero(), Vec3::forward());
        assert_eq!(lit.r, 1.0);
        let unlit = light.apply(Vec3::zero(), -Vec3::up(), Vec3::zero(), Vec3::forward());
        assert_eq!(unlit, Color::CLEAR);
    }

    #[test]
    fn point_light_fades_with_squared_falloff() {
        let light = Light::point(
            "bulb",
            PointLight {
                position: Vec3::from([0.0, 2.0, 0.0]),
                dist_atten_min: 1.0,
                dist_atten_max: 3.0,
                ..Default::default()
            },
        );
        // straight below, normal facing up: full incidence
        let at = |y: f32| light.apply(Vec3::from([0.0, y, 0.0]), Vec3::up(), Vec3::zero(), Vec3::forward()).r;
        assert_eq!(at(1.0), 1.0); // inside the min radius
        let mid = at(0.0); // 2 units away, halfway through the ramp
        assert!((mid - 0.75).abs() < 1e-6);
        assert_eq!(at(-2.0), 0.0); // beyond the max radius
    }

    #[test]
    fn point_light_reach_includes_sphere_radius() {
        let light = Light::point("bulb", PointLight::default());
        let near = Sphere::new(Vec3::from([0.0, 0.0, 6.0]), 2.0);
        let far = Sphere::new(Vec3::from([0.0, 0.0, 9.0]), 2.0);
        assert!(light.can_affect(&near));
        assert!(!light.can_affect(&far));
    }

    #[test]
    fn spot_light_culls_outside_the_cone() {
        let light = Light::spot("head", SpotLight::default());
        // straight down the axis, inside the distance ramp
        let on_axis =
            light.apply(Vec3::from([0.0, 0.0, 4.0]), -Vec3::forward(), Vec3::zero(), Vec3::forward());
        assert!(on_axis.r > 0.9);
        // behind the light
        let behind =
            light.apply(Vec3::from([0.0, 0.0, -4.0]), Vec3::forward(), Vec3::zero(), Vec3::forward());
        assert_eq!(behind, Color::CLEAR);
        // far outside the cone angle
        let off_axis =
            light.apply(Vec3::from([8.0, 0.0, 4.0]), -Vec3::forward(), Vec3::zero(), Vec3::forward());
        assert_eq!(off_axis, Color::CLEAR);
    }
}
