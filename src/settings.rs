use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Phong material terms edited through the panel and pushed into the shader
/// every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSettings {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::splat(1.0),
            shininess: 0.5,
        }
    }
}

/// One point light: fixed position, color terms, and the attenuation
/// coefficients the panel exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLightSettings {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLightSettings {
    fn new(position: Vec3, diffuse: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::ONE,
            diffuse,
            specular: Vec3::ONE,
            constant: 0.5,
            linear: 0.5,
            quadratic: 0.005,
        }
    }

    /// Intensity falloff at distance `d`: `1 / (c + l*d + q*d^2)`.
    pub fn attenuation_at(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// Everything the panel edits and the frame loop reads: material, lights,
/// and the requested model path. Lives in the application state rather than
/// in globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub material: MaterialSettings,
    pub light_intensity: f32,
    pub lights: [PointLightSettings; 2],
    pub model_path: String,
}

impl SceneSettings {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            material: MaterialSettings::default(),
            light_intensity: 1.0,
            lights: [
                PointLightSettings::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.1, 1.0, 0.1)),
                PointLightSettings::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            ],
            model_path: model_path.into(),
        }
    }
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_startup_scene() {
        let settings = SceneSettings::new("nanosuit/nanosuit.obj");
        assert_eq!(settings.material.shininess, 0.5);
        assert_eq!(settings.light_intensity, 1.0);
        assert_eq!(settings.lights[0].position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(settings.lights[1].position, Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(settings.lights[0].constant, 0.5);
        assert_eq!(settings.lights[1].quadratic, 0.005);
        assert_eq!(settings.model_path, "nanosuit/nanosuit.obj");
    }

    #[test]
    fn attenuation_decreases_with_distance() {
        let light = PointLightSettings::new(Vec3::ZERO, Vec3::ONE);
        let near = light.attenuation_at(1.0);
        let far = light.attenuation_at(10.0);
        assert!(near > far);
        assert!((light.attenuation_at(0.0) - 2.0).abs() < 1e-6);
    }
}
