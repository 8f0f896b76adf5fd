use glam::{Mat4, Vec3};

use crate::camera::{Camera, MoveDirection};
use crate::input::{InputState, KeyCode, NamedKey};
use crate::mesh::ObjModel;

/// Degrees of model spin accumulated per second.
const SPIN_DEGREES_PER_SECOND: f32 = 10.0;
const MODEL_OFFSET: Vec3 = Vec3::new(0.0, -1.75, 0.0);
const MODEL_SCALE: f32 = 0.2;

/// Applies held movement keys to the camera for this frame. Sprint follows
/// the shift key level: held means fast, released means normal.
pub fn dispatch_keyboard(input: &InputState, camera: &mut Camera, dt: f32) {
    let bindings = [
        (KeyCode::Character('W'), MoveDirection::Forward),
        (KeyCode::Character('S'), MoveDirection::Backward),
        (KeyCode::Character('A'), MoveDirection::Left),
        (KeyCode::Character('D'), MoveDirection::Right),
        (KeyCode::Character('Q'), MoveDirection::Up),
        (KeyCode::Character('E'), MoveDirection::Down),
    ];
    for (key, direction) in bindings {
        if input.is_key_down(key) {
            camera.process_keyboard(direction, dt);
        }
    }

    let sprint = input.is_key_down(KeyCode::Named(NamedKey::LeftShift))
        || input.is_key_down(KeyCode::Named(NamedKey::RightShift));
    camera.process_keyboard(
        if sprint {
            MoveDirection::SpeedUp
        } else {
            MoveDirection::SpeedDown
        },
        dt,
    );
}

/// Routes mouse events when the panel claims the pointer. Button releases
/// and free-look motion always reach the camera, so a hidden cursor drifting
/// over the panel cannot leave free-look stuck on.
pub fn mouse_reaches_camera(
    panel_consumed: bool,
    is_release: bool,
    free_look_active: bool,
) -> bool {
    !panel_consumed || is_release || free_look_active
}

/// Model transform at `elapsed` seconds: drop the model below the origin,
/// spin it slowly about Y, and shrink it to scene scale. Scale is applied
/// first, then rotation, then translation.
pub fn model_matrix(elapsed: f32) -> Mat4 {
    Mat4::from_translation(MODEL_OFFSET)
        * Mat4::from_rotation_y((elapsed * SPIN_DEGREES_PER_SECOND).to_radians())
        * Mat4::from_scale(Vec3::splat(MODEL_SCALE))
}

/// Prints the per-group statistics of a parsed model to stdout.
pub fn print_model_summary(model: &ObjModel) {
    println!("model has {} draw group(s)", model.groups.len());
    for group in &model.groups {
        println!(
            "  {}: {} vertices, {} triangles, texture {}",
            group.material.name,
            group.mesh.vertex_count(),
            group.mesh.triangle_count(),
            group.material.diffuse_texture.as_deref().unwrap_or("none"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_move_the_camera_each_frame() {
        let input = InputState::new();
        let mut camera = Camera::default();
        let start = camera.position;

        input.set_key_down(KeyCode::Character('W'));
        dispatch_keyboard(&input, &mut camera, 0.5);
        let expected = start + camera.front() * 1.25;
        assert!((camera.position - expected).length() < 1e-5);

        // Released key stops producing displacement.
        input.set_key_up(KeyCode::Character('W'));
        let held = camera.position;
        dispatch_keyboard(&input, &mut camera, 0.5);
        assert!((camera.position - held).length() < 1e-6);
    }

    #[test]
    fn shift_level_toggles_sprint() {
        let input = InputState::new();
        let mut camera = Camera::default();
        let start = camera.position;

        input.set_key_down(KeyCode::Character('W'));
        input.set_key_down(KeyCode::Named(NamedKey::LeftShift));
        dispatch_keyboard(&input, &mut camera, 1.0);
        assert!((camera.position - (start + camera.front() * 5.0)).length() < 1e-4);

        input.set_key_up(KeyCode::Named(NamedKey::LeftShift));
        let mid = camera.position;
        dispatch_keyboard(&input, &mut camera, 1.0);
        assert!((camera.position - (mid + camera.front() * 2.5)).length() < 1e-4);
    }

    #[test]
    fn release_over_the_panel_still_reaches_the_camera() {
        let mut camera = Camera::default();
        camera.enter_free_look();
        // The release arrives while the panel owns the pointer; routing must
        // deliver it anyway or the camera stays in free-look with a hidden
        // cursor.
        assert!(mouse_reaches_camera(true, true, camera.free_look_enabled()));
        assert!(mouse_reaches_camera(true, true, false));
        camera.exit_free_look();
        let front = camera.front();
        camera.process_mouse_movement(100.0, 0.0);
        assert_eq!(camera.front(), front);
    }

    #[test]
    fn free_look_motion_bypasses_the_panel() {
        assert!(mouse_reaches_camera(true, false, true));
        assert!(!mouse_reaches_camera(true, false, false));
        assert!(mouse_reaches_camera(false, false, false));
    }

    #[test]
    fn model_matrix_scales_before_rotating_before_translating() {
        // At t = 9 the spin is exactly 90 degrees, which carries the local
        // X axis onto -Z before the translation applies.
        let matrix = model_matrix(9.0);
        let moved = matrix.transform_point3(Vec3::X);
        let expected = Vec3::new(0.0, -1.75, -0.2);
        assert!((moved - expected).length() < 1e-5, "{moved:?}");

        // The origin only feels the translation.
        let origin = matrix.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, -1.75, 0.0)).length() < 1e-6);
    }

    #[test]
    fn model_matrix_at_zero_has_no_spin() {
        let matrix = model_matrix(0.0);
        let moved = matrix.transform_point3(Vec3::new(1.0, 1.0, 1.0));
        let expected = Vec3::new(0.2, -1.55, 0.2);
        assert!((moved - expected).length() < 1e-5);
    }
}
